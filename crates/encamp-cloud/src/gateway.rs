//! Cloud gateway abstraction
//!
//! Typed request/response operations against the provider. The pipelines
//! never see provider encoding rules; they speak in these records and
//! filters, and implementations (the AWS gateway, the in-memory test
//! gateway) translate. All filters combine with AND semantics.

use crate::error::Result;
use crate::tags::Tag;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An equality filter on a describe operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Resource carries this exact tag.
    Tag(Tag),
    /// Resource belongs to this virtual network.
    VpcId(String),
    /// Resource sits in this availability zone.
    AvailabilityZone(String),
    /// Resource covers exactly this CIDR block.
    CidrBlock(String),
    /// Instance is in one of these states.
    InstanceStateIn(Vec<InstanceState>),
    /// Instance has this provider id.
    InstanceId(String),
    /// Key pair registered under this name.
    KeyName(String),
    /// Route table is the network's main table.
    MainAssociation,
}

/// Lifecycle states an instance moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Stopping,
    Stopped,
    Terminated,
}

impl InstanceState {
    /// Every state except terminated: an instance in any of these still
    /// occupies its tag-identity slot.
    pub fn non_terminated() -> Vec<InstanceState> {
        vec![
            InstanceState::Running,
            InstanceState::Pending,
            InstanceState::Stopped,
            InstanceState::ShuttingDown,
            InstanceState::Stopping,
        ]
    }

    /// States in which teardown still has an instance to reclaim.
    pub fn reclaimable() -> Vec<InstanceState> {
        vec![
            InstanceState::Running,
            InstanceState::Pending,
            InstanceState::Stopped,
            InstanceState::Stopping,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcRecord {
    pub id: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRecord {
    pub id: String,
    pub vpc_id: String,
    pub availability_zone: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupRecord {
    pub id: String,
    pub name: String,
}

/// One inbound rule of a security group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub cidr: String,
}

impl IngressRule {
    pub fn tcp(from_port: u16, to_port: u16, cidr: impl Into<String>) -> Self {
        Self {
            protocol: "tcp".into(),
            from_port,
            to_port,
            cidr: cidr.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairRecord {
    pub name: String,
}

/// A freshly created key pair; the only moment the private material is
/// readable.
#[derive(Debug, Clone)]
pub struct CreatedKeyPair {
    pub name: String,
    pub material: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternetGatewayRecord {
    pub id: String,
    /// Networks this gateway is attached to.
    pub attached_vpcs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub destination_cidr: String,
    pub gateway_id: Option<String>,
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAssociationRecord {
    pub id: String,
    pub main: bool,
    pub subnet_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTableRecord {
    pub id: String,
    pub vpc_id: String,
    pub routes: Vec<RouteRecord>,
    pub associations: Vec<RouteAssociationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub id: String,
    pub state: InstanceState,
    pub subnet_id: String,
    pub public_address: Option<String>,
    pub private_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: String,
    /// RFC 3339 creation timestamp as reported by the provider.
    pub creation_date: String,
    pub virtualization: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfileRecord {
    pub name: String,
    pub arn: String,
    /// Names of the roles contained in the profile.
    pub role_names: Vec<String>,
}

/// Everything needed to launch one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub associate_public_address: bool,
    pub instance_profile_arn: Option<String>,
    /// Base64-encoded bootstrap script, if any.
    pub user_data: Option<String>,
}

/// Typed operations against the cloud provider.
///
/// Describe operations take [`Filter`] sets with AND semantics and must
/// support equality filtering by tag and by structural attribute (zone,
/// CIDR, state). Creates return the provider-assigned id; deletes are only
/// called with ids the caller just resolved.
#[async_trait]
pub trait CloudGateway: Send + Sync {
    // Virtual network
    async fn describe_vpcs(&self, filters: &[Filter]) -> Result<Vec<VpcRecord>>;
    async fn create_vpc(&self, cidr_block: &str) -> Result<String>;
    async fn delete_vpc(&self, vpc_id: &str) -> Result<()>;

    async fn describe_availability_zones(&self) -> Result<Vec<String>>;

    // Subnets
    async fn describe_subnets(&self, filters: &[Filter]) -> Result<Vec<SubnetRecord>>;
    async fn create_subnet(&self, vpc_id: &str, zone: &str, cidr_block: &str) -> Result<String>;
    async fn delete_subnet(&self, subnet_id: &str) -> Result<()>;

    // Security groups
    async fn describe_security_groups(&self, filters: &[Filter])
        -> Result<Vec<SecurityGroupRecord>>;
    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String>;
    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()>;
    async fn delete_security_group(&self, group_id: &str) -> Result<()>;

    // Key pairs
    async fn describe_key_pairs(&self, filters: &[Filter]) -> Result<Vec<KeyPairRecord>>;
    async fn create_key_pair(&self, name: &str) -> Result<CreatedKeyPair>;
    async fn delete_key_pair(&self, name: &str) -> Result<()>;

    // Internet gateways
    async fn describe_internet_gateways(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<InternetGatewayRecord>>;
    async fn create_internet_gateway(&self) -> Result<String>;
    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;
    async fn detach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;
    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()>;

    // Route tables
    async fn describe_route_tables(&self, filters: &[Filter]) -> Result<Vec<RouteTableRecord>>;
    async fn create_route_table(&self, vpc_id: &str) -> Result<String>;
    async fn create_gateway_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()>;
    async fn create_instance_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        instance_id: &str,
    ) -> Result<()>;
    async fn delete_route(&self, route_table_id: &str, destination_cidr: &str) -> Result<()>;
    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<String>;
    async fn disassociate_route_table(&self, association_id: &str) -> Result<()>;
    async fn delete_route_table(&self, route_table_id: &str) -> Result<()>;

    // Machine images
    async fn describe_images(&self, name_pattern: &str) -> Result<Vec<ImageRecord>>;

    // Instances
    async fn describe_instances(&self, filters: &[Filter]) -> Result<Vec<InstanceRecord>>;
    async fn run_instance(&self, spec: &LaunchSpec) -> Result<InstanceRecord>;
    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()>;
    /// Current state as reported by the status API; `None` while the
    /// provider has no status to report yet.
    async fn instance_state(&self, instance_id: &str) -> Result<Option<InstanceState>>;
    async fn disable_source_dest_check(&self, instance_id: &str) -> Result<()>;

    // Tagging
    async fn create_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<()>;
    async fn delete_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<()>;

    // Compute cluster
    async fn describe_cluster(&self, name: &str) -> Result<Option<String>>;
    async fn create_cluster(&self, name: &str) -> Result<String>;
    async fn delete_cluster(&self, name: &str) -> Result<()>;

    // Roles and instance profiles
    async fn list_roles(&self, path_prefix: &str) -> Result<Vec<RoleRecord>>;
    async fn create_role(
        &self,
        path: &str,
        name: &str,
        trust_policy_json: &str,
    ) -> Result<RoleRecord>;
    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;
    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>>;
    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;
    async fn delete_role(&self, role_name: &str) -> Result<()>;
    async fn list_instance_profiles(&self, path_prefix: &str)
        -> Result<Vec<InstanceProfileRecord>>;
    async fn create_instance_profile(&self, path: &str, name: &str)
        -> Result<InstanceProfileRecord>;
    async fn add_role_to_instance_profile(&self, profile_name: &str, role_name: &str)
        -> Result<()>;
    async fn remove_role_from_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()>;
    async fn delete_instance_profile(&self, profile_name: &str) -> Result<()>;
}

/// Where the caller's own public address comes from, for the SSH rule of
/// the public security group. Failures are fatal and never retried.
#[async_trait]
pub trait AddressDiscovery: Send + Sync {
    async fn public_address(&self) -> Result<String>;
}
