//! The provisioning pipeline
//!
//! An ordered sequence of idempotent steps, each with the contract
//! "ensure the resource exists under the assembly tag, return its id".
//! A step that finds its resource already tagged performs no provider
//! mutation, so re-running the pipeline resumes from wherever a previous
//! run stopped. Conflicting tagged state aborts the whole run; nothing is
//! rolled back.

use crate::assembly::{Assembly, AssemblyId};
use crate::error::{CloudError, Result};
use crate::gateway::{
    AddressDiscovery, CloudGateway, Filter, ImageRecord, IngressRule, InstanceState, LaunchSpec,
};
use crate::keys;
use crate::plan::{self, SubnetMap};
use crate::policy::{self, TrustPolicy};
use crate::retry;
use crate::tags::{AccessClass, Tag, expect_one_or_none};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset};
use std::cmp::Reverse;
use std::path::PathBuf;
use tracing::{debug, info};

const INSTANCE_TYPE: &str = "t2.micro";
const NAT_IMAGE_PATTERN: &str = "*amzn-ami-vpc-nat*";
const WORKER_IMAGE_PATTERN: &str = "*amzn-ami-*-amazon-ecs-optimized*";
const GROUP_DESCRIPTION: &str = "For accessing resources from a single public IP Address";

/// Per-run settings that are not part of the assembly identity.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// How many cluster workers the assembly should hold.
    pub worker_count: usize,
    /// Where the generated private key is written.
    pub key_path: PathBuf,
}

impl ProvisionConfig {
    pub fn for_id(id: &AssemblyId) -> Result<Self> {
        Ok(Self {
            worker_count: 1,
            key_path: keys::private_key_path(id)?,
        })
    }
}

/// Runs the ordered ensure-steps against a gateway, producing the
/// assembly summary.
pub struct Provisioner<'a, G> {
    gateway: &'a G,
    discovery: &'a dyn AddressDiscovery,
    id: AssemblyId,
    config: ProvisionConfig,
}

impl<'a, G: CloudGateway> Provisioner<'a, G> {
    pub fn new(
        gateway: &'a G,
        discovery: &'a dyn AddressDiscovery,
        id: AssemblyId,
        config: ProvisionConfig,
    ) -> Self {
        Self {
            gateway,
            discovery,
            id,
            config,
        }
    }

    /// Execute the full pipeline. Each step consumes identifiers produced
    /// by the steps before it; ordering is the dependency order.
    pub async fn run(&self) -> Result<Assembly> {
        self.ensure_cluster().await?;
        let vpc_id = self.ensure_vpc().await?;
        let subnets = self.ensure_subnets(&vpc_id).await?;
        let public_group = self.ensure_security_group(&vpc_id, AccessClass::Public).await?;
        let private_group = self.ensure_security_group(&vpc_id, AccessClass::Private).await?;
        let role_name = self.ensure_role().await?;
        let profile_arn = self.ensure_instance_profile(&role_name).await?;
        let key_name = self.ensure_key_pair().await?;
        let gateway_id = self.ensure_internet_gateway(&vpc_id).await?;

        // The public side lives in the first subnet by zone order; the
        // BTreeMap makes "first" the lexicographically first zone.
        let public_subnet = subnets.values().next().cloned().ok_or_else(|| {
            CloudError::Api("no availability zone yielded a subnet".to_string())
        })?;

        self.ensure_public_route_table(&vpc_id, &gateway_id, &public_subnet)
            .await?;
        let bastion_id = self
            .ensure_bastion(&public_subnet, &public_group, &key_name)
            .await?;
        self.ensure_default_route_via_bastion(&vpc_id, &bastion_id)
            .await?;
        self.ensure_workers(&subnets, &private_group, &profile_arn, &key_name)
            .await?;

        info!("gathering assembly details");
        let bastion_address = self.await_bastion_address(&bastion_id).await?;
        let worker_addresses = self.worker_addresses().await?;

        Ok(Assembly {
            id: self.id.clone(),
            bastion_address,
            worker_addresses,
        })
    }

    fn assembly_tag(&self) -> Tag {
        Tag::assembly(&self.id)
    }

    fn assembly_filter(&self) -> Filter {
        Filter::Tag(self.assembly_tag())
    }

    fn class_filter(class: AccessClass) -> Filter {
        Filter::Tag(Tag::access(class))
    }

    async fn ensure_cluster(&self) -> Result<String> {
        info!(cluster = %self.id, "ensuring compute cluster");
        if let Some(arn) = self.gateway.describe_cluster(self.id.as_str()).await? {
            debug!(%arn, "cluster already present");
            return Ok(arn);
        }
        self.gateway.create_cluster(self.id.as_str()).await
    }

    async fn ensure_vpc(&self) -> Result<String> {
        info!(cidr = plan::VPC_CIDR, "ensuring virtual network");
        let existing = self.gateway.describe_vpcs(&[self.assembly_filter()]).await?;
        match existing.as_slice() {
            [] => {}
            [vpc] if vpc.cidr_block == plan::VPC_CIDR => {
                debug!(vpc = %vpc.id, "reusing tagged network");
                return Ok(vpc.id.clone());
            }
            [vpc] => {
                // the tag no longer identifies a compatible network
                return Err(CloudError::Conflict {
                    kind: "vpc",
                    detail: format!(
                        "tagged network {} has CIDR {}, expected {}",
                        vpc.id,
                        vpc.cidr_block,
                        plan::VPC_CIDR
                    ),
                });
            }
            many => {
                return Err(CloudError::Conflict {
                    kind: "vpc",
                    detail: format!(
                        "{} tagged networks: [{}]",
                        many.len(),
                        many.iter()
                            .map(|vpc| vpc.id.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                });
            }
        }

        let vpc_id = self.gateway.create_vpc(plan::VPC_CIDR).await?;
        self.gateway
            .create_tags(std::slice::from_ref(&vpc_id), &[self.assembly_tag()])
            .await?;
        Ok(vpc_id)
    }

    async fn ensure_subnets(&self, vpc_id: &str) -> Result<SubnetMap> {
        info!("ensuring subnets");
        let zones = self.gateway.describe_availability_zones().await?;
        let mut subnets = SubnetMap::new();
        for (zone, cidr) in plan::zone_blocks(&zones) {
            let subnet_id = self.ensure_subnet(vpc_id, zone, cidr).await?;
            subnets.insert(zone.clone(), subnet_id);
        }
        Ok(subnets)
    }

    async fn ensure_subnet(&self, vpc_id: &str, zone: &str, cidr: &str) -> Result<String> {
        let existing = self
            .gateway
            .describe_subnets(&[
                self.assembly_filter(),
                Filter::VpcId(vpc_id.to_string()),
                Filter::AvailabilityZone(zone.to_string()),
                Filter::CidrBlock(cidr.to_string()),
            ])
            .await?;
        if let Some(subnet) = expect_one_or_none("subnet", existing, |s| s.id.clone())? {
            debug!(zone, subnet = %subnet.id, "reusing tagged subnet");
            return Ok(subnet.id);
        }

        let subnet_id = self
            .gateway
            .create_subnet(vpc_id, zone, cidr)
            .await
            .map_err(|error| CloudError::Conflict {
                kind: "subnet",
                detail: format!("CIDR {cidr} conflicts with existing state in {vpc_id}: {error}"),
            })?;
        self.gateway
            .create_tags(std::slice::from_ref(&subnet_id), &[self.assembly_tag()])
            .await?;
        Ok(subnet_id)
    }

    async fn ensure_security_group(&self, vpc_id: &str, class: AccessClass) -> Result<String> {
        info!(class = class.as_str(), "ensuring security group");
        let existing = self
            .gateway
            .describe_security_groups(&[
                self.assembly_filter(),
                Self::class_filter(class),
                Filter::VpcId(vpc_id.to_string()),
            ])
            .await?;
        if let Some(group) = expect_one_or_none("security group", existing, |g| g.id.clone())? {
            debug!(group = %group.id, "reusing tagged security group");
            return Ok(group.id);
        }

        let rules = match class {
            AccessClass::Public => {
                let caller = self.discovery.public_address().await?;
                vec![
                    IngressRule::tcp(22, 22, format!("{caller}/32")),
                    IngressRule::tcp(80, 80, plan::VPC_CIDR),
                    IngressRule::tcp(443, 443, plan::VPC_CIDR),
                ]
            }
            AccessClass::Private => {
                // SSH only from inside the network; re-read the CIDR
                // rather than assuming the plan's constant still holds
                let vpcs = self
                    .gateway
                    .describe_vpcs(&[Filter::VpcId(vpc_id.to_string())])
                    .await?;
                let cidr = vpcs
                    .into_iter()
                    .next()
                    .map(|vpc| vpc.cidr_block)
                    .ok_or_else(|| {
                        CloudError::Api(format!("network {vpc_id} disappeared while provisioning"))
                    })?;
                vec![IngressRule::tcp(22, 22, cidr)]
            }
        };

        let group_id = self
            .gateway
            .create_security_group(vpc_id, class.as_str(), GROUP_DESCRIPTION)
            .await?;
        for rule in &rules {
            self.gateway.authorize_ingress(&group_id, rule).await?;
        }
        self.gateway
            .create_tags(
                std::slice::from_ref(&group_id),
                &[self.assembly_tag(), Tag::access(class)],
            )
            .await?;
        Ok(group_id)
    }

    async fn ensure_role(&self) -> Result<String> {
        info!("ensuring worker role");
        let path = self.id.iam_path();
        let name = self.id.role_name();
        let existing = self.gateway.list_roles(&path).await?;
        if let Some(role) = existing.into_iter().find(|role| role.name == name) {
            debug!(role = %role.name, "reusing role");
            return Ok(role.name);
        }

        let role = self
            .gateway
            .create_role(&path, &name, &TrustPolicy::ec2_assume_role().to_json()?)
            .await?;
        self.gateway
            .attach_role_policy(&role.name, policy::CLUSTER_AGENT_POLICY_ARN)
            .await?;
        self.gateway
            .attach_role_policy(&role.name, policy::STORAGE_ACCESS_POLICY_ARN)
            .await?;
        Ok(role.name)
    }

    async fn ensure_instance_profile(&self, role_name: &str) -> Result<String> {
        info!("ensuring instance profile");
        let path = self.id.iam_path();
        let name = self.id.role_name();
        let existing = self.gateway.list_instance_profiles(&path).await?;
        if let Some(profile) = existing.into_iter().find(|profile| profile.name == name) {
            debug!(profile = %profile.name, "reusing instance profile");
            return Ok(profile.arn);
        }

        let profile = self.gateway.create_instance_profile(&path, &name).await?;
        self.gateway
            .add_role_to_instance_profile(&profile.name, role_name)
            .await?;
        Ok(profile.arn)
    }

    async fn ensure_key_pair(&self) -> Result<String> {
        info!("ensuring key pair");
        let name = self.id.as_str();
        let existing = self
            .gateway
            .describe_key_pairs(&[Filter::KeyName(name.to_string())])
            .await?;
        if expect_one_or_none("key pair", existing, |k| k.name.clone())?.is_some() {
            // the provider cannot return the material again, so a lost
            // local key file is not repaired here
            debug!("key pair already registered");
            return Ok(name.to_string());
        }

        let created = self.gateway.create_key_pair(name).await?;
        if let Err(error) = keys::write_private_key(&self.config.key_path, &created.material) {
            // the remote half is useless without the local material
            if let Err(cleanup) = self.gateway.delete_key_pair(name).await {
                debug!(%cleanup, "could not remove the remote key pair after a failed write");
            }
            return Err(error);
        }
        Ok(created.name)
    }

    async fn ensure_internet_gateway(&self, vpc_id: &str) -> Result<String> {
        info!("ensuring internet gateway");
        let existing = self
            .gateway
            .describe_internet_gateways(&[self.assembly_filter()])
            .await?;
        if let Some(gateway) = expect_one_or_none("internet gateway", existing, |g| g.id.clone())? {
            debug!(gateway = %gateway.id, "reusing internet gateway");
            return Ok(gateway.id);
        }

        let gateway_id = self.gateway.create_internet_gateway().await?;
        self.gateway
            .create_tags(std::slice::from_ref(&gateway_id), &[self.assembly_tag()])
            .await?;
        self.gateway
            .attach_internet_gateway(&gateway_id, vpc_id)
            .await?;
        Ok(gateway_id)
    }

    async fn ensure_public_route_table(
        &self,
        vpc_id: &str,
        gateway_id: &str,
        public_subnet: &str,
    ) -> Result<String> {
        info!("ensuring public route table");
        let existing = self
            .gateway
            .describe_route_tables(&[self.assembly_filter(), Self::class_filter(AccessClass::Public)])
            .await?;
        if let Some(table) = expect_one_or_none("route table", existing, |t| t.id.clone())? {
            debug!(table = %table.id, "reusing public route table");
            return Ok(table.id);
        }

        let table_id = self.gateway.create_route_table(vpc_id).await?;
        self.gateway
            .create_tags(
                std::slice::from_ref(&table_id),
                &[self.assembly_tag(), Tag::access(AccessClass::Public)],
            )
            .await?;
        self.gateway
            .create_gateway_route(&table_id, plan::DEFAULT_ROUTE_CIDR, gateway_id)
            .await?;
        self.gateway
            .associate_route_table(&table_id, public_subnet)
            .await?;
        Ok(table_id)
    }

    async fn ensure_bastion(
        &self,
        public_subnet: &str,
        public_group: &str,
        key_name: &str,
    ) -> Result<String> {
        info!("ensuring bastion instance");
        let existing = self
            .gateway
            .describe_instances(&[
                self.assembly_filter(),
                Self::class_filter(AccessClass::Public),
                Filter::InstanceStateIn(InstanceState::non_terminated()),
            ])
            .await?;
        if let Some(instance) = expect_one_or_none("bastion instance", existing, |i| i.id.clone())? {
            debug!(instance = %instance.id, "reusing bastion instance");
            return Ok(instance.id);
        }

        let image_id = self.latest_image(NAT_IMAGE_PATTERN).await?;
        let instance = self
            .gateway
            .run_instance(&LaunchSpec {
                image_id,
                instance_type: INSTANCE_TYPE.to_string(),
                key_name: key_name.to_string(),
                subnet_id: public_subnet.to_string(),
                security_group_id: public_group.to_string(),
                associate_public_address: true,
                instance_profile_arn: None,
                user_data: None,
            })
            .await?;
        self.gateway
            .create_tags(
                std::slice::from_ref(&instance.id),
                &[self.assembly_tag(), Tag::access(AccessClass::Public)],
            )
            .await?;
        // it forwards traffic for the workers
        self.gateway.disable_source_dest_check(&instance.id).await?;
        Ok(instance.id)
    }

    async fn ensure_default_route_via_bastion(
        &self,
        vpc_id: &str,
        bastion_id: &str,
    ) -> Result<()> {
        info!("ensuring default route through the bastion");
        let tables = self
            .gateway
            .describe_route_tables(&[Filter::VpcId(vpc_id.to_string()), Filter::MainAssociation])
            .await?;
        let main = tables.into_iter().next().ok_or_else(|| {
            CloudError::Api(format!("network {vpc_id} has no main route table"))
        })?;
        if main
            .routes
            .iter()
            .any(|route| route.instance_id.as_deref() == Some(bastion_id))
        {
            debug!(table = %main.id, "default route already present");
            return Ok(());
        }

        // best-effort wait; the route is attempted regardless once the
        // window closes
        let gateway = self.gateway;
        let running = retry::poll_until(retry::RUNNING_WAIT_WINDOW, retry::POLL_PAUSE, move || {
            let instance_id = bastion_id.to_string();
            async move {
                Ok(match gateway.instance_state(&instance_id).await? {
                    Some(InstanceState::Running) => Some(()),
                    _ => None,
                })
            }
        })
        .await?;
        if running.is_none() {
            debug!(instance = %bastion_id, "running-state window elapsed, proceeding");
        }

        self.gateway
            .create_instance_route(&main.id, plan::DEFAULT_ROUTE_CIDR, bastion_id)
            .await
    }

    async fn ensure_workers(
        &self,
        subnets: &SubnetMap,
        private_group: &str,
        profile_arn: &str,
        key_name: &str,
    ) -> Result<()> {
        info!(count = self.config.worker_count, "ensuring cluster workers");
        let existing = self
            .gateway
            .describe_instances(&[
                self.assembly_filter(),
                Self::class_filter(AccessClass::Private),
            ])
            .await?;
        if existing.len() >= self.config.worker_count {
            debug!(present = existing.len(), "worker count already satisfied");
            return Ok(());
        }
        let needed = self.config.worker_count - existing.len();

        let image_id = self.latest_image(WORKER_IMAGE_PATTERN).await?;
        let bootstrap = format!(
            "#!/bin/bash\necho ECS_CLUSTER={} >> /etc/ecs/ecs.config\n",
            self.id
        );
        let user_data = BASE64.encode(bootstrap);

        // workers go to the subnets after the public one, in zone order
        let private_subnets: Vec<&String> = subnets.values().skip(1).collect();
        let mut launched = Vec::new();
        for subnet_id in private_subnets.into_iter().cycle().take(needed) {
            let instance = self
                .gateway
                .run_instance(&LaunchSpec {
                    image_id: image_id.clone(),
                    instance_type: INSTANCE_TYPE.to_string(),
                    key_name: key_name.to_string(),
                    subnet_id: subnet_id.clone(),
                    security_group_id: private_group.to_string(),
                    associate_public_address: false,
                    instance_profile_arn: Some(profile_arn.to_string()),
                    user_data: Some(user_data.clone()),
                })
                .await?;
            launched.push(instance.id);
        }
        if !launched.is_empty() {
            self.gateway
                .create_tags(
                    &launched,
                    &[self.assembly_tag(), Tag::access(AccessClass::Private)],
                )
                .await?;
        }
        Ok(())
    }

    /// Address assignment is guaranteed eventually, so this poll has no
    /// deadline.
    async fn await_bastion_address(&self, bastion_id: &str) -> Result<String> {
        let gateway = self.gateway;
        retry::poll_forever(retry::POLL_PAUSE, move || {
            let filter = Filter::InstanceId(bastion_id.to_string());
            async move {
                let found = gateway.describe_instances(&[filter]).await?;
                Ok(found.into_iter().next().and_then(|i| i.public_address))
            }
        })
        .await
    }

    async fn worker_addresses(&self) -> Result<Vec<String>> {
        let workers = self
            .gateway
            .describe_instances(&[
                self.assembly_filter(),
                Self::class_filter(AccessClass::Private),
            ])
            .await?;
        Ok(workers
            .into_iter()
            .filter_map(|instance| instance.private_address)
            .collect())
    }

    /// The newest hardware-virtualized image matching a name pattern.
    async fn latest_image(&self, pattern: &str) -> Result<String> {
        let mut images: Vec<ImageRecord> = self
            .gateway
            .describe_images(pattern)
            .await?
            .into_iter()
            .filter(|image| image.virtualization == "hvm")
            .collect();
        images.sort_by_key(|image| Reverse(creation_time(image)));
        images
            .first()
            .map(|image| image.id.clone())
            .ok_or_else(|| CloudError::NoImage(pattern.to_string()))
    }
}

fn creation_time(image: &ImageRecord) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&image.creation_date).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_hvm_image_sorts_first() {
        let mut images = vec![
            ImageRecord {
                id: "ami-old".into(),
                creation_date: "2021-03-01T00:00:00Z".into(),
                virtualization: "hvm".into(),
            },
            ImageRecord {
                id: "ami-new".into(),
                creation_date: "2023-10-12T21:30:52.000Z".into(),
                virtualization: "hvm".into(),
            },
            ImageRecord {
                id: "ami-undated".into(),
                creation_date: "not a timestamp".into(),
                virtualization: "hvm".into(),
            },
        ];
        images.sort_by_key(|image| Reverse(creation_time(image)));
        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["ami-new", "ami-old", "ami-undated"]);
    }
}
