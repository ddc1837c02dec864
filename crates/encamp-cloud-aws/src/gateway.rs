//! The production gateway over EC2, ECS and IAM

use async_trait::async_trait;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types as ec2;
use encamp_cloud::error::{CloudError, Result};
use encamp_cloud::gateway::{
    CloudGateway, CreatedKeyPair, Filter, ImageRecord, IngressRule, InstanceProfileRecord,
    InstanceRecord, InstanceState, InternetGatewayRecord, KeyPairRecord, LaunchSpec, RoleRecord,
    RouteAssociationRecord, RouteRecord, RouteTableRecord, SecurityGroupRecord, SubnetRecord,
    VpcRecord,
};
use encamp_cloud::tags::Tag;
use tracing::debug;

/// Gateway backed by the AWS SDK clients.
pub struct AwsGateway {
    ec2: aws_sdk_ec2::Client,
    ecs: aws_sdk_ecs::Client,
    iam: aws_sdk_iam::Client,
}

impl AwsGateway {
    /// Build clients from the ambient credential chain and region.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            ec2: aws_sdk_ec2::Client::new(&config),
            ecs: aws_sdk_ecs::Client::new(&config),
            iam: aws_sdk_iam::Client::new(&config),
        }
    }
}

fn api<E>(error: E) -> CloudError
where
    E: std::error::Error,
{
    CloudError::Api(format!("{}", DisplayErrorContext(&error)))
}

fn missing(what: &str) -> CloudError {
    CloudError::Api(format!("provider response missing {what}"))
}

fn state_name(state: InstanceState) -> &'static str {
    match state {
        InstanceState::Pending => "pending",
        InstanceState::Running => "running",
        InstanceState::ShuttingDown => "shutting-down",
        InstanceState::Stopping => "stopping",
        InstanceState::Stopped => "stopped",
        InstanceState::Terminated => "terminated",
    }
}

fn state_of(name: &ec2::InstanceStateName) -> InstanceState {
    match name {
        ec2::InstanceStateName::Running => InstanceState::Running,
        ec2::InstanceStateName::ShuttingDown => InstanceState::ShuttingDown,
        ec2::InstanceStateName::Stopping => InstanceState::Stopping,
        ec2::InstanceStateName::Stopped => InstanceState::Stopped,
        ec2::InstanceStateName::Terminated => InstanceState::Terminated,
        _ => InstanceState::Pending,
    }
}

fn ec2_filter(filter: &Filter) -> ec2::Filter {
    match filter {
        Filter::Tag(tag) => ec2::Filter::builder()
            .name(format!("tag:{}", tag.key))
            .values(&tag.value)
            .build(),
        Filter::VpcId(id) => ec2::Filter::builder().name("vpc-id").values(id).build(),
        Filter::AvailabilityZone(zone) => ec2::Filter::builder()
            .name("availability-zone")
            .values(zone)
            .build(),
        Filter::CidrBlock(cidr) => ec2::Filter::builder()
            .name("cidr-block")
            .values(cidr)
            .build(),
        Filter::InstanceStateIn(states) => {
            let mut builder = ec2::Filter::builder().name("instance-state-name");
            for state in states {
                builder = builder.values(state_name(*state));
            }
            builder.build()
        }
        Filter::InstanceId(id) => ec2::Filter::builder().name("instance-id").values(id).build(),
        Filter::KeyName(name) => ec2::Filter::builder().name("key-name").values(name).build(),
        Filter::MainAssociation => ec2::Filter::builder()
            .name("association.main")
            .values("true")
            .build(),
    }
}

fn ec2_filters(filters: &[Filter]) -> Option<Vec<ec2::Filter>> {
    Some(filters.iter().map(ec2_filter).collect())
}

fn ec2_tags(tags: &[Tag]) -> Vec<ec2::Tag> {
    tags.iter()
        .map(|tag| ec2::Tag::builder().key(&tag.key).value(&tag.value).build())
        .collect()
}

#[async_trait]
impl CloudGateway for AwsGateway {
    async fn describe_vpcs(&self, filters: &[Filter]) -> Result<Vec<VpcRecord>> {
        let response = self
            .ec2
            .describe_vpcs()
            .set_filters(ec2_filters(filters))
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .vpcs()
            .iter()
            .filter_map(|vpc| {
                Some(VpcRecord {
                    id: vpc.vpc_id()?.to_string(),
                    cidr_block: vpc.cidr_block().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    async fn create_vpc(&self, cidr_block: &str) -> Result<String> {
        let response = self
            .ec2
            .create_vpc()
            .cidr_block(cidr_block)
            .send()
            .await
            .map_err(api)?;
        response
            .vpc()
            .and_then(|vpc| vpc.vpc_id())
            .map(str::to_string)
            .ok_or_else(|| missing("vpc id"))
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.ec2
            .delete_vpc()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn describe_availability_zones(&self) -> Result<Vec<String>> {
        let response = self
            .ec2
            .describe_availability_zones()
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .availability_zones()
            .iter()
            .filter_map(|zone| zone.zone_name().map(str::to_string))
            .collect())
    }

    async fn describe_subnets(&self, filters: &[Filter]) -> Result<Vec<SubnetRecord>> {
        let response = self
            .ec2
            .describe_subnets()
            .set_filters(ec2_filters(filters))
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .subnets()
            .iter()
            .filter_map(|subnet| {
                Some(SubnetRecord {
                    id: subnet.subnet_id()?.to_string(),
                    vpc_id: subnet.vpc_id().unwrap_or_default().to_string(),
                    availability_zone: subnet.availability_zone().unwrap_or_default().to_string(),
                    cidr_block: subnet.cidr_block().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    async fn create_subnet(&self, vpc_id: &str, zone: &str, cidr_block: &str) -> Result<String> {
        let response = self
            .ec2
            .create_subnet()
            .vpc_id(vpc_id)
            .availability_zone(zone)
            .cidr_block(cidr_block)
            .send()
            .await
            .map_err(api)?;
        response
            .subnet()
            .and_then(|subnet| subnet.subnet_id())
            .map(str::to_string)
            .ok_or_else(|| missing("subnet id"))
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.ec2
            .delete_subnet()
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn describe_security_groups(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<SecurityGroupRecord>> {
        let response = self
            .ec2
            .describe_security_groups()
            .set_filters(ec2_filters(filters))
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .security_groups()
            .iter()
            .filter_map(|group| {
                Some(SecurityGroupRecord {
                    id: group.group_id()?.to_string(),
                    name: group.group_name().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String> {
        let response = self
            .ec2
            .create_security_group()
            .group_name(name)
            .description(description)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(api)?;
        response
            .group_id()
            .map(str::to_string)
            .ok_or_else(|| missing("security group id"))
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        self.ec2
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(
                ec2::IpPermission::builder()
                    .ip_protocol(&rule.protocol)
                    .from_port(i32::from(rule.from_port))
                    .to_port(i32::from(rule.to_port))
                    .ip_ranges(ec2::IpRange::builder().cidr_ip(&rule.cidr).build())
                    .build(),
            )
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.ec2
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn describe_key_pairs(&self, filters: &[Filter]) -> Result<Vec<KeyPairRecord>> {
        let response = self
            .ec2
            .describe_key_pairs()
            .set_filters(ec2_filters(filters))
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .key_pairs()
            .iter()
            .filter_map(|pair| {
                Some(KeyPairRecord {
                    name: pair.key_name()?.to_string(),
                })
            })
            .collect())
    }

    async fn create_key_pair(&self, name: &str) -> Result<CreatedKeyPair> {
        let response = self
            .ec2
            .create_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(api)?;
        Ok(CreatedKeyPair {
            name: response
                .key_name()
                .map(str::to_string)
                .ok_or_else(|| missing("key pair name"))?,
            material: response
                .key_material()
                .map(str::to_string)
                .ok_or_else(|| missing("key material"))?,
        })
    }

    async fn delete_key_pair(&self, name: &str) -> Result<()> {
        self.ec2
            .delete_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn describe_internet_gateways(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<InternetGatewayRecord>> {
        let response = self
            .ec2
            .describe_internet_gateways()
            .set_filters(ec2_filters(filters))
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .internet_gateways()
            .iter()
            .filter_map(|gateway| {
                Some(InternetGatewayRecord {
                    id: gateway.internet_gateway_id()?.to_string(),
                    attached_vpcs: gateway
                        .attachments()
                        .iter()
                        .filter_map(|attachment| attachment.vpc_id().map(str::to_string))
                        .collect(),
                })
            })
            .collect())
    }

    async fn create_internet_gateway(&self) -> Result<String> {
        let response = self
            .ec2
            .create_internet_gateway()
            .send()
            .await
            .map_err(api)?;
        response
            .internet_gateway()
            .and_then(|gateway| gateway.internet_gateway_id())
            .map(str::to_string)
            .ok_or_else(|| missing("internet gateway id"))
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.ec2
            .attach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn detach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.ec2
            .detach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn delete_internet_gateway(&self, gateway_id: &str) -> Result<()> {
        self.ec2
            .delete_internet_gateway()
            .internet_gateway_id(gateway_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn describe_route_tables(&self, filters: &[Filter]) -> Result<Vec<RouteTableRecord>> {
        let response = self
            .ec2
            .describe_route_tables()
            .set_filters(ec2_filters(filters))
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .route_tables()
            .iter()
            .filter_map(|table| {
                Some(RouteTableRecord {
                    id: table.route_table_id()?.to_string(),
                    vpc_id: table.vpc_id().unwrap_or_default().to_string(),
                    routes: table
                        .routes()
                        .iter()
                        .map(|route| RouteRecord {
                            destination_cidr: route
                                .destination_cidr_block()
                                .unwrap_or_default()
                                .to_string(),
                            gateway_id: route.gateway_id().map(str::to_string),
                            instance_id: route.instance_id().map(str::to_string),
                        })
                        .collect(),
                    associations: table
                        .associations()
                        .iter()
                        .filter_map(|association| {
                            Some(RouteAssociationRecord {
                                id: association.route_table_association_id()?.to_string(),
                                main: association.main().unwrap_or(false),
                                subnet_id: association.subnet_id().map(str::to_string),
                            })
                        })
                        .collect(),
                })
            })
            .collect())
    }

    async fn create_route_table(&self, vpc_id: &str) -> Result<String> {
        let response = self
            .ec2
            .create_route_table()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(api)?;
        response
            .route_table()
            .and_then(|table| table.route_table_id())
            .map(str::to_string)
            .ok_or_else(|| missing("route table id"))
    }

    async fn create_gateway_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<()> {
        self.ec2
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .gateway_id(gateway_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn create_instance_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        instance_id: &str,
    ) -> Result<()> {
        self.ec2
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .instance_id(instance_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn delete_route(&self, route_table_id: &str, destination_cidr: &str) -> Result<()> {
        self.ec2
            .delete_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<String> {
        let response = self
            .ec2
            .associate_route_table()
            .route_table_id(route_table_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(api)?;
        response
            .association_id()
            .map(str::to_string)
            .ok_or_else(|| missing("route table association id"))
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<()> {
        self.ec2
            .disassociate_route_table()
            .association_id(association_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        self.ec2
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn describe_images(&self, name_pattern: &str) -> Result<Vec<ImageRecord>> {
        let response = self
            .ec2
            .describe_images()
            .owners("amazon")
            .filters(
                ec2::Filter::builder()
                    .name("name")
                    .values(name_pattern)
                    .build(),
            )
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .images()
            .iter()
            .filter_map(|image| {
                Some(ImageRecord {
                    id: image.image_id()?.to_string(),
                    creation_date: image.creation_date().unwrap_or_default().to_string(),
                    virtualization: image
                        .virtualization_type()
                        .map(|virt| virt.as_str().to_string())
                        .unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn describe_instances(&self, filters: &[Filter]) -> Result<Vec<InstanceRecord>> {
        let response = self
            .ec2
            .describe_instances()
            .set_filters(ec2_filters(filters))
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .filter_map(|instance| {
                Some(InstanceRecord {
                    id: instance.instance_id()?.to_string(),
                    state: instance
                        .state()
                        .and_then(|state| state.name())
                        .map(state_of)
                        .unwrap_or(InstanceState::Pending),
                    subnet_id: instance.subnet_id().unwrap_or_default().to_string(),
                    public_address: instance.public_ip_address().map(str::to_string),
                    private_address: instance.private_ip_address().map(str::to_string),
                })
            })
            .collect())
    }

    async fn run_instance(&self, spec: &LaunchSpec) -> Result<InstanceRecord> {
        let mut request = self
            .ec2
            .run_instances()
            .image_id(&spec.image_id)
            .instance_type(ec2::InstanceType::from(spec.instance_type.as_str()))
            .key_name(&spec.key_name)
            .min_count(1)
            .max_count(1)
            .network_interfaces(
                ec2::InstanceNetworkInterfaceSpecification::builder()
                    .device_index(0)
                    .subnet_id(&spec.subnet_id)
                    .groups(&spec.security_group_id)
                    .associate_public_ip_address(spec.associate_public_address)
                    .build(),
            );
        if let Some(arn) = &spec.instance_profile_arn {
            request = request.iam_instance_profile(
                ec2::IamInstanceProfileSpecification::builder()
                    .arn(arn)
                    .build(),
            );
        }
        if let Some(user_data) = &spec.user_data {
            request = request.user_data(user_data);
        }
        let response = request.send().await.map_err(api)?;
        let instance = response
            .instances()
            .first()
            .ok_or_else(|| missing("launched instance"))?;
        debug!(instance = instance.instance_id().unwrap_or_default(), "launched instance");
        Ok(InstanceRecord {
            id: instance
                .instance_id()
                .map(str::to_string)
                .ok_or_else(|| missing("instance id"))?,
            state: instance
                .state()
                .and_then(|state| state.name())
                .map(state_of)
                .unwrap_or(InstanceState::Pending),
            subnet_id: instance.subnet_id().unwrap_or_default().to_string(),
            public_address: instance.public_ip_address().map(str::to_string),
            private_address: instance.private_ip_address().map(str::to_string),
        })
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        self.ec2
            .terminate_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn instance_state(&self, instance_id: &str) -> Result<Option<InstanceState>> {
        let response = self
            .ec2
            .describe_instance_status()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .instance_statuses()
            .first()
            .and_then(|status| status.instance_state())
            .and_then(|state| state.name())
            .map(state_of))
    }

    async fn disable_source_dest_check(&self, instance_id: &str) -> Result<()> {
        self.ec2
            .modify_instance_attribute()
            .instance_id(instance_id)
            .source_dest_check(ec2::AttributeBooleanValue::builder().value(false).build())
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn create_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<()> {
        self.ec2
            .create_tags()
            .set_resources(Some(resource_ids.to_vec()))
            .set_tags(Some(ec2_tags(tags)))
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn delete_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<()> {
        self.ec2
            .delete_tags()
            .set_resources(Some(resource_ids.to_vec()))
            .set_tags(Some(ec2_tags(tags)))
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn describe_cluster(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .ecs
            .describe_clusters()
            .clusters(name)
            .send()
            .await
            .map_err(api)?;
        // a deleted cluster lingers as INACTIVE under the same name
        Ok(response
            .clusters()
            .iter()
            .find(|cluster| cluster.status() == Some("ACTIVE"))
            .and_then(|cluster| cluster.cluster_arn())
            .map(str::to_string))
    }

    async fn create_cluster(&self, name: &str) -> Result<String> {
        let response = self
            .ecs
            .create_cluster()
            .cluster_name(name)
            .send()
            .await
            .map_err(api)?;
        response
            .cluster()
            .and_then(|cluster| cluster.cluster_arn())
            .map(str::to_string)
            .ok_or_else(|| missing("cluster arn"))
    }

    async fn delete_cluster(&self, name: &str) -> Result<()> {
        self.ecs
            .delete_cluster()
            .cluster(name)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn list_roles(&self, path_prefix: &str) -> Result<Vec<RoleRecord>> {
        let response = self
            .iam
            .list_roles()
            .path_prefix(path_prefix)
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .roles()
            .iter()
            .map(|role| RoleRecord {
                name: role.role_name().to_string(),
                arn: role.arn().to_string(),
            })
            .collect())
    }

    async fn create_role(
        &self,
        path: &str,
        name: &str,
        trust_policy_json: &str,
    ) -> Result<RoleRecord> {
        let response = self
            .iam
            .create_role()
            .path(path)
            .role_name(name)
            .assume_role_policy_document(trust_policy_json)
            .send()
            .await
            .map_err(api)?;
        let role = response.role().ok_or_else(|| missing("created role"))?;
        Ok(RoleRecord {
            name: role.role_name().to_string(),
            arn: role.arn().to_string(),
        })
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.iam
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>> {
        let response = self
            .iam
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .attached_policies()
            .iter()
            .filter_map(|policy| policy.policy_arn().map(str::to_string))
            .collect())
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.iam
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        self.iam
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn list_instance_profiles(
        &self,
        path_prefix: &str,
    ) -> Result<Vec<InstanceProfileRecord>> {
        let response = self
            .iam
            .list_instance_profiles()
            .path_prefix(path_prefix)
            .send()
            .await
            .map_err(api)?;
        Ok(response
            .instance_profiles()
            .iter()
            .map(|profile| InstanceProfileRecord {
                name: profile.instance_profile_name().to_string(),
                arn: profile.arn().to_string(),
                role_names: profile
                    .roles()
                    .iter()
                    .map(|role| role.role_name().to_string())
                    .collect(),
            })
            .collect())
    }

    async fn create_instance_profile(
        &self,
        path: &str,
        name: &str,
    ) -> Result<InstanceProfileRecord> {
        let response = self
            .iam
            .create_instance_profile()
            .path(path)
            .instance_profile_name(name)
            .send()
            .await
            .map_err(api)?;
        let profile = response
            .instance_profile()
            .ok_or_else(|| missing("created instance profile"))?;
        Ok(InstanceProfileRecord {
            name: profile.instance_profile_name().to_string(),
            arn: profile.arn().to_string(),
            role_names: profile
                .roles()
                .iter()
                .map(|role| role.role_name().to_string())
                .collect(),
        })
    }

    async fn add_role_to_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()> {
        self.iam
            .add_role_to_instance_profile()
            .instance_profile_name(profile_name)
            .role_name(role_name)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn remove_role_from_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> Result<()> {
        self.iam
            .remove_role_from_instance_profile()
            .instance_profile_name(profile_name)
            .role_name(role_name)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }

    async fn delete_instance_profile(&self, profile_name: &str) -> Result<()> {
        self.iam
            .delete_instance_profile()
            .instance_profile_name(profile_name)
            .send()
            .await
            .map_err(api)?;
        Ok(())
    }
}
