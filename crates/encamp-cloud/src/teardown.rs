//! The teardown pipeline
//!
//! The provisioning steps mirrored in reverse dependency order, each
//! ensuring its resource set is absent. Re-running teardown on an
//! already-empty assembly is a no-op: a target set that comes back empty
//! is already satisfied, never an error.

use crate::assembly::AssemblyId;
use crate::error::Result;
use crate::gateway::{CloudGateway, Filter, InstanceState};
use crate::keys;
use crate::plan;
use crate::retry;
use crate::tags::{AccessClass, Tag};
use std::path::PathBuf;
use tracing::{debug, info};

/// Per-run teardown settings.
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    /// Where the generated private key was written.
    pub key_path: PathBuf,
}

impl TeardownConfig {
    pub fn for_id(id: &AssemblyId) -> Result<Self> {
        Ok(Self {
            key_path: keys::private_key_path(id)?,
        })
    }
}

/// Removes every resource carrying the assembly tag, reverse of the
/// provisioning order.
pub struct Teardown<'a, G> {
    gateway: &'a G,
    id: AssemblyId,
    config: TeardownConfig,
}

impl<'a, G: CloudGateway> Teardown<'a, G> {
    pub fn new(gateway: &'a G, id: AssemblyId, config: TeardownConfig) -> Self {
        Self {
            gateway,
            id,
            config,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!(id = %self.id, "tearing down assembly");

        let vpc_ids: Vec<String> = self
            .gateway
            .describe_vpcs(&[self.assembly_filter()])
            .await?
            .into_iter()
            .map(|vpc| vpc.id)
            .collect();

        self.reclaim_instances(AccessClass::Private).await?;
        self.reclaim_instances(AccessClass::Public).await?;
        self.strip_default_routes(&vpc_ids).await;
        self.remove_route_tables().await?;
        retry::retry_fixed(retry::SLOW_ATTEMPTS, retry::SLOW_PAUSE, || {
            self.sweep_internet_gateways()
        })
        .await?;
        self.remove_key_pair().await?;
        self.remove_instance_profiles().await?;
        self.remove_roles().await?;
        retry::retry_fixed(retry::FAST_ATTEMPTS, retry::FAST_PAUSE, || {
            self.sweep_security_groups()
        })
        .await?;
        self.remove_subnets().await?;
        for vpc_id in &vpc_ids {
            info!(vpc = %vpc_id, "deleting network");
            self.gateway.delete_vpc(vpc_id).await?;
        }
        info!(cluster = %self.id, "deleting compute cluster");
        self.gateway.delete_cluster(self.id.as_str()).await?;
        Ok(())
    }

    fn assembly_filter(&self) -> Filter {
        Filter::Tag(Tag::assembly(&self.id))
    }

    /// Untag and terminate the instances of one access class. The tags
    /// come off first so a half-finished teardown does not leave
    /// terminated instances occupying the assembly's identity.
    async fn reclaim_instances(&self, class: AccessClass) -> Result<()> {
        info!(class = class.as_str(), "terminating instances");
        let instance_ids: Vec<String> = self
            .gateway
            .describe_instances(&[
                self.assembly_filter(),
                Filter::Tag(Tag::access(class)),
                Filter::InstanceStateIn(InstanceState::reclaimable()),
            ])
            .await?
            .into_iter()
            .map(|instance| instance.id)
            .collect();
        if instance_ids.is_empty() {
            return Ok(());
        }

        self.gateway
            .delete_tags(
                &instance_ids,
                &[Tag::assembly(&self.id), Tag::access(class)],
            )
            .await?;
        self.gateway.terminate_instances(&instance_ids).await
    }

    /// Strip the bastion-originated default route from each network's
    /// main route table. The route may already be gone with the bastion;
    /// provider errors here are ignored.
    async fn strip_default_routes(&self, vpc_ids: &[String]) {
        info!("removing default route from main route tables");
        for vpc_id in vpc_ids {
            if let Err(error) = self.strip_default_route(vpc_id).await {
                debug!(vpc = %vpc_id, %error, "default route already gone");
            }
        }
    }

    async fn strip_default_route(&self, vpc_id: &str) -> Result<()> {
        let tables = self
            .gateway
            .describe_route_tables(&[Filter::VpcId(vpc_id.to_string()), Filter::MainAssociation])
            .await?;
        for table in tables {
            self.gateway
                .delete_route(&table.id, plan::DEFAULT_ROUTE_CIDR)
                .await?;
        }
        Ok(())
    }

    async fn remove_route_tables(&self) -> Result<()> {
        info!("deleting route tables");
        let tables = self
            .gateway
            .describe_route_tables(&[self.assembly_filter()])
            .await?;
        for table in tables {
            for association in &table.associations {
                self.gateway
                    .disassociate_route_table(&association.id)
                    .await?;
            }
            self.gateway.delete_route_table(&table.id).await?;
        }
        Ok(())
    }

    /// One detach-and-delete pass over the tagged internet gateways.
    /// Detachment can fail while addresses on the network are still
    /// releasing, so the caller retries the whole pass.
    async fn sweep_internet_gateways(&self) -> Result<()> {
        let gateways = self
            .gateway
            .describe_internet_gateways(&[self.assembly_filter()])
            .await?;
        for gateway in gateways {
            for vpc_id in &gateway.attached_vpcs {
                self.gateway
                    .detach_internet_gateway(&gateway.id, vpc_id)
                    .await?;
            }
            self.gateway.delete_internet_gateway(&gateway.id).await?;
        }
        Ok(())
    }

    async fn remove_key_pair(&self) -> Result<()> {
        info!("deleting key pair");
        self.gateway.delete_key_pair(self.id.as_str()).await?;
        keys::remove_private_key(&self.config.key_path);
        Ok(())
    }

    async fn remove_instance_profiles(&self) -> Result<()> {
        info!("deleting instance profiles");
        let profiles = self
            .gateway
            .list_instance_profiles(&self.id.iam_path())
            .await?;
        for profile in profiles {
            for role_name in &profile.role_names {
                self.gateway
                    .remove_role_from_instance_profile(&profile.name, role_name)
                    .await?;
            }
            self.gateway.delete_instance_profile(&profile.name).await?;
        }
        Ok(())
    }

    async fn remove_roles(&self) -> Result<()> {
        info!("deleting roles");
        let roles = self.gateway.list_roles(&self.id.iam_path()).await?;
        for role in roles {
            let attached = self
                .gateway
                .list_attached_role_policies(&role.name)
                .await?;
            for policy_arn in &attached {
                self.gateway
                    .detach_role_policy(&role.name, policy_arn)
                    .await?;
            }
            self.gateway.delete_role(&role.name).await?;
        }
        Ok(())
    }

    /// One delete pass over the tagged security groups. Groups stay
    /// referenced until the terminated instances release them, so the
    /// caller retries the whole pass.
    async fn sweep_security_groups(&self) -> Result<()> {
        let groups = self
            .gateway
            .describe_security_groups(&[self.assembly_filter()])
            .await?;
        for group in groups {
            self.gateway.delete_security_group(&group.id).await?;
        }
        Ok(())
    }

    async fn remove_subnets(&self) -> Result<()> {
        info!("deleting subnets");
        let subnets = self
            .gateway
            .describe_subnets(&[self.assembly_filter()])
            .await?;
        for subnet in subnets {
            self.gateway.delete_subnet(&subnet.id).await?;
        }
        Ok(())
    }
}
