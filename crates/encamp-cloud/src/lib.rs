//! encamp cloud orchestration
//!
//! This crate provides the tag-identified provisioning and teardown
//! pipelines behind the `encamp` CLI: one user-supplied label
//! deterministically produces, re-discovers, or fully removes a
//! self-contained network assembly (virtual network, subnets, security
//! perimeters, a bastion/NAT host, and cluster workers) with no state
//! file — identity is recovered by live tag-filtered queries.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   encamp CLI                     │
//! │               (encamp <id> [delete])             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                encamp-cloud                      │
//! │  ┌──────────────┐        ┌──────────────┐       │
//! │  │ Provisioner  │        │   Teardown   │       │
//! │  └──────┬───────┘        └──────┬───────┘       │
//! │  ┌──────▼──────────────────────▼───────────┐    │
//! │  │        Gateway Abstraction               │    │
//! │  │  trait CloudGateway { ... }              │    │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │  Tag Index   │  │  Retry/Poll  │             │
//! │  └──────────────┘  └──────────────┘             │
//! └───────────────────┬─────────────────────────────┘
//!                     │
//!           ┌─────────▼─────────┐
//!           │  encamp-cloud-aws │
//!           │   (EC2/ECS/IAM)   │
//!           └───────────────────┘
//! ```
//!
//! Each provisioning step is "query by tag, create if absent, tag what
//! was created", so a re-run picks up wherever a previous run stopped.
//! Teardown mirrors the steps in reverse and treats missing resources as
//! already satisfied.

pub mod assembly;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod plan;
pub mod policy;
pub mod provision;
pub mod retry;
pub mod tags;
pub mod teardown;

// Re-exports
pub use assembly::{Assembly, AssemblyId};
pub use error::{CloudError, Result};
pub use gateway::{
    AddressDiscovery, CloudGateway, CreatedKeyPair, Filter, ImageRecord, IngressRule,
    InstanceProfileRecord, InstanceRecord, InstanceState, InternetGatewayRecord, KeyPairRecord,
    LaunchSpec, RoleRecord, RouteAssociationRecord, RouteRecord, RouteTableRecord,
    SecurityGroupRecord, SubnetRecord, VpcRecord,
};
pub use provision::{ProvisionConfig, Provisioner};
pub use tags::{AccessClass, Tag};
pub use teardown::{Teardown, TeardownConfig};
