//! AWS implementation of the encamp cloud gateway
//!
//! Translates the typed gateway operations into EC2, ECS and IAM calls,
//! and provides the checkip-based address discovery used for the public
//! security group's SSH rule.

pub mod discovery;
pub mod gateway;

// Re-exports
pub use discovery::CheckIp;
pub use gateway::AwsGateway;
