//! Error types for assembly orchestration

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while provisioning or tearing down an assembly
#[derive(Error, Debug)]
pub enum CloudError {
    /// Existing tagged state is ambiguous or incompatible with the
    /// requested assembly. Never auto-resolved: picking one of several
    /// matches would silently operate on the wrong resource.
    #[error("conflicting {kind} state for this identifier: {detail}")]
    Conflict { kind: &'static str, detail: String },

    #[error("cloud API error: {0}")]
    Api(String),

    #[error("address discovery failed: {0}")]
    AddressDiscovery(String),

    #[error("could not write private key to {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no machine image matches '{0}'")]
    NoImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
