//! Tag-based resource identity
//!
//! Every resource belonging to an assembly carries the assembly tag
//! (`eg-id` = identifier). Resources on the public/bastion side or the
//! private/worker side additionally carry an access-class tag
//! (`eg-access`). Identity resolution is a tag-filtered query expected to
//! return zero or one matches; more than one fails closed.

use crate::assembly::AssemblyId;
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

/// Tag key marking every resource of one assembly.
pub const ASSEMBLY_TAG_KEY: &str = "eg-id";

/// Tag key distinguishing the public/bastion side from the private/worker side.
pub const ACCESS_TAG_KEY: &str = "eg-access";

/// A (key, value) pair attached to cloud resources for identity and
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The assembly tag for an identifier.
    pub fn assembly(id: &AssemblyId) -> Self {
        Self::new(ASSEMBLY_TAG_KEY, id.as_str())
    }

    /// The access-class tag for one side of the assembly.
    pub fn access(class: AccessClass) -> Self {
        Self::new(ACCESS_TAG_KEY, class.as_str())
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Which side of the assembly a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    Public,
    Private,
}

impl AccessClass {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessClass::Public => "public-access",
            AccessClass::Private => "private-access",
        }
    }
}

/// Resolve a tag-filtered query result to at most one resource.
///
/// Zero matches means the caller should create; one match is reused as-is;
/// more than one is a [`CloudError::Conflict`] carrying the ambiguous ids,
/// since the identifier must map to exactly one assembly.
pub fn expect_one_or_none<T>(
    kind: &'static str,
    mut matches: Vec<T>,
    id_of: impl Fn(&T) -> String,
) -> Result<Option<T>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches.remove(0))),
        n => Err(CloudError::Conflict {
            kind,
            detail: format!(
                "{} tagged matches: [{}]",
                n,
                matches.iter().map(id_of).collect::<Vec<_>>().join(", ")
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tags_carry_the_identifier() {
        let id = AssemblyId::new("demo");
        assert_eq!(Tag::assembly(&id), Tag::new("eg-id", "demo"));
        assert_eq!(
            Tag::access(AccessClass::Public),
            Tag::new("eg-access", "public-access")
        );
        assert_eq!(
            Tag::access(AccessClass::Private),
            Tag::new("eg-access", "private-access")
        );
    }

    #[test]
    fn empty_result_means_create() {
        let found = expect_one_or_none("vpc", Vec::<String>::new(), |s| s.clone()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn single_result_is_reused() {
        let found = expect_one_or_none("vpc", vec!["vpc-1".to_string()], |s| s.clone()).unwrap();
        assert_eq!(found.as_deref(), Some("vpc-1"));
    }

    #[test]
    fn multiple_results_fail_closed() {
        let err = expect_one_or_none(
            "vpc",
            vec!["vpc-1".to_string(), "vpc-2".to_string()],
            |s| s.clone(),
        )
        .unwrap_err();
        match err {
            CloudError::Conflict { kind, detail } => {
                assert_eq!(kind, "vpc");
                assert!(detail.contains("vpc-1"));
                assert!(detail.contains("vpc-2"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
