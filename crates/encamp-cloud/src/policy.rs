//! IAM trust policy for the worker role

use serde::Serialize;

/// Managed policy granting container-service agent permissions to the
/// worker instances.
pub const CLUSTER_AGENT_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonEC2ContainerServiceforEC2Role";

/// Managed policy granting the workers object-storage access.
pub const STORAGE_ACCESS_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonS3FullAccess";

/// The static trust-policy document allowing EC2 to assume the worker
/// role.
#[derive(Debug, Serialize)]
pub struct TrustPolicy {
    #[serde(rename = "Version")]
    version: &'static str,
    #[serde(rename = "Statement")]
    statement: Statement,
}

#[derive(Debug, Serialize)]
struct Statement {
    #[serde(rename = "Effect")]
    effect: &'static str,
    #[serde(rename = "Principal")]
    principal: Principal,
    #[serde(rename = "Action")]
    action: &'static str,
}

#[derive(Debug, Serialize)]
struct Principal {
    #[serde(rename = "Service")]
    service: &'static str,
}

impl TrustPolicy {
    /// The only trust relationship this assembly needs: instances assume
    /// the role.
    pub fn ec2_assume_role() -> Self {
        Self {
            version: "2012-10-17",
            statement: Statement {
                effect: "Allow",
                principal: Principal {
                    service: "ec2.amazonaws.com",
                },
                action: "sts:AssumeRole",
            },
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_has_the_expected_shape() {
        let json = TrustPolicy::ec2_assume_role().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Version"], "2012-10-17");
        assert_eq!(value["Statement"]["Effect"], "Allow");
        assert_eq!(value["Statement"]["Principal"]["Service"], "ec2.amazonaws.com");
        assert_eq!(value["Statement"]["Action"], "sts:AssumeRole");
    }
}
