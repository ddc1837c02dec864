//! Assembly identity and the operator-facing summary

use serde::{Deserialize, Serialize};

/// The user-supplied label correlating every resource of one assembly.
///
/// Opaque and immutable for the lifetime of a run; it becomes the value of
/// the assembly tag, the cluster name, the key-pair name, and the prefix
/// of the role and profile names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyId(String);

impl AssemblyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path under which the assembly's role and instance profile live.
    pub fn iam_path(&self) -> String {
        format!("/{}/", self.0)
    }

    /// Shared name of the worker role and its instance profile.
    pub fn role_name(&self) -> String {
        format!("{}-ecs", self.0)
    }
}

impl std::fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssemblyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a successful provisioning run produced, summarized for the
/// operator.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub id: AssemblyId,
    /// Public address of the bastion, the single SSH entry point.
    pub bastion_address: String,
    /// Private addresses of the cluster workers, reachable through the
    /// bastion.
    pub worker_addresses: Vec<String>,
}

impl std::fmt::Display for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Provisioned an assembly with the following details.")?;
        writeln!(f)?;
        writeln!(f, "  * Identifier tag, with tag key 'eg-id', is '{}'.", self.id)?;
        writeln!(
            f,
            "  * Public address of the bastion instance, through which all SSH access is made:"
        )?;
        writeln!(f, "        {}", self.bastion_address)?;
        writeln!(
            f,
            "  * {} worker instance(s) joined to the cluster named '{}', reachable through",
            self.worker_addresses.len(),
            self.id
        )?;
        writeln!(f, "    the bastion at these private addresses:")?;
        for address in &self.worker_addresses {
            writeln!(f, "        {address}")?;
        }
        writeln!(f)?;
        writeln!(f, "To access the bastion, load the generated key into your agent:")?;
        writeln!(f)?;
        writeln!(f, "        ssh-add ~/.ssh/{}_id_rsa", self.id)?;
        writeln!(f)?;
        writeln!(f, "then connect with agent forwarding:")?;
        writeln!(f)?;
        writeln!(f, "        ssh -A ec2-user@{}", self.bastion_address)?;
        writeln!(f)?;
        write!(f, "and from there the private workers are reachable.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_derives_role_naming() {
        let id = AssemblyId::new("demo");
        assert_eq!(id.iam_path(), "/demo/");
        assert_eq!(id.role_name(), "demo-ecs");
    }

    #[test]
    fn summary_names_the_assembly_and_addresses() {
        let assembly = Assembly {
            id: AssemblyId::new("demo"),
            bastion_address: "198.51.100.7".into(),
            worker_addresses: vec!["10.2.2.21".into(), "10.2.2.37".into()],
        };
        let text = assembly.to_string();
        assert!(text.contains("'demo'"));
        assert!(text.contains("198.51.100.7"));
        assert!(text.contains("10.2.2.21"));
        assert!(text.contains("10.2.2.37"));
        assert!(text.contains("2 worker instance(s)"));
        assert!(text.contains("ssh-add ~/.ssh/demo_id_rsa"));
        assert!(text.contains("ssh -A ec2-user@198.51.100.7"));
    }
}
