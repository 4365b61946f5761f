//! Trust and inline policy construction (deterministic)

use super::{InlinePolicy, PolicyDocument, Principals, StatementEntry};

pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";
pub const EC2_SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";
pub const EKS_SERVICE_PRINCIPAL: &str = "eks.amazonaws.com";

/// Trust policy allowing `principal_id` (a service principal) to assume the role.
///
/// The document always holds exactly one statement.
pub fn assume_role_policy(principal_id: &str) -> PolicyDocument {
    PolicyDocument::new(vec![StatementEntry::allow(
        [ASSUME_ROLE_ACTION],
        std::iter::empty::<String>(),
    )
    .with_principal(Principals::service(principal_id))])
}

pub fn ec2_assume_role_policy() -> PolicyDocument {
    assume_role_policy(EC2_SERVICE_PRINCIPAL)
}

pub fn eks_assume_role_policy() -> PolicyDocument {
    assume_role_policy(EKS_SERVICE_PRINCIPAL)
}

/// EC2 trust policy followed by caller-supplied trust statements
pub fn ec2_trust_policy_with(extra: &[StatementEntry]) -> PolicyDocument {
    let mut document = ec2_assume_role_policy();
    document.statement.extend_from_slice(extra);
    document
}

/// Wrap caller-supplied statements into a single inline policy named `policy_name`.
///
/// Returns no policy at all when there are no statements, so that users and
/// roles without extra grants carry an empty `Policies` list.
pub fn inline_policies(policy_name: &str, statements: &[StatementEntry]) -> Vec<InlinePolicy> {
    if statements.is_empty() {
        return Vec::new();
    }
    vec![InlinePolicy {
        policy_name: policy_name.to_string(),
        policy_document: PolicyDocument::new(statements.to_vec()),
    }]
}
