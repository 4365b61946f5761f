//! Managed resource naming

/// Base names of the resources created per actor.
pub const CONTROLLERS: &str = "controllers";
pub const CONTROL_PLANE: &str = "control-plane";
pub const NODES: &str = "nodes";
pub const CSI: &str = "csi";

/// Build an IAM name as `prefix + base + suffix`.
///
/// Provider length and charset limits are not checked here; a non-compliant
/// prefix or suffix is rejected by IAM when the stack is created.
pub fn new_managed_name(prefix: &str, base: &str, suffix: &str) -> String {
    format!("{}{}{}", prefix, base, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("test-", NODES, ".cluster-api", "test-nodes.cluster-api")]
    #[case(
        "",
        CONTROLLERS,
        ".cluster-api-provider-aws.sigs.k8s.io",
        "controllers.cluster-api-provider-aws.sigs.k8s.io"
    )]
    #[case("", CONTROL_PLANE, "", "control-plane")]
    #[case("a", "*", "b", "a*b")]
    fn test_new_managed_name(
        #[case] prefix: &str,
        #[case] base: &str,
        #[case] suffix: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(new_managed_name(prefix, base, suffix), expected);
    }
}
