//! This crate provides the core logic for bootstrapping the AWS IAM resources
//! used by Cluster API Provider AWS:
//! - Configuration spec with defaults and precondition checks
//! - Trust and permission policy documents
//! - Resource assembly into a keyed resource map
//! - CloudFormation rendering
//!

pub mod cloudformation;
pub mod config;
mod error;
pub mod policy;
pub mod template;

// Re-exports for a small, focused public API
pub use cloudformation::CloudFormationTemplate;
pub use config::ConfigurationSpec;
pub use error::{BootstrapError, BootstrapResult, ConfigError};
pub use policy::{ConditionValue, Effect, PolicyDocument, Principals, StatementEntry};
pub use template::resource::{Resource, ResourceKind, ResourceMap};
pub use template::{PolicyName, Template};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_renders() {
        let template = Template::new(ConfigurationSpec::default()).expect("defaults are valid");
        let resources = template.render();
        assert_eq!(resources.count_of(ResourceKind::Role), 4);
        assert_eq!(resources.count_of(ResourceKind::InstanceProfile), 3);
        assert!(resources.dangling_references().is_empty());
    }
}
