//! Configuration spec for the bootstrap template
//!
//! Settings are grouped by the actor they apply to: the bootstrap user, the
//! control plane, the Cluster API controllers, the nodes and the EKS managed
//! control plane. Every field is optional on input; missing fields take the
//! defaults below.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::policy::StatementEntry;

pub const DEFAULT_NAME_SUFFIX: &str = ".cluster-api-provider-aws.sigs.k8s.io";
pub const DEFAULT_STACK_NAME: &str = "cluster-api-provider-aws-sigs-k8s-io";
pub const DEFAULT_BOOTSTRAP_USER_NAME: &str = "bootstrapper.cluster-api-provider-aws.sigs.k8s.io";
pub const DEFAULT_BOOTSTRAP_GROUP_NAME: &str = "bootstrapper.cluster-api-provider-aws.sigs.k8s.io";

/// Resource tags; keys are unique and emitted sorted.
pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
#[schemars(description = "IAM bootstrap configuration for Cluster API Provider AWS.")]
pub struct ConfigurationSpec {
    #[schemars(description = "Prefix prepended to every managed resource name")]
    pub name_prefix: String,

    #[schemars(description = "Suffix appended to every managed resource name")]
    pub name_suffix: Option<String>,

    #[schemars(description = "Name of the stack; also names every inline policy")]
    pub stack_name: String,

    pub bootstrap_user: BootstrapUser,
    pub control_plane: ControlPlane,
    #[serde(rename = "clusterAPIControllers")]
    pub cluster_api_controllers: ClusterApiControllers,
    pub nodes: Nodes,
    pub managed_control_plane: ManagedControlPlane,
}

impl Default for ConfigurationSpec {
    fn default() -> Self {
        Self {
            name_prefix: String::new(),
            name_suffix: Some(DEFAULT_NAME_SUFFIX.to_string()),
            stack_name: DEFAULT_STACK_NAME.to_string(),
            bootstrap_user: BootstrapUser::default(),
            control_plane: ControlPlane::default(),
            cluster_api_controllers: ClusterApiControllers::default(),
            nodes: Nodes::default(),
            managed_control_plane: ManagedControlPlane::default(),
        }
    }
}

/// Settings shared by every role created from the spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleSpec {
    #[schemars(description = "ARNs of existing managed policies to attach to the role")]
    pub extra_policy_attachments: Vec<String>,

    #[schemars(description = "Statements added to the role as an inline policy")]
    pub extra_statements: Vec<StatementEntry>,

    #[schemars(description = "Statements appended to the role's trust policy")]
    pub trust_statements: Vec<StatementEntry>,

    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BootstrapUser {
    pub enable: bool,
    pub user_name: String,
    pub group_name: String,
    /// Managed policy ARNs attached to the bootstrap user itself
    #[schemars(description = "ARNs of existing managed policies to attach to the bootstrap user")]
    pub extra_policy_attachments: Vec<String>,
    #[schemars(description = "Existing groups the bootstrap user also joins")]
    pub extra_groups: Vec<String>,
    pub extra_statements: Vec<StatementEntry>,
    pub tags: Tags,
}

impl Default for BootstrapUser {
    fn default() -> Self {
        Self {
            enable: false,
            user_name: DEFAULT_BOOTSTRAP_USER_NAME.to_string(),
            group_name: DEFAULT_BOOTSTRAP_GROUP_NAME.to_string(),
            extra_policy_attachments: Vec::new(),
            extra_groups: Vec::new(),
            extra_statements: Vec::new(),
            tags: Tags::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlPlane {
    #[serde(flatten)]
    pub role: RoleSpec,

    #[schemars(description = "Skip the Kubernetes AWS cloud provider control plane policy")]
    pub disable_cloud_provider_policy: bool,

    #[schemars(description = "Create the AWS EBS CSI driver controller policy")]
    #[serde(rename = "enableCSIPolicy")]
    pub enable_csi_policy: bool,

    #[schemars(description = "Do not attach the controllers policy to the control plane role")]
    #[serde(rename = "disableClusterAPIControllerPolicyAttachment")]
    pub disable_cluster_api_controller_policy_attachment: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterApiControllers {
    #[schemars(description = "Statements appended to the controllers managed policy")]
    pub extra_statements: Vec<StatementEntry>,

    #[schemars(description = "Statements appended to the controllers role's trust policy")]
    pub trust_statements: Vec<StatementEntry>,

    pub tags: Tags,

    #[schemars(
        description = "Role names the controllers may pass to EC2. Defaults to every managed name."
    )]
    #[serde(rename = "allowedEC2InstanceProfiles")]
    pub allowed_ec2_instance_profiles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Nodes {
    #[serde(flatten)]
    pub role: RoleSpec,

    #[schemars(description = "Skip the Kubernetes AWS cloud provider node policy")]
    pub disable_cloud_provider_policy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedControlPlane {
    #[schemars(description = "Skip the EKS control plane role")]
    pub disable: bool,
    pub extra_policy_attachments: Vec<String>,
    pub tags: Tags,
}

impl ConfigurationSpec {
    /// Check the preconditions the template relies on.
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name_suffix.is_none() {
            return Err(ConfigError::MissingField {
                field: "nameSuffix",
            });
        }
        if self.stack_name.is_empty() {
            return Err(ConfigError::EmptyField { field: "stackName" });
        }
        if self.bootstrap_user.enable {
            if self.bootstrap_user.user_name.is_empty() {
                return Err(ConfigError::EmptyField {
                    field: "bootstrapUser.userName",
                });
            }
            if self.bootstrap_user.group_name.is_empty() {
                return Err(ConfigError::EmptyField {
                    field: "bootstrapUser.groupName",
                });
            }
        }

        if let Some(profiles) = &self.cluster_api_controllers.allowed_ec2_instance_profiles {
            if profiles.is_empty() || profiles.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::EmptyField {
                    field: "clusterAPIControllers.allowedEC2InstanceProfiles",
                });
            }
        }

        let attachments: [(&'static str, &[String]); 4] = [
            (
                "bootstrapUser",
                &self.bootstrap_user.extra_policy_attachments,
            ),
            (
                "controlPlane",
                &self.control_plane.role.extra_policy_attachments,
            ),
            ("nodes", &self.nodes.role.extra_policy_attachments),
            (
                "managedControlPlane",
                &self.managed_control_plane.extra_policy_attachments,
            ),
        ];
        for (group, arns) in attachments {
            if let Some(index) = arns.iter().position(|arn| arn.trim().is_empty()) {
                return Err(ConfigError::EmptyPolicyAttachment { group, index });
            }
        }

        let statements: [(&'static str, &[StatementEntry]); 7] = [
            ("bootstrapUser", &self.bootstrap_user.extra_statements),
            ("controlPlane", &self.control_plane.role.extra_statements),
            ("controlPlane", &self.control_plane.role.trust_statements),
            (
                "clusterAPIControllers",
                &self.cluster_api_controllers.extra_statements,
            ),
            (
                "clusterAPIControllers",
                &self.cluster_api_controllers.trust_statements,
            ),
            ("nodes", &self.nodes.role.extra_statements),
            ("nodes", &self.nodes.role.trust_statements),
        ];
        for (group, entries) in statements {
            if let Some(index) = entries.iter().position(|s| s.action.is_empty()) {
                return Err(ConfigError::StatementWithoutActions { group, index });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ANY;

    #[test]
    fn test_defaults_are_valid() {
        let spec = ConfigurationSpec::default();
        assert_eq!(spec.validate(), Ok(()));
        assert_eq!(spec.name_suffix.as_deref(), Some(DEFAULT_NAME_SUFFIX));
        assert!(!spec.bootstrap_user.enable);
        assert!(!spec.managed_control_plane.disable);
    }

    #[test]
    fn test_empty_document_takes_defaults() {
        let spec: ConfigurationSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, ConfigurationSpec::default());
    }

    #[test]
    fn test_partial_document_merges_with_defaults() {
        let spec: ConfigurationSpec = serde_json::from_str(
            r#"{
                "namePrefix": "test-",
                "bootstrapUser": {"enable": true},
                "controlPlane": {"enableCSIPolicy": true, "tags": {"team": "infra"}},
                "clusterAPIControllers": {"allowedEC2InstanceProfiles": ["custom"]},
                "nodes": {"extraPolicyAttachments": ["arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore"]}
            }"#,
        )
        .unwrap();
        assert_eq!(spec.name_prefix, "test-");
        assert_eq!(spec.stack_name, DEFAULT_STACK_NAME);
        assert!(spec.bootstrap_user.enable);
        assert_eq!(spec.bootstrap_user.user_name, DEFAULT_BOOTSTRAP_USER_NAME);
        assert!(spec.control_plane.enable_csi_policy);
        assert_eq!(spec.control_plane.role.tags["team"], "infra");
        assert_eq!(
            spec.cluster_api_controllers.allowed_ec2_instance_profiles,
            Some(vec!["custom".to_string()])
        );
        assert_eq!(spec.nodes.role.extra_policy_attachments.len(), 1);
    }

    #[test]
    fn test_null_name_suffix_is_rejected() {
        let spec: ConfigurationSpec = serde_json::from_str(r#"{"nameSuffix": null}"#).unwrap();
        assert_eq!(
            spec.validate(),
            Err(ConfigError::MissingField {
                field: "nameSuffix"
            })
        );
    }

    #[test]
    fn test_empty_suffix_is_allowed() {
        let spec = ConfigurationSpec {
            name_suffix: Some(String::new()),
            ..ConfigurationSpec::default()
        };
        assert_eq!(spec.validate(), Ok(()));
    }

    #[test]
    fn test_enabled_bootstrap_user_requires_names() {
        let mut spec = ConfigurationSpec::default();
        spec.bootstrap_user.enable = true;
        spec.bootstrap_user.group_name.clear();
        assert_eq!(
            spec.validate(),
            Err(ConfigError::EmptyField {
                field: "bootstrapUser.groupName"
            })
        );

        // Names are irrelevant while the user is disabled
        spec.bootstrap_user.enable = false;
        assert_eq!(spec.validate(), Ok(()));
    }

    #[test]
    fn test_allowed_instance_profiles_must_not_be_empty() {
        let field = "clusterAPIControllers.allowedEC2InstanceProfiles";
        for profiles in [vec![], vec!["custom".to_string(), "  ".to_string()]] {
            let mut spec = ConfigurationSpec::default();
            spec.cluster_api_controllers.allowed_ec2_instance_profiles = Some(profiles);
            assert_eq!(spec.validate(), Err(ConfigError::EmptyField { field }));
        }

        let mut spec = ConfigurationSpec::default();
        spec.cluster_api_controllers.allowed_ec2_instance_profiles = Some(vec!["custom".into()]);
        assert_eq!(spec.validate(), Ok(()));
    }

    #[test]
    fn test_blank_attachment_is_rejected() {
        let mut spec = ConfigurationSpec::default();
        spec.nodes.role.extra_policy_attachments =
            vec!["arn:aws:iam::aws:policy/A".into(), " ".into()];
        assert_eq!(
            spec.validate(),
            Err(ConfigError::EmptyPolicyAttachment {
                group: "nodes",
                index: 1
            })
        );
    }

    #[test]
    fn test_statement_without_actions_is_rejected() {
        let mut spec = ConfigurationSpec::default();
        spec.control_plane.role.extra_statements =
            vec![StatementEntry::allow(Vec::<String>::new(), [ANY])];
        assert_eq!(
            spec.validate(),
            Err(ConfigError::StatementWithoutActions {
                group: "controlPlane",
                index: 0
            })
        );
    }

    #[test]
    fn test_round_trips_through_camel_case() {
        let mut spec = ConfigurationSpec::default();
        spec.control_plane.disable_cluster_api_controller_policy_attachment = true;
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json["controlPlane"]["disableClusterAPIControllerPolicyAttachment"],
            serde_json::Value::Bool(true)
        );
        assert!(json["clusterAPIControllers"].is_object());
    }
}
