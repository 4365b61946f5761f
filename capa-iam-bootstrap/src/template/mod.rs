//! Resource assembly
//!
//! [`Template`] walks a validated [`ConfigurationSpec`] and produces the
//! [`ResourceMap`] of IAM resources Cluster API Provider AWS needs. Each
//! resource is gated by its own toggle; resources refer to each other by
//! logical name only, so the insertion order never matters.

pub mod catalog;
pub mod naming;
pub mod resource;

use log::info;
use std::fmt;
use std::str::FromStr;

use crate::cloudformation::CloudFormationTemplate;
use crate::config::ConfigurationSpec;
use crate::error::{BootstrapError, BootstrapResult};
use crate::policy::builder::{eks_assume_role_policy, ec2_trust_policy_with, inline_policies};
use crate::policy::{PolicyDocument, ANY};
use resource::{
    tags_from, Group, InstanceProfile, LogicalRef, ManagedPolicy, Resource, ResourceMap, Role,
    Target, User,
};

pub const AWS_IAM_GROUP_BOOTSTRAPPER: &str = "AWSIAMGroupBootstrapper";
pub const AWS_IAM_INSTANCE_PROFILE_CONTROLLERS: &str = "AWSIAMInstanceProfileControllers";
pub const AWS_IAM_INSTANCE_PROFILE_CONTROL_PLANE: &str = "AWSIAMInstanceProfileControlPlane";
pub const AWS_IAM_INSTANCE_PROFILE_NODES: &str = "AWSIAMInstanceProfileNodes";
pub const AWS_IAM_ROLE_CONTROLLERS: &str = "AWSIAMRoleControllers";
pub const AWS_IAM_ROLE_CONTROL_PLANE: &str = "AWSIAMRoleControlPlane";
pub const AWS_IAM_ROLE_NODES: &str = "AWSIAMRoleNodes";
pub const AWS_IAM_ROLE_EKS_CONTROL_PLANE: &str = "AWSIAMRoleEKSControlPlane";
pub const AWS_IAM_USER_BOOTSTRAPPER: &str = "AWSIAMUserBootstrapper";

/// Role name the EKS control plane controller expects; not derived from the
/// configured prefix/suffix.
pub const DEFAULT_EKS_CONTROL_PLANE_ROLE: &str =
    "eks-controlplane.cluster-api-provider-aws.sigs.k8s.io";

/// Logical names of the managed policies the template can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyName {
    Controllers,
    ControlPlane,
    Nodes,
    Csi,
}

impl PolicyName {
    pub const ALL: [Self; 4] = [Self::Controllers, Self::ControlPlane, Self::Nodes, Self::Csi];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Controllers => "AWSIAMManagedPolicyControllers",
            Self::ControlPlane => "AWSIAMManagedPolicyCloudProviderControlPlane",
            Self::Nodes => "AWSIAMManagedPolicyCloudProviderNodes",
            Self::Csi => "AWSEBSCSIPolicyController",
        }
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyName {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| BootstrapError::unknown_policy(s))
    }
}

/// IAM bootstrap template for a validated configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    spec: ConfigurationSpec,
}

impl Template {
    /// Create a template, failing fast on a configuration that violates the
    /// template's preconditions.
    pub fn new(spec: ConfigurationSpec) -> BootstrapResult<Self> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &ConfigurationSpec {
        &self.spec
    }

    /// IAM-acceptable name made of the configured prefix, `name` and suffix
    pub fn new_managed_name(&self, name: &str) -> String {
        naming::new_managed_name(
            &self.spec.name_prefix,
            name,
            self.spec.name_suffix.as_deref().unwrap_or_default(),
        )
    }

    /// Assemble every IAM resource enabled by the configuration
    pub fn render(&self) -> ResourceMap {
        let mut resources = ResourceMap::new();

        if self.spec.bootstrap_user.enable {
            resources.insert(AWS_IAM_USER_BOOTSTRAPPER, self.bootstrap_user());
            resources.insert(
                AWS_IAM_GROUP_BOOTSTRAPPER,
                Resource::Group(Group {
                    group_name: self.spec.bootstrap_user.group_name.clone(),
                }),
            );
        }

        resources.insert(
            PolicyName::Controllers.as_str(),
            Resource::ManagedPolicy(ManagedPolicy {
                managed_policy_name: self.new_managed_name(naming::CONTROLLERS),
                description: "For the Kubernetes Cluster API Provider AWS Controllers".to_string(),
                policy_document: self.controllers_policy(),
                groups: self.controllers_policy_groups(),
                roles: self.controllers_policy_role_attachments(),
            }),
        );

        if !self.spec.control_plane.disable_cloud_provider_policy {
            resources.insert(
                PolicyName::ControlPlane.as_str(),
                Resource::ManagedPolicy(ManagedPolicy {
                    managed_policy_name: self.new_managed_name(naming::CONTROL_PLANE),
                    description: "For the Kubernetes Cloud Provider AWS Control Plane".to_string(),
                    policy_document: catalog::cloud_provider_control_plane_policy(),
                    groups: Vec::new(),
                    roles: vec![LogicalRef::new(AWS_IAM_ROLE_CONTROL_PLANE)],
                }),
            );
        }

        if !self.spec.nodes.disable_cloud_provider_policy {
            resources.insert(
                PolicyName::Nodes.as_str(),
                Resource::ManagedPolicy(ManagedPolicy {
                    managed_policy_name: self.new_managed_name(naming::NODES),
                    description: "For the Kubernetes Cloud Provider AWS nodes".to_string(),
                    policy_document: catalog::cloud_provider_nodes_policy(),
                    groups: Vec::new(),
                    // Control plane machines run a kubelet as well
                    roles: vec![
                        LogicalRef::new(AWS_IAM_ROLE_CONTROL_PLANE),
                        LogicalRef::new(AWS_IAM_ROLE_NODES),
                    ],
                }),
            );
        }

        if self.spec.control_plane.enable_csi_policy {
            resources.insert(
                PolicyName::Csi.as_str(),
                Resource::ManagedPolicy(ManagedPolicy {
                    managed_policy_name: self.new_managed_name(naming::CSI),
                    description: "For the AWS EBS CSI Driver for Kubernetes".to_string(),
                    policy_document: catalog::csi_controller_policy(),
                    groups: Vec::new(),
                    roles: vec![LogicalRef::new(AWS_IAM_ROLE_CONTROL_PLANE)],
                }),
            );
        }

        let control_plane = &self.spec.control_plane.role;
        resources.insert(
            AWS_IAM_ROLE_CONTROL_PLANE,
            Resource::Role(Role {
                role_name: self.new_managed_name(naming::CONTROL_PLANE),
                assume_role_policy_document: ec2_trust_policy_with(&control_plane.trust_statements),
                managed_policy_arns: control_plane.extra_policy_attachments.clone(),
                policies: inline_policies(&self.spec.stack_name, &control_plane.extra_statements),
                tags: tags_from(&control_plane.tags),
            }),
        );

        let controllers = &self.spec.cluster_api_controllers;
        resources.insert(
            AWS_IAM_ROLE_CONTROLLERS,
            Resource::Role(Role {
                role_name: self.new_managed_name(naming::CONTROLLERS),
                assume_role_policy_document: ec2_trust_policy_with(&controllers.trust_statements),
                managed_policy_arns: Vec::new(),
                policies: Vec::new(),
                tags: tags_from(&controllers.tags),
            }),
        );

        let nodes = &self.spec.nodes.role;
        resources.insert(
            AWS_IAM_ROLE_NODES,
            Resource::Role(Role {
                role_name: self.new_managed_name(naming::NODES),
                assume_role_policy_document: ec2_trust_policy_with(&nodes.trust_statements),
                managed_policy_arns: nodes.extra_policy_attachments.clone(),
                policies: inline_policies(&self.spec.stack_name, &nodes.extra_statements),
                tags: tags_from(&nodes.tags),
            }),
        );

        for (logical_name, base, role) in [
            (
                AWS_IAM_INSTANCE_PROFILE_CONTROL_PLANE,
                naming::CONTROL_PLANE,
                AWS_IAM_ROLE_CONTROL_PLANE,
            ),
            (
                AWS_IAM_INSTANCE_PROFILE_CONTROLLERS,
                naming::CONTROLLERS,
                AWS_IAM_ROLE_CONTROLLERS,
            ),
            (
                AWS_IAM_INSTANCE_PROFILE_NODES,
                naming::NODES,
                AWS_IAM_ROLE_NODES,
            ),
        ] {
            resources.insert(
                logical_name,
                Resource::InstanceProfile(InstanceProfile {
                    instance_profile_name: self.new_managed_name(base),
                    role: LogicalRef::new(role),
                }),
            );
        }

        if !self.spec.managed_control_plane.disable {
            resources.insert(
                AWS_IAM_ROLE_EKS_CONTROL_PLANE,
                Resource::Role(Role {
                    role_name: DEFAULT_EKS_CONTROL_PLANE_ROLE.to_string(),
                    assume_role_policy_document: eks_assume_role_policy(),
                    managed_policy_arns: self.eks_control_plane_policies(),
                    policies: Vec::new(),
                    tags: tags_from(&self.spec.managed_control_plane.tags),
                }),
            );
        }

        info!("Rendered {} IAM resources", resources.len());
        resources
    }

    /// Render the resources as a CloudFormation template
    pub fn render_cloudformation(&self) -> CloudFormationTemplate {
        CloudFormationTemplate::from_resources(self.render())
    }

    /// The document of a managed policy, whether or not the current
    /// configuration creates it
    pub fn policy_document(&self, name: PolicyName) -> PolicyDocument {
        match name {
            PolicyName::Controllers => self.controllers_policy(),
            PolicyName::ControlPlane => catalog::cloud_provider_control_plane_policy(),
            PolicyName::Nodes => catalog::cloud_provider_nodes_policy(),
            PolicyName::Csi => catalog::csi_controller_policy(),
        }
    }

    fn bootstrap_user(&self) -> Resource {
        let user = &self.spec.bootstrap_user;
        let mut groups: Vec<Target> = user.extra_groups.iter().cloned().map(Target::Name).collect();
        groups.push(Target::Ref(LogicalRef::new(AWS_IAM_GROUP_BOOTSTRAPPER)));

        Resource::User(User {
            user_name: user.user_name.clone(),
            groups,
            managed_policy_arns: user.extra_policy_attachments.clone(),
            policies: inline_policies(&self.spec.stack_name, &user.extra_statements),
            tags: tags_from(&user.tags),
        })
    }

    fn controllers_policy(&self) -> PolicyDocument {
        let controllers = &self.spec.cluster_api_controllers;
        let allowed = controllers
            .allowed_ec2_instance_profiles
            .clone()
            .unwrap_or_else(|| vec![self.new_managed_name(ANY)]);
        catalog::controllers_policy(
            &allowed,
            !self.spec.managed_control_plane.disable,
            &controllers.extra_statements,
        )
    }

    fn controllers_policy_groups(&self) -> Vec<LogicalRef> {
        if self.spec.bootstrap_user.enable {
            vec![LogicalRef::new(AWS_IAM_GROUP_BOOTSTRAPPER)]
        } else {
            Vec::new()
        }
    }

    fn controllers_policy_role_attachments(&self) -> Vec<LogicalRef> {
        let mut attachments = vec![LogicalRef::new(AWS_IAM_ROLE_CONTROLLERS)];
        if !self
            .spec
            .control_plane
            .disable_cluster_api_controller_policy_attachment
        {
            attachments.push(LogicalRef::new(AWS_IAM_ROLE_CONTROL_PLANE));
        }
        attachments
    }

    fn eks_control_plane_policies(&self) -> Vec<String> {
        let mut policies = vec![catalog::EKS_CLUSTER_POLICY_ARN.to_string()];
        policies.extend(
            self.spec
                .managed_control_plane
                .extra_policy_attachments
                .iter()
                .cloned(),
        );
        policies
    }
}
