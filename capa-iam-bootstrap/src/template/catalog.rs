//! Permission catalogs for the managed policies
//!
//! The action tables are static data. The functions here only select,
//! combine and parameterize them; statement order is part of the rendered
//! output and must stay stable.

use crate::policy::{PolicyDocument, StatementEntry, ANY};

/// Secrets written by the controllers and consumed by bootstrapping nodes
const CLUSTER_SECRETS_ARN: &str = "arn:*:secretsmanager:*:*:secret:aws.cluster.x-k8s.io/*";

pub const EKS_CLUSTER_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy";

const STRING_LIKE: &str = "StringLike";
const STRING_EQUALS: &str = "StringEquals";

const CONTROLLERS_ACTIONS: &[&str] = &[
    "ec2:AllocateAddress",
    "ec2:AssociateRouteTable",
    "ec2:AttachInternetGateway",
    "ec2:AuthorizeSecurityGroupIngress",
    "ec2:CreateInternetGateway",
    "ec2:CreateNatGateway",
    "ec2:CreateRoute",
    "ec2:CreateRouteTable",
    "ec2:CreateSecurityGroup",
    "ec2:CreateSubnet",
    "ec2:CreateTags",
    "ec2:CreateVpc",
    "ec2:ModifyVpcAttribute",
    "ec2:DeleteInternetGateway",
    "ec2:DeleteNatGateway",
    "ec2:DeleteRouteTable",
    "ec2:DeleteSecurityGroup",
    "ec2:DeleteSubnet",
    "ec2:DeleteTags",
    "ec2:DeleteVpc",
    "ec2:DescribeAccountAttributes",
    "ec2:DescribeAddresses",
    "ec2:DescribeAvailabilityZones",
    "ec2:DescribeInstances",
    "ec2:DescribeInternetGateways",
    "ec2:DescribeImages",
    "ec2:DescribeNatGateways",
    "ec2:DescribeNetworkInterfaces",
    "ec2:DescribeNetworkInterfaceAttribute",
    "ec2:DescribeRouteTables",
    "ec2:DescribeSecurityGroups",
    "ec2:DescribeSubnets",
    "ec2:DescribeVpcs",
    "ec2:DescribeVpcAttribute",
    "ec2:DescribeVolumes",
    "ec2:DetachInternetGateway",
    "ec2:DisassociateRouteTable",
    "ec2:DisassociateAddress",
    "ec2:ModifyInstanceAttribute",
    "ec2:ModifyNetworkInterfaceAttribute",
    "ec2:ModifySubnetAttribute",
    "ec2:ReleaseAddress",
    "ec2:RevokeSecurityGroupIngress",
    "ec2:RunInstances",
    "ec2:TerminateInstances",
    "tag:GetResources",
    "elasticloadbalancing:AddTags",
    "elasticloadbalancing:CreateLoadBalancer",
    "elasticloadbalancing:ConfigureHealthCheck",
    "elasticloadbalancing:DeleteLoadBalancer",
    "elasticloadbalancing:DescribeLoadBalancers",
    "elasticloadbalancing:DescribeLoadBalancerAttributes",
    "elasticloadbalancing:DescribeTags",
    "elasticloadbalancing:ModifyLoadBalancerAttributes",
    "elasticloadbalancing:RegisterInstancesWithLoadBalancer",
    "elasticloadbalancing:DeregisterInstancesFromLoadBalancer",
    "elasticloadbalancing:RemoveTags",
    "autoscaling:DescribeAutoScalingGroups",
    "autoscaling:DescribeInstanceRefreshes",
    "ec2:CreateLaunchTemplate",
    "ec2:CreateLaunchTemplateVersion",
    "ec2:DescribeLaunchTemplates",
    "ec2:DescribeLaunchTemplateVersions",
    "ec2:DeleteLaunchTemplate",
    "ec2:DeleteLaunchTemplateVersions",
];

const CONTROLLERS_AUTOSCALING_GROUP_ARN: &str =
    "arn:*:autoscaling:*:*:autoScalingGroup:*:autoScalingGroupName/*";

const CONTROLLERS_AUTOSCALING_GROUP_ACTIONS: &[&str] = &[
    "autoscaling:CreateAutoScalingGroup",
    "autoscaling:UpdateAutoScalingGroup",
    "autoscaling:CreateOrUpdateTags",
    "autoscaling:StartInstanceRefresh",
    "autoscaling:DeleteAutoScalingGroup",
    "autoscaling:DeleteTags",
];

/// (service principal, service-linked role name) pairs the controllers may create
const CONTROLLERS_SERVICE_LINKED_ROLES: &[(&str, &str)] = &[
    ("autoscaling.amazonaws.com", "AWSServiceRoleForAutoScaling"),
    (
        "elasticloadbalancing.amazonaws.com",
        "AWSServiceRoleForElasticLoadBalancing",
    ),
    ("spot.amazonaws.com", "AWSServiceRoleForEC2Spot"),
];

const CONTROLLERS_SECRETS_ACTIONS: &[&str] = &[
    "secretsmanager:CreateSecret",
    "secretsmanager:DeleteSecret",
    "secretsmanager:TagResource",
];

const EKS_AMI_PARAMETER_ARN: &str = "arn:*:ssm:*:*:parameter/aws/service/eks/optimized-ami/*";

const EKS_CLUSTER_ARN: &str = "arn:*:eks:*:*:cluster/*";

const EKS_CLUSTER_ACTIONS: &[&str] = &[
    "eks:DescribeCluster",
    "eks:ListClusters",
    "eks:CreateCluster",
    "eks:TagResource",
    "eks:UpdateClusterVersion",
    "eks:ListTagsForResource",
    "eks:UntagResource",
    "eks:UpdateClusterConfig",
    "eks:DeleteCluster",
];

const CLOUD_PROVIDER_CONTROL_PLANE_ACTIONS: &[&str] = &[
    "autoscaling:DescribeAutoScalingGroups",
    "autoscaling:DescribeLaunchConfigurations",
    "autoscaling:DescribeTags",
    "ec2:DescribeInstances",
    "ec2:DescribeImages",
    "ec2:DescribeRegions",
    "ec2:DescribeRouteTables",
    "ec2:DescribeSecurityGroups",
    "ec2:DescribeSubnets",
    "ec2:DescribeVolumes",
    "ec2:CreateSecurityGroup",
    "ec2:CreateTags",
    "ec2:CreateVolume",
    "ec2:ModifyInstanceAttribute",
    "ec2:ModifyVolume",
    "ec2:AttachVolume",
    "ec2:AuthorizeSecurityGroupIngress",
    "ec2:CreateRoute",
    "ec2:DeleteRoute",
    "ec2:DeleteSecurityGroup",
    "ec2:DeleteVolume",
    "ec2:DetachVolume",
    "ec2:RevokeSecurityGroupIngress",
    "ec2:DescribeVpcs",
    "elasticloadbalancing:AddTags",
    "elasticloadbalancing:AttachLoadBalancerToSubnets",
    "elasticloadbalancing:ApplySecurityGroupsToLoadBalancer",
    "elasticloadbalancing:CreateLoadBalancer",
    "elasticloadbalancing:CreateLoadBalancerPolicy",
    "elasticloadbalancing:CreateLoadBalancerListeners",
    "elasticloadbalancing:ConfigureHealthCheck",
    "elasticloadbalancing:DeleteLoadBalancer",
    "elasticloadbalancing:DeleteLoadBalancerListeners",
    "elasticloadbalancing:DescribeLoadBalancers",
    "elasticloadbalancing:DescribeLoadBalancerAttributes",
    "elasticloadbalancing:DetachLoadBalancerFromSubnets",
    "elasticloadbalancing:DeregisterInstancesFromLoadBalancer",
    "elasticloadbalancing:ModifyLoadBalancerAttributes",
    "elasticloadbalancing:RegisterInstancesWithLoadBalancer",
    "elasticloadbalancing:SetLoadBalancerPoliciesForBackendServer",
    "elasticloadbalancing:CreateListener",
    "elasticloadbalancing:CreateTargetGroup",
    "elasticloadbalancing:DeleteListener",
    "elasticloadbalancing:DeleteTargetGroup",
    "elasticloadbalancing:DescribeListeners",
    "elasticloadbalancing:DescribeLoadBalancerPolicies",
    "elasticloadbalancing:DescribeTargetGroups",
    "elasticloadbalancing:DescribeTargetHealth",
    "elasticloadbalancing:ModifyListener",
    "elasticloadbalancing:ModifyTargetGroup",
    "elasticloadbalancing:RegisterTargets",
    "elasticloadbalancing:SetLoadBalancerPoliciesOfListener",
    "iam:CreateServiceLinkedRole",
    "kms:DescribeKey",
];

const CLOUD_PROVIDER_NODES_ACTIONS: &[&str] = &[
    "ec2:DescribeInstances",
    "ec2:DescribeRegions",
    "ecr:GetAuthorizationToken",
    "ecr:BatchCheckLayerAvailability",
    "ecr:GetDownloadUrlForLayer",
    "ecr:GetRepositoryPolicy",
    "ecr:DescribeRepositories",
    "ecr:ListImages",
    "ecr:BatchGetImage",
];

const NODES_SECRETS_ACTIONS: &[&str] = &[
    "secretsmanager:DeleteSecret",
    "secretsmanager:GetSecretValue",
];

const NODES_SESSION_MANAGER_ACTIONS: &[&str] = &[
    "ssm:UpdateInstanceInformation",
    "ssmmessages:CreateControlChannel",
    "ssmmessages:CreateDataChannel",
    "ssmmessages:OpenControlChannel",
    "ssmmessages:OpenDataChannel",
    "s3:GetEncryptionConfiguration",
];

const CSI_CONTROLLER_ACTIONS: &[&str] = &[
    "ec2:AttachVolume",
    "ec2:CreateSnapshot",
    "ec2:CreateTags",
    "ec2:CreateVolume",
    "ec2:DeleteSnapshot",
    "ec2:DeleteTags",
    "ec2:DeleteVolume",
    "ec2:DescribeAvailabilityZones",
    "ec2:DescribeInstances",
    "ec2:DescribeSnapshots",
    "ec2:DescribeTags",
    "ec2:DescribeVolumes",
    "ec2:DescribeVolumesModifications",
    "ec2:DetachVolume",
    "ec2:ModifyVolume",
];

fn service_linked_role_statement(service: &str, role_name: &str) -> StatementEntry {
    StatementEntry::allow(
        ["iam:CreateServiceLinkedRole"],
        [format!(
            "arn:*:iam::*:role/aws-service-role/{}/{}",
            service, role_name
        )],
    )
    .with_condition(STRING_LIKE, "iam:AWSServiceName", service)
}

/// Permissions of the Cluster API controllers.
///
/// `allowed_instance_profiles` are role names the controllers may pass to
/// EC2 instances. The EKS statements are only granted while the managed
/// control plane is enabled. `extra` statements are appended last.
pub fn controllers_policy(
    allowed_instance_profiles: &[String],
    managed_control_plane: bool,
    extra: &[StatementEntry],
) -> PolicyDocument {
    let mut statement = vec![
        StatementEntry::allow(CONTROLLERS_ACTIONS.iter().copied(), [ANY]),
        StatementEntry::allow(
            CONTROLLERS_AUTOSCALING_GROUP_ACTIONS.iter().copied(),
            [CONTROLLERS_AUTOSCALING_GROUP_ARN],
        ),
    ];
    statement.extend(
        CONTROLLERS_SERVICE_LINKED_ROLES
            .iter()
            .map(|(service, role)| service_linked_role_statement(service, role)),
    );
    statement.push(StatementEntry::allow(
        ["iam:PassRole"],
        allowed_instance_profiles
            .iter()
            .map(|profile| format!("arn:*:iam::*:role/{}", profile)),
    ));
    statement.push(StatementEntry::allow(
        CONTROLLERS_SECRETS_ACTIONS.iter().copied(),
        [CLUSTER_SECRETS_ARN],
    ));

    if managed_control_plane {
        statement.extend(eks_controllers_statements());
    }

    statement.extend_from_slice(extra);
    PolicyDocument::new(statement)
}

fn eks_controllers_statements() -> Vec<StatementEntry> {
    vec![
        StatementEntry::allow(["ssm:GetParameter"], [EKS_AMI_PARAMETER_ARN]),
        service_linked_role_statement("eks.amazonaws.com", "AWSServiceRoleForAmazonEKS"),
        StatementEntry::allow(
            ["iam:GetRole", "iam:ListAttachedRolePolicies"],
            ["arn:*:iam::*:role/*"],
        ),
        StatementEntry::allow(["iam:GetPolicy"], [EKS_CLUSTER_POLICY_ARN]),
        StatementEntry::allow(EKS_CLUSTER_ACTIONS.iter().copied(), [EKS_CLUSTER_ARN]),
        StatementEntry::allow(["iam:PassRole"], [ANY]).with_condition(
            STRING_EQUALS,
            "iam:PassedToService",
            "eks.amazonaws.com",
        ),
    ]
}

/// Permissions of the Kubernetes AWS cloud provider on control plane machines
pub fn cloud_provider_control_plane_policy() -> PolicyDocument {
    PolicyDocument::new(vec![StatementEntry::allow(
        CLOUD_PROVIDER_CONTROL_PLANE_ACTIONS.iter().copied(),
        [ANY],
    )])
}

/// Permissions of the Kubernetes AWS cloud provider on every machine
pub fn cloud_provider_nodes_policy() -> PolicyDocument {
    PolicyDocument::new(vec![
        StatementEntry::allow(CLOUD_PROVIDER_NODES_ACTIONS.iter().copied(), [ANY]),
        StatementEntry::allow(NODES_SECRETS_ACTIONS.iter().copied(), [CLUSTER_SECRETS_ARN]),
        StatementEntry::allow(NODES_SESSION_MANAGER_ACTIONS.iter().copied(), [ANY]),
    ])
}

/// Permissions of the AWS EBS CSI driver controller
pub fn csi_controller_policy() -> PolicyDocument {
    PolicyDocument::new(vec![StatementEntry::allow(
        CSI_CONTROLLER_ACTIONS.iter().copied(),
        [ANY],
    )])
}
