//! IAM resources and the keyed resource map
//!
//! Resource properties serialize with CloudFormation property names, and
//! every cross-resource reference is a [`LogicalRef`] rendered as
//! `{"Ref": "<logical name>"}`.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::Tags;
use crate::policy::{InlinePolicy, PolicyDocument};

/// Reference to another resource of the same map by logical name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalRef(String);

impl LogicalRef {
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self(logical_name.into())
    }

    pub fn logical_name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for LogicalRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("Ref", &self.0)?;
        map.end()
    }
}

/// A literal name or a reference to a resource of the same map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Target {
    Name(String),
    Ref(LogicalRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Convert a tag mapping into CloudFormation tags, sorted by key
pub fn tags_from(tags: &Tags) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub user_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Target>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<InlinePolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub role_name: String,
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<InlinePolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedPolicy {
    pub managed_policy_name: String,
    pub description: String,
    pub policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<LogicalRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<LogicalRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceProfile {
    pub instance_profile_name: String,
    /// Instance profiles hold exactly one role; CloudFormation still wants a list.
    #[serde(rename = "Roles", serialize_with = "serialize_single")]
    pub role: LogicalRef,
}

fn serialize_single<S: Serializer>(role: &LogicalRef, serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(1))?;
    seq.serialize_element(role)?;
    seq.end()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    User,
    Group,
    Role,
    ManagedPolicy,
    InstanceProfile,
}

/// A single resource of the template, serialized as `{"Type", "Properties"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "Type", content = "Properties")]
pub enum Resource {
    #[serde(rename = "AWS::IAM::User")]
    User(User),
    #[serde(rename = "AWS::IAM::Group")]
    Group(Group),
    #[serde(rename = "AWS::IAM::Role")]
    Role(Role),
    #[serde(rename = "AWS::IAM::ManagedPolicy")]
    ManagedPolicy(ManagedPolicy),
    #[serde(rename = "AWS::IAM::InstanceProfile")]
    InstanceProfile(InstanceProfile),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::User(_) => ResourceKind::User,
            Self::Group(_) => ResourceKind::Group,
            Self::Role(_) => ResourceKind::Role,
            Self::ManagedPolicy(_) => ResourceKind::ManagedPolicy,
            Self::InstanceProfile(_) => ResourceKind::InstanceProfile,
        }
    }

    /// Provider-facing name of the resource
    pub fn name(&self) -> &str {
        match self {
            Self::User(user) => &user.user_name,
            Self::Group(group) => &group.group_name,
            Self::Role(role) => &role.role_name,
            Self::ManagedPolicy(policy) => &policy.managed_policy_name,
            Self::InstanceProfile(profile) => &profile.instance_profile_name,
        }
    }

    /// Every logical reference held by the resource
    pub fn references(&self) -> Vec<&LogicalRef> {
        match self {
            Self::User(user) => user
                .groups
                .iter()
                .filter_map(|group| match group {
                    Target::Ref(r) => Some(r),
                    Target::Name(_) => None,
                })
                .collect(),
            Self::ManagedPolicy(policy) => policy.groups.iter().chain(&policy.roles).collect(),
            Self::InstanceProfile(profile) => vec![&profile.role],
            Self::Group(_) | Self::Role(_) => Vec::new(),
        }
    }

    pub fn as_role(&self) -> Option<&Role> {
        match self {
            Self::Role(role) => Some(role),
            _ => None,
        }
    }

    pub fn as_managed_policy(&self) -> Option<&ManagedPolicy> {
        match self {
            Self::ManagedPolicy(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn as_instance_profile(&self) -> Option<&InstanceProfile> {
        match self {
            Self::InstanceProfile(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }
}

/// Resources keyed by logical name. Iteration order is the key order, so the
/// same input always renders the same document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResourceMap {
    resources: BTreeMap<String, Resource>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource under `logical_name`.
    ///
    /// Logical names are unique; inserting the same name twice is a bug in the
    /// caller.
    pub fn insert(&mut self, logical_name: &str, resource: Resource) {
        log::debug!(
            "Adding {:?} {} ({})",
            resource.kind(),
            logical_name,
            resource.name()
        );
        let previous = self.resources.insert(logical_name.to_string(), resource);
        debug_assert!(
            previous.is_none(),
            "logical name {} inserted twice",
            logical_name
        );
    }

    pub fn get(&self, logical_name: &str) -> Option<&Resource> {
        self.resources.get(logical_name)
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.resources.contains_key(logical_name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn logical_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.resources.values().filter(|r| r.kind() == kind).count()
    }

    /// `(owner, reference)` pairs whose reference names no resource in the map
    pub fn dangling_references(&self) -> Vec<(&str, &LogicalRef)> {
        self.iter()
            .flat_map(move |(name, resource)| {
                resource
                    .references()
                    .into_iter()
                    .filter(move |r| !self.contains(r.logical_name()))
                    .map(move |r| (name, r))
            })
            .collect()
    }

    /// Logical names of the managed policies attached to `role`
    pub fn attached_policies(&self, role: &str) -> Vec<&str> {
        self.iter()
            .filter_map(|(name, resource)| {
                resource
                    .as_managed_policy()
                    .filter(|policy| policy.roles.iter().any(|r| r.logical_name() == role))
                    .map(|_| name)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::builder::ec2_assume_role_policy;

    fn role(name: &str) -> Resource {
        Resource::Role(Role {
            role_name: name.to_string(),
            assume_role_policy_document: ec2_assume_role_policy(),
            managed_policy_arns: Vec::new(),
            policies: Vec::new(),
            tags: Vec::new(),
        })
    }

    fn profile(role: &str) -> Resource {
        Resource::InstanceProfile(InstanceProfile {
            instance_profile_name: format!("{}-profile", role),
            role: LogicalRef::new(role),
        })
    }

    #[test]
    fn test_logical_ref_serializes_as_cloudformation_ref() {
        let json = serde_json::to_value(LogicalRef::new("AWSIAMRoleNodes")).unwrap();
        assert_eq!(json, serde_json::json!({"Ref": "AWSIAMRoleNodes"}));
    }

    #[test]
    fn test_instance_profile_serializes_roles_list() {
        let json = serde_json::to_value(profile("RoleA")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Type": "AWS::IAM::InstanceProfile",
                "Properties": {
                    "InstanceProfileName": "RoleA-profile",
                    "Roles": [{"Ref": "RoleA"}],
                },
            })
        );
    }

    #[test]
    fn test_user_groups_mix_names_and_refs() {
        let user = Resource::User(User {
            user_name: "bootstrapper".into(),
            groups: vec![
                Target::Name("admins".into()),
                Target::Ref(LogicalRef::new("GroupA")),
            ],
            managed_policy_arns: Vec::new(),
            policies: Vec::new(),
            tags: Vec::new(),
        });
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json["Properties"]["Groups"],
            serde_json::json!(["admins", {"Ref": "GroupA"}])
        );
        assert_eq!(user.references(), vec![&LogicalRef::new("GroupA")]);
    }

    #[test]
    fn test_tags_sorted_by_key() {
        let tags: Tags = [("b", "2"), ("a", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let converted = tags_from(&tags);
        assert_eq!(converted[0].key, "a");
        assert_eq!(converted[1].value, "2");
    }

    #[test]
    fn test_dangling_references() {
        let mut map = ResourceMap::new();
        map.insert("ProfileA", profile("RoleA"));
        assert_eq!(
            map.dangling_references(),
            vec![("ProfileA", &LogicalRef::new("RoleA"))]
        );

        // References resolve once the role is added, whatever the order.
        map.insert("RoleA", role("role-a"));
        assert!(map.dangling_references().is_empty());
        assert_eq!(map.count_of(ResourceKind::Role), 1);
        assert_eq!(map.count_of(ResourceKind::InstanceProfile), 1);
    }

    #[test]
    fn test_attached_policies_reverse_lookup() {
        let mut map = ResourceMap::new();
        map.insert("RoleA", role("role-a"));
        map.insert("RoleB", role("role-b"));
        map.insert(
            "PolicyAB",
            Resource::ManagedPolicy(ManagedPolicy {
                managed_policy_name: "ab".into(),
                description: String::new(),
                policy_document: PolicyDocument::new(Vec::new()),
                groups: Vec::new(),
                roles: vec![LogicalRef::new("RoleA"), LogicalRef::new("RoleB")],
            }),
        );
        map.insert(
            "PolicyB",
            Resource::ManagedPolicy(ManagedPolicy {
                managed_policy_name: "b".into(),
                description: String::new(),
                policy_document: PolicyDocument::new(Vec::new()),
                groups: Vec::new(),
                roles: vec![LogicalRef::new("RoleB")],
            }),
        );
        assert_eq!(map.attached_policies("RoleA"), vec!["PolicyAB"]);
        assert_eq!(map.attached_policies("RoleB"), vec!["PolicyAB", "PolicyB"]);
        assert!(map.attached_policies("RoleC").is_empty());
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let mut map = ResourceMap::new();
        map.insert("Zeta", role("z"));
        map.insert("Alpha", role("a"));
        assert_eq!(map.logical_names().collect::<Vec<_>>(), vec!["Alpha", "Zeta"]);
    }
}
