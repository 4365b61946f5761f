//! IAM policy document model (serialized with AWS casing)

pub mod builder;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The only policy language version emitted.
pub const CURRENT_VERSION: &str = "2012-10-17";

/// Wildcard resource / principal.
pub const ANY: &str = "*";

/// Condition operator -> condition key -> value(s).
pub type Conditions = BTreeMap<String, BTreeMap<String, ConditionValue>>;

/// A condition value; IAM accepts a single value or a list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ConditionValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Effect {
    Allow,
    Deny,
}

/// Principals of a statement, grouped by principal type. Other principal
/// types are rejected rather than dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Principals {
    #[serde(rename = "AWS", default, skip_serializing_if = "Vec::is_empty")]
    pub aws: Vec<String>,
    #[serde(rename = "Federated", default, skip_serializing_if = "Vec::is_empty")]
    pub federated: Vec<String>,
    #[serde(rename = "Service", default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<String>,
}

impl Principals {
    pub fn service(id: impl Into<String>) -> Self {
        Self {
            service: vec![id.into()],
            ..Self::default()
        }
    }
}

/// A single IAM policy statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct StatementEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<Principals>,
    pub effect: Effect,
    pub action: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub condition: Conditions,
}

impl StatementEntry {
    /// Allow `actions` on `resources`
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            sid: None,
            principal: None,
            not_principal: None,
            effect: Effect::Allow,
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().map(Into::into).collect(),
            condition: Conditions::new(),
        }
    }

    pub fn with_principal(mut self, principal: Principals) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Add a single `operator: { key: value }` condition
    pub fn with_condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<ConditionValue>,
    ) -> Self {
        self.condition
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }
}

/// A versioned list of statements. Statement order is preserved as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<StatementEntry>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<StatementEntry>) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            statement,
        }
    }

    /// All actions granted by the document, in statement order
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.statement
            .iter()
            .flat_map(|s| s.action.iter().map(String::as_str))
    }
}

/// A policy embedded in a user or role rather than managed on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}
