//! Error types for template construction and rendering

use thiserror::Error;

/// A precondition violated by a [`ConfigurationSpec`](crate::ConfigurationSpec).
///
/// These indicate a caller bug, never a runtime condition, so nothing in this
/// crate retries or defaults around them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be set")]
    MissingField { field: &'static str },
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("{group}: extra policy attachment #{index} is empty")]
    EmptyPolicyAttachment { group: &'static str, index: usize },
    #[error("{group}: statement #{index} has no actions")]
    StatementWithoutActions { group: &'static str, index: usize },
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("Failed to serialize template: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unknown managed policy name: {0}")]
    UnknownPolicy(String),
}

impl BootstrapError {
    pub fn unknown_policy(name: impl Into<String>) -> Self {
        Self::UnknownPolicy(name.into())
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
