//! CloudFormation rendering of a resource map

use serde::Serialize;

use crate::error::BootstrapResult;
use crate::template::resource::ResourceMap;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A CloudFormation template holding only IAM resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudFormationTemplate {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: &'static str,
    #[serde(rename = "Resources")]
    pub resources: ResourceMap,
}

impl CloudFormationTemplate {
    pub fn from_resources(resources: ResourceMap) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION,
            resources,
        }
    }

    pub fn to_json(&self) -> BootstrapResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> BootstrapResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
