// ABOUTME: Validated names for control-plane resources.
// ABOUTME: Clusters, services, task families and containers share one naming rule.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceNameError {
    #[error("resource name cannot be empty")]
    Empty,

    #[error("resource name exceeds maximum length of 255 characters")]
    TooLong,

    #[error("invalid character in resource name '{name}': '{found}' (letters, digits, '-' and '_' are allowed)")]
    InvalidChar { name: String, found: char },
}

/// Name of a cluster, service, task family or container.
///
/// Up to 255 ASCII letters, digits, hyphens and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(value: &str) -> Result<Self, ResourceNameError> {
        if value.is_empty() {
            return Err(ResourceNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(ResourceNameError::TooLong);
        }

        if let Some(found) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(ResourceNameError::InvalidChar {
                name: value.to_string(),
                found,
            });
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResourceName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ResourceName::new(&s).map_err(serde::de::Error::custom)
    }
}
