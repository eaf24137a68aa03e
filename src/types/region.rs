// ABOUTME: Cloud region identifier validation.
// ABOUTME: Accepts identifiers like us-east-1 or eu-central-2.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("region cannot be empty")]
    Empty,

    #[error("invalid region '{0}': expected lowercase letters, digits and hyphens")]
    Invalid(String),
}

/// A region identifier. Every per-region client and resource is scoped to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(value: &str) -> Result<Self, RegionError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RegionError::Empty);
        }

        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_chars || value.starts_with('-') || value.ends_with('-') {
            return Err(RegionError::Invalid(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Region {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::new(s)
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Region::new(&s).map_err(serde::de::Error::custom)
    }
}
