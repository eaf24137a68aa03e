// ABOUTME: Published container image reference (registry/repository:tag).
// ABOUTME: Validates user-supplied --image values and builds ECR repository URIs.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageUriError {
    #[error("image URI cannot be empty")]
    Empty,

    #[error("invalid character in image URI: '{0}'")]
    InvalidChar(char),

    #[error("image URI has no repository: {0}")]
    MissingRepository(String),
}

/// A fully qualified image reference as handed to the task definition.
///
/// Images without an explicit tag or digest are pinned to `latest`, which is
/// what the registry would resolve them to anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUri {
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageUri {
    pub fn parse(input: &str) -> Result<Self, ParseImageUriError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageUriError::Empty);
        }

        if let Some(c) = input.chars().find(|c| {
            !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
        }) {
            return Err(ParseImageUriError::InvalidChar(c));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => (before, Some(after.to_string())),
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag.
        let (repository, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, Some(after.to_string())),
            _ => (without_digest, None),
        };

        if repository.is_empty() || repository.ends_with('/') {
            return Err(ParseImageUriError::MissingRepository(input.to_string()));
        }

        let tag = match (tag, &digest) {
            (None, None) => Some("latest".to_string()),
            (tag, _) => tag,
        };

        Ok(Self {
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// URI of an ECR repository: `<account>.dkr.ecr.<region>.amazonaws.com/<name>`.
    pub fn ecr_repository(account_id: &str, region: &str, name: &str) -> String {
        format!("{account_id}.dkr.ecr.{region}.amazonaws.com/{name}")
    }

    /// `registry/name` part, without tag or digest.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Same repository, different tag. Any digest is dropped.
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            repository: self.repository.clone(),
            tag: Some(tag.to_string()),
            digest: None,
        }
    }
}

impl fmt::Display for ImageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ImageUri {
    type Err = ParseImageUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageUri::parse(s)
    }
}
