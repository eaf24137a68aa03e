// ABOUTME: Container registry boundary used before pushing: login credentials and repositories.
// ABOUTME: Ensures the image repository exists, creating it when the registry reports it absent.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use snafu::ResultExt;
use std::fmt;

use crate::deploy::Ensured;
use crate::provider::{NotFoundExt, ProviderError};

use super::error::{PublishError, RegistrySnafu};

/// Credentials for `docker login` against one registry endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryLogin {
    pub username: String,
    pub password: String,
    pub endpoint: String,
}

impl fmt::Debug for RegistryLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryLogin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl RegistryLogin {
    /// Decode an authorization token of the form `base64("user:password")`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Request` if the token is not base64 or has no
    /// `:` separator.
    pub fn from_token(token: &str, endpoint: &str) -> Result<Self, ProviderError> {
        let decoded = STANDARD
            .decode(token.trim())
            .map_err(|e| ProviderError::request(format!("authorization token is not base64: {e}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| ProviderError::request("authorization token is not UTF-8"))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| ProviderError::request("authorization token has no user:password pair"))?;

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

/// Registry operations the publisher needs before tagging and pushing.
#[async_trait]
pub trait ContainerRegistry: Send + Sync {
    async fn login(&self) -> Result<RegistryLogin, ProviderError>;

    /// URI of the named repository, `None` if it does not exist.
    async fn describe_repository(&self, name: &str) -> Result<Option<String>, ProviderError>;

    /// Create the repository and return its URI.
    async fn create_repository(&self, name: &str) -> Result<String, ProviderError>;
}

/// Look the repository up by name and create it if absent.
///
/// # Errors
///
/// Returns `PublishError::Registry` naming the failed registry call.
pub async fn ensure_repository<R>(registry: &R, name: &str) -> Result<Ensured<String>, PublishError>
where
    R: ContainerRegistry + ?Sized,
{
    let existing = registry
        .describe_repository(name)
        .await
        .or_absent()
        .context(RegistrySnafu {
            operation: "DescribeRepositories",
        })?;

    if let Some(uri) = existing {
        tracing::debug!(repository = %name, %uri, "repository exists");
        return Ok(Ensured::Existing(uri));
    }

    tracing::info!(repository = %name, "creating repository");
    let uri = registry
        .create_repository(name)
        .await
        .context(RegistrySnafu {
            operation: "CreateRepository",
        })?;
    Ok(Ensured::Created(uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_decodes_into_user_and_password() {
        let token = STANDARD.encode("AWS:s3cr:et");
        let login = RegistryLogin::from_token(&token, "https://1.dkr.ecr.eu-west-1.amazonaws.com")
            .unwrap();
        assert_eq!(login.username, "AWS");
        assert_eq!(login.password, "s3cr:et");
        assert!(!format!("{login:?}").contains("s3cr"));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(RegistryLogin::from_token("%%%", "e").is_err());
        let no_separator = STANDARD.encode("AWS");
        assert!(RegistryLogin::from_token(&no_separator, "e").is_err());
    }
}
