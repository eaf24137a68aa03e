// ABOUTME: Amazon ECR implementation of the container registry boundary.
// ABOUTME: Authorization tokens for docker login, repository lookup and creation.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecr as ecr;

use crate::provider::{ProviderError, request_error};

use super::registry::{ContainerRegistry, RegistryLogin};

/// ECR registry of one account in one region.
#[derive(Debug, Clone)]
pub struct EcrRegistry {
    client: ecr::Client,
    registry_id: String,
}

impl EcrRegistry {
    pub fn new(config: &SdkConfig, registry_id: impl Into<String>) -> Self {
        Self {
            client: ecr::Client::new(config),
            registry_id: registry_id.into(),
        }
    }
}

#[async_trait]
impl ContainerRegistry for EcrRegistry {
    async fn login(&self) -> Result<RegistryLogin, ProviderError> {
        let output = self
            .client
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| request_error("GetAuthorizationToken", e))?;

        let data = output.authorization_data().first().ok_or_else(|| {
            ProviderError::request("GetAuthorizationToken returned no authorization data")
        })?;
        let token = data.authorization_token().ok_or_else(|| {
            ProviderError::request("GetAuthorizationToken response did not include a token")
        })?;
        let endpoint = data.proxy_endpoint().ok_or_else(|| {
            ProviderError::request("GetAuthorizationToken response did not include an endpoint")
        })?;

        RegistryLogin::from_token(token, endpoint)
    }

    async fn describe_repository(&self, name: &str) -> Result<Option<String>, ProviderError> {
        let result = self
            .client
            .describe_repositories()
            .registry_id(&self.registry_id)
            .repository_names(name)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_repository_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(request_error("DescribeRepositories", e)),
        };

        Ok(output
            .repositories()
            .first()
            .and_then(|repository| repository.repository_uri())
            .map(str::to_string))
    }

    async fn create_repository(&self, name: &str) -> Result<String, ProviderError> {
        let output = self
            .client
            .create_repository()
            .registry_id(&self.registry_id)
            .repository_name(name)
            .send()
            .await
            .map_err(|e| request_error("CreateRepository", e))?;

        output
            .repository()
            .and_then(|repository| repository.repository_uri())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::request("CreateRepository response did not include a URI"))
    }
}
