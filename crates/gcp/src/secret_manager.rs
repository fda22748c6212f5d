//! [`SecretStore`] over the Secret Manager REST API.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ingest::{ProjectId, Secret, SecretName, SecretStore, SecretStoreError, SecretVersion};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{GcpError, TokenSource};

const SERVICE: &str = "Secret Manager";

/// Default Secret Manager API origin.
pub const DEFAULT_SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

#[derive(Debug, Deserialize)]
struct AccessResponse {
    payload: Payload,
}

#[derive(Debug, Deserialize)]
struct Payload {
    data: String,
}

/// Reads secret versions of one project.
#[derive(Clone)]
pub struct SecretManagerStore {
    client: reqwest::Client,
    base_url: String,
    project: ProjectId,
    tokens: Arc<dyn TokenSource>,
}

impl SecretManagerStore {
    /// Creates a store scoped to `project`.
    pub fn new(client: reqwest::Client, project: ProjectId, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            base_url: DEFAULT_SECRET_MANAGER_URL.to_string(),
            project,
            tokens,
        }
    }

    /// Overrides the API origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn version_url(&self, name: &SecretName, version: SecretVersion) -> String {
        format!(
            "{}/v1/projects/{}/secrets/{}/versions/{}:access",
            self.base_url, self.project, name, version
        )
    }
}

impl std::fmt::Debug for SecretManagerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManagerStore")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for SecretManagerStore {
    #[instrument(skip(self), fields(project = %self.project))]
    async fn fetch_secret(
        &self,
        name: &SecretName,
        version: SecretVersion,
    ) -> Result<Secret, SecretStoreError> {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .get(self.version_url(name, version))
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(GcpError::transport(SERVICE))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SecretStoreError::NotFound {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(GcpError::from_status(SERVICE, response).await.into());
        }

        let body: AccessResponse = response.json().await.map_err(|e| GcpError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;
        let bytes = STANDARD
            .decode(body.payload.data)
            .map_err(|e| GcpError::Decode {
                service: SERVICE,
                message: format!("payload data is not base64: {e}"),
            })?;

        debug!("Secret version fetched");
        Ok(Secret::new(bytes))
    }
}
