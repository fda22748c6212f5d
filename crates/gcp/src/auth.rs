//! OAuth access tokens for Google Cloud API calls.

use async_trait::async_trait;
use serde::Deserialize;

use crate::GcpError;

const METADATA_SERVICE: &str = "metadata server";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Default metadata server origin on Cloud Run and GCE.
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";

/// A bearer token. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"<REDACTED>").finish()
    }
}

/// Supplies access tokens to the API adapters.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a token valid for the next API call.
    ///
    /// # Errors
    ///
    /// Returns [`GcpError`] when no token can be obtained.
    async fn access_token(&self) -> Result<AccessToken, GcpError>;
}

// ---------------------------------------------------------------------------

/// Fetches the default service account's token from the metadata server.
///
/// A token is requested for every call; the metadata server caches tokens
/// itself.
#[derive(Debug, Clone)]
pub struct MetadataServerTokenSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl MetadataServerTokenSource {
    /// Creates a token source against [`DEFAULT_METADATA_URL`].
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_METADATA_URL.to_string(),
        }
    }

    /// Overrides the metadata server origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TokenSource for MetadataServerTokenSource {
    async fn access_token(&self) -> Result<AccessToken, GcpError> {
        let response = self
            .client
            .get(format!("{}{TOKEN_PATH}", self.base_url))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(GcpError::transport(METADATA_SERVICE))?;

        if !response.status().is_success() {
            return Err(GcpError::from_status(METADATA_SERVICE, response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GcpError::Decode {
                service: METADATA_SERVICE,
                message: e.to_string(),
            })?;
        Ok(AccessToken::new(token.access_token))
    }
}

// ---------------------------------------------------------------------------

/// Serves one fixed token; for local runs with a token minted by `gcloud`.
#[derive(Debug, Clone)]
pub struct StaticTokenSource(AccessToken);

impl StaticTokenSource {
    /// Creates a source always returning `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self(AccessToken::new(token))
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<AccessToken, GcpError> {
        Ok(self.0.clone())
    }
}
