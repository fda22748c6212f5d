//! Startup configuration read from the environment.

use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, bail, Context, Result};
use ingest::{ProjectId, SecretName};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SECRET_NAME: &str = "event-handler";
const DEFAULT_DATASET: &str = "four_keys";
const DEFAULT_TABLE: &str = "events_raw";

/// Where source credentials are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretBackend {
    /// Google Secret Manager.
    SecretManager,
    /// A single value taken from `EVENT_HANDLER_SECRET`.
    Env,
}

/// Where verified records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkBackend {
    /// BigQuery streaming inserts.
    BigQuery,
    /// Structured log lines only.
    Log,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log collectors.
    Json,
    /// Multi-line human-readable output for local runs.
    Pretty,
}

/// Everything the relay needs to start.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Cloud project (`PROJECT_NAME`). Required by the Secret Manager and
    /// BigQuery backends.
    pub project: Option<ProjectId>,
    /// Bind address built from `HOST` and `PORT`.
    pub listen_addr: SocketAddr,
    /// Secret holding every source's key or token (`SECRET_NAME`).
    pub secret_name: SecretName,
    /// `SECRET_BACKEND`.
    pub secret_backend: SecretBackend,
    /// Secret value for [`SecretBackend::Env`] (`EVENT_HANDLER_SECRET`).
    pub event_handler_secret: Option<String>,
    /// `SINK_BACKEND`.
    pub sink_backend: SinkBackend,
    /// BigQuery dataset (`BIGQUERY_DATASET`).
    pub dataset: String,
    /// BigQuery table (`BIGQUERY_TABLE`).
    pub table: String,
    /// Fixed OAuth token (`GOOGLE_OAUTH_ACCESS_TOKEN`); the metadata server
    /// is used when unset.
    pub access_token: Option<String>,
    /// `LOG_FORMAT`.
    pub log_format: LogFormat,
    /// OTLP collector endpoint (`OTEL_EXPORTER_OTLP_ENDPOINT`); span export
    /// is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("project", &self.project)
            .field("listen_addr", &self.listen_addr)
            .field("secret_name", &self.secret_name)
            .field("secret_backend", &self.secret_backend)
            .field(
                "event_handler_secret",
                &self.event_handler_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .field("sink_backend", &self.sink_backend)
            .field("dataset", &self.dataset)
            .field("table", &self.table)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("log_format", &self.log_format)
            .field("otlp_endpoint", &self.otlp_endpoint)
            .finish()
    }
}

impl Config {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host: IpAddr = var("HOST")
            .as_deref()
            .unwrap_or(DEFAULT_HOST)
            .parse()
            .context("HOST must be an IP address")?;
        let port = match var("PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got '{port}'"))?,
            None => DEFAULT_PORT,
        };

        let secret_name = SecretName::new(
            var("SECRET_NAME").unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
        )
        .ok_or_else(|| anyhow!("SECRET_NAME must not be empty"))?;

        let secret_backend = match var("SECRET_BACKEND").as_deref() {
            None | Some("secret-manager") => SecretBackend::SecretManager,
            Some("env") => SecretBackend::Env,
            Some(other) => bail!("SECRET_BACKEND must be 'secret-manager' or 'env', got '{other}'"),
        };
        let event_handler_secret = var("EVENT_HANDLER_SECRET");
        if secret_backend == SecretBackend::Env && event_handler_secret.is_none() {
            bail!("EVENT_HANDLER_SECRET is required when SECRET_BACKEND=env");
        }

        let sink_backend = match var("SINK_BACKEND").as_deref() {
            None | Some("bigquery") => SinkBackend::BigQuery,
            Some("log") => SinkBackend::Log,
            Some(other) => bail!("SINK_BACKEND must be 'bigquery' or 'log', got '{other}'"),
        };

        let project = var("PROJECT_NAME").and_then(ProjectId::new);
        let needs_project = secret_backend == SecretBackend::SecretManager
            || sink_backend == SinkBackend::BigQuery;
        if needs_project && project.is_none() {
            bail!("PROJECT_NAME is required for the Secret Manager and BigQuery backends");
        }

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => bail!("LOG_FORMAT must be 'json' or 'pretty', got '{other}'"),
        };

        Ok(Self {
            project,
            listen_addr: SocketAddr::new(host, port),
            secret_name,
            secret_backend,
            event_handler_secret,
            sink_backend,
            dataset: var("BIGQUERY_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            table: var("BIGQUERY_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            access_token: var("GOOGLE_OAUTH_ACCESS_TOKEN"),
            log_format,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}
