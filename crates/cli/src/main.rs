//! Event relay entry point.
//!
//! This binary is the composition root for the entire system:
//!
//! 1. **Load configuration** from environment variables ([`config::Config`]).
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty
//!    layer, plus an OpenTelemetry OTLP exporter when an endpoint is set.
//! 3. **Construct infrastructure**: the secret store, analytics sink and
//!    token source chosen by configuration, injected into an
//!    [`ingest::EventDispatcher`].
//! 4. **Serve** the listener router until Ctrl-C or SIGTERM.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use gcp::{
    BigQuerySink, MetadataServerTokenSource, SecretManagerStore, StaticTokenSource, TableRef,
    TokenSource,
};
use ingest::{
    AnalyticsSink, EventDispatcher, LogSink, SecretStore, SecretVersion, SourceRegistry,
    SourceResolver, StaticSecretStore,
};
use tracing::info;

use crate::config::{Config, SecretBackend, SinkBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    let _telemetry = telemetry::init(config.log_format, config.otlp_endpoint.as_deref())?;

    info!(
        listen_addr = %config.listen_addr,
        secret_backend = ?config.secret_backend,
        sink_backend = ?config.sink_backend,
        "Starting event relay"
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("event-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let tokens = token_source(&config, &client);

    let registry = SourceRegistry::builtin();
    info!(sources = registry.len(), "Source registry loaded");

    let dispatcher = EventDispatcher::new(
        registry,
        SourceResolver::standard(),
        secret_store(&config, &client, &tokens)?,
        analytics_sink(&config, &client, &tokens)?,
        config.secret_name.clone(),
    );

    let router = listener::create_router(Arc::new(dispatcher));
    listener::serve(router, config.listen_addr, shutdown_signal())
        .await
        .context("server failed")?;

    info!("Event relay shutdown complete");
    Ok(())
}

fn token_source(config: &Config, client: &reqwest::Client) -> Arc<dyn TokenSource> {
    match &config.access_token {
        Some(token) => Arc::new(StaticTokenSource::new(token.clone())),
        None => Arc::new(MetadataServerTokenSource::new(client.clone())),
    }
}

fn secret_store(
    config: &Config,
    client: &reqwest::Client,
    tokens: &Arc<dyn TokenSource>,
) -> Result<Arc<dyn SecretStore>> {
    match config.secret_backend {
        SecretBackend::SecretManager => {
            let project = config
                .project
                .clone()
                .context("PROJECT_NAME is required for Secret Manager")?;
            Ok(Arc::new(SecretManagerStore::new(
                client.clone(),
                project,
                Arc::clone(tokens),
            )))
        }
        SecretBackend::Env => {
            let value = config
                .event_handler_secret
                .as_deref()
                .context("EVENT_HANDLER_SECRET is required when SECRET_BACKEND=env")?;
            let name = &config.secret_name;
            Ok(Arc::new(
                StaticSecretStore::new()
                    .with_secret(name, SecretVersion::Latest, value)
                    .with_secret(name, SecretVersion::Pinned(1), value),
            ))
        }
    }
}

fn analytics_sink(
    config: &Config,
    client: &reqwest::Client,
    tokens: &Arc<dyn TokenSource>,
) -> Result<Arc<dyn AnalyticsSink>> {
    match config.sink_backend {
        SinkBackend::BigQuery => {
            let project = config
                .project
                .clone()
                .context("PROJECT_NAME is required for BigQuery")?;
            let table = TableRef {
                project,
                dataset: config.dataset.clone(),
                table: config.table.clone(),
            };
            info!(%table, "Delivering records to BigQuery");
            Ok(Arc::new(BigQuerySink::new(
                client.clone(),
                table,
                Arc::clone(tokens),
            )))
        }
        SinkBackend::Log => Ok(Arc::new(LogSink)),
    }
}

/// Waits for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
