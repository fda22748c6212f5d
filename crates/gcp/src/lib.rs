//! Google Cloud infrastructure adapters for the event relay.
//!
//! Implements the port traits defined in the [`ingest`] crate:
//!
//! - [`SecretManagerStore`]: [`ingest::SecretStore`] over the Secret Manager
//!   REST API (`versions/{version}:access`).
//! - [`BigQuerySink`]: [`ingest::AnalyticsSink`] over the BigQuery streaming
//!   insert API (`tables/{table}/insertAll`).
//!
//! Both authenticate with an OAuth access token obtained from a
//! [`TokenSource`]: the Cloud Run / GCE metadata server in production, or a
//! fixed token for local runs.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. HTTP
//! transport, URL layout and response decoding live here; the [`ingest`]
//! crate only sees its port traits. The project id is injected at
//! construction and never read from the environment.

pub mod auth;
pub mod bigquery;
pub mod error;
pub mod secret_manager;

pub use auth::{AccessToken, MetadataServerTokenSource, StaticTokenSource, TokenSource};
pub use bigquery::{BigQuerySink, TableRef};
pub use error::GcpError;
pub use secret_manager::SecretManagerStore;
