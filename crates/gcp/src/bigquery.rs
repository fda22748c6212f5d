//! [`AnalyticsSink`] over the BigQuery streaming insert API.

use std::sync::Arc;

use async_trait::async_trait;
use ingest::{AnalyticsSink, NormalizedRecord, ProjectId, SinkError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{GcpError, TokenSource};

const SERVICE: &str = "BigQuery";

/// Default BigQuery API origin.
pub const DEFAULT_BIGQUERY_URL: &str = "https://bigquery.googleapis.com";

/// Fully-qualified destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Project owning the dataset.
    pub project: ProjectId,
    /// Dataset name.
    pub dataset: String,
    /// Table name.
    pub table: String,
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

#[derive(Debug, Serialize)]
struct InsertAllRequest<'a> {
    rows: [InsertRow<'a>; 1],
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    /// Best-effort dedup key; BigQuery drops repeats seen within about a minute.
    #[serde(rename = "insertId")]
    insert_id: &'a str,
    json: &'a NormalizedRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
struct InsertError {
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Streams one row per record into a BigQuery table.
#[derive(Clone)]
pub struct BigQuerySink {
    client: reqwest::Client,
    base_url: String,
    table: TableRef,
    tokens: Arc<dyn TokenSource>,
}

impl BigQuerySink {
    /// Creates a sink writing to `table`.
    pub fn new(client: reqwest::Client, table: TableRef, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BIGQUERY_URL.to_string(),
            table,
            tokens,
        }
    }

    /// Overrides the API origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn insert_url(&self) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url, self.table.project, self.table.dataset, self.table.table
        )
    }
}

impl std::fmt::Debug for BigQuerySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQuerySink")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AnalyticsSink for BigQuerySink {
    #[instrument(skip_all, fields(table = %self.table, msg_id = %record.msg_id))]
    async fn deliver_record(&self, record: &NormalizedRecord) -> Result<(), SinkError> {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(self.insert_url())
            .bearer_auth(token.secret())
            .json(&InsertAllRequest {
                rows: [InsertRow {
                    insert_id: &record.msg_id,
                    json: record,
                }],
            })
            .send()
            .await
            .map_err(GcpError::transport(SERVICE))?;

        if !response.status().is_success() {
            return Err(GcpError::from_status(SERVICE, response).await.into());
        }

        let body: InsertAllResponse = response.json().await.map_err(|e| GcpError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        if !body.insert_errors.is_empty() {
            let message = body
                .insert_errors
                .iter()
                .flat_map(|row| row.errors.iter())
                .map(|e| format!("{}: {}", e.reason, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SinkError::Rejected {
                msg_id: record.msg_id.clone(),
                message,
            });
        }

        debug!("Row inserted");
        Ok(())
    }
}
