//! Client-driven bulk upload to the services platform.
//!
//! The platform only offers a single-record create endpoint, so the
//! roster is uploaded one `POST /profesionales` at a time, in chunks
//! for progress reporting. A failed create is recorded against its row
//! and the upload continues; the caller gets a full per-row outcome
//! either way.

use serde_json::Value;

use crate::{DirectoryError, ProfessionalRow};

const DEFAULT_CHUNK_SIZE: usize = 25;

/// One professional the platform accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProfessional {
    /// Record id assigned by the platform.
    pub id: i64,
    /// Name from the uploaded row.
    pub name: String,
}

/// One professional the platform did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    /// Name from the rejected row.
    pub name: String,
    /// Why the create failed.
    pub message: String,
}

/// Per-row report of a finished bulk upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkOutcome {
    /// Rows the platform created, in upload order.
    pub created: Vec<CreatedProfessional>,
    /// Rows that failed, in upload order.
    pub failed: Vec<UploadFailure>,
}

/// Uploads roster rows to the services platform.
#[derive(Debug)]
pub struct BulkUploader {
    http: reqwest::Client,
    base_url: String,
    chunk_size: usize,
}

impl BulkUploader {
    /// Creates an uploader for the given platform base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Replaces the HTTP client, e.g. to configure timeouts.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Sets how many rows are grouped per progress chunk. Zero is
    /// treated as one.
    #[must_use]
    pub const fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = if size == 0 { 1 } else { size };
        self
    }

    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Uploads every row, sequentially, and reports per-row outcomes.
    /// Failures (network or rejection) never abort the run.
    pub async fn upload(&self, rows: &[ProfessionalRow]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        let total_chunks = rows.len().div_ceil(self.chunk_size).max(1);

        for (index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            log::debug!(
                "Uploading chunk {}/{total_chunks} ({} professionals)",
                index + 1,
                chunk.len()
            );
            for row in chunk {
                match self.create_one(row).await {
                    Ok(id) => outcome.created.push(CreatedProfessional {
                        id,
                        name: row.name.clone(),
                    }),
                    Err(error) => {
                        log::warn!("Create failed for '{}': {error}", row.name);
                        outcome.failed.push(UploadFailure {
                            name: row.name.clone(),
                            message: error.to_string(),
                        });
                    }
                }
            }
        }

        log::info!(
            "Bulk upload finished: {} created, {} failed",
            outcome.created.len(),
            outcome.failed.len()
        );
        outcome
    }

    /// Creates one professional, returning the id the platform
    /// assigned.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the request fails, the envelope
    /// rejects, or the response carries no id.
    pub async fn create_one(&self, row: &ProfessionalRow) -> Result<i64, DirectoryError> {
        let url = format!("{}/profesionales", self.base_url);
        log::debug!("Creating professional '{}': {url}", row.name);

        let response = self.http.post(&url).json(row).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::RemoteStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        created_id(&body)
    }
}

/// Pulls the created record id out of a `{ success, data: { id } }`
/// envelope.
fn created_id(body: &Value) -> Result<i64, DirectoryError> {
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !success {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        return Err(DirectoryError::RemoteRejected { message });
    }
    body.get("data")
        .and_then(|data| data.get("id"))
        .and_then(Value::as_i64)
        .ok_or_else(|| DirectoryError::MalformedResponse {
            detail: "create response has no id".to_owned(),
        })
}
