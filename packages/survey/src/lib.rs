#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the municipal survey API.
//!
//! Fetches aggregated survey statistics, the paginated survey listing,
//! individual survey records, and the server-rendered PDF report. The
//! statistics endpoint answers in more than one shape depending on API
//! version and filter mode; [`normalize`] folds every known shape into
//! the canonical [`StatisticsSnapshot`](civic_panel_survey_models::StatisticsSnapshot)
//! so nothing downstream ever sees the raw union.
//!
//! The [`stats::StatsClient`] also carries the selection-driven reload
//! operations the dashboard builds on: refetch for the current
//! neighborhood, and clear-then-refetch for the unfiltered view.

pub mod normalize;
pub mod stats;

use async_trait::async_trait;
use civic_panel_selection::{NeighborhoodFilter, SelectionError};
use civic_panel_survey_models::StatisticsSnapshot;
use thiserror::Error;

/// Errors that can occur talking to the survey API.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success HTTP status.
    #[error("survey API returned HTTP {status}")]
    RemoteStatus {
        /// The HTTP status code received.
        status: u16,
    },

    /// The API envelope reported `success: false`.
    #[error("survey API rejected the request: {}", message.as_deref().unwrap_or("no message"))]
    RemoteRejected {
        /// Server-provided rejection message, when present.
        message: Option<String>,
    },

    /// The response body cannot be interpreted as a statistics payload.
    #[error("malformed response: {detail}")]
    MalformedResponse {
        /// Description of what was wrong with the body.
        detail: String,
    },

    /// The selection store was used after its provider was dropped.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Anything that can produce a statistics snapshot for a scope.
#[async_trait]
pub trait StatisticsSource: Send + Sync {
    /// Fetches the statistics snapshot for the given scope.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError`] if the fetch or normalization fails.
    async fn fetch_statistics(
        &self,
        filter: &NeighborhoodFilter,
    ) -> Result<StatisticsSnapshot, SurveyError>;
}
