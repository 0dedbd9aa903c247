//! Survey API client and selection-driven reload operations.
//!
//! One [`StatsClient`] serves every endpoint of the survey API:
//! aggregated statistics, the paginated listing, single-survey detail,
//! and the server-rendered PDF report. Statistics requests always send
//! `Cache-Control: no-cache` so the aggregates reflect the latest
//! submission. There is no retry and no client-side caching; every
//! failure surfaces as a distinguishable [`SurveyError`] and callers
//! decide how to present it.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use civic_panel_selection::NeighborhoodFilter;
use civic_panel_selection::store::{FilterControl, SelectionStore};
use civic_panel_survey_models::{StatisticsSnapshot, Survey, SurveyPage, SurveyQuery};
use serde_json::Value;

use crate::{StatisticsSource, SurveyError, normalize};

/// Production API base URL, used when `CIVIC_PANEL_API_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.ceres.gob.ar";

/// Client for the survey API.
///
/// Cheap to construct; holds a connection-pooling [`reqwest::Client`]
/// and the loading flag the dashboard polls while a selection-driven
/// reload is in flight.
#[derive(Debug)]
pub struct StatsClient {
    http: reqwest::Client,
    base_url: String,
    loading: AtomicBool,
}

impl StatsClient {
    /// Creates a client for the given base URL. A trailing slash is
    /// trimmed so endpoint paths can be appended verbatim.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            loading: AtomicBool::new(false),
        }
    }

    /// Creates a client from the `CIVIC_PANEL_API_URL` environment
    /// variable, falling back to [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CIVIC_PANEL_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        Self::new(&base_url)
    }

    /// Replaces the HTTP client, e.g. to configure timeouts.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a selection-driven reload is currently in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    // ── Statistics ──────────────────────────────────────────────────

    /// Fetches and normalizes the statistics snapshot for the given
    /// scope. `barrio` is appended only for a named neighborhood.
    ///
    /// A well-formed payload missing aggregate fields is zero-filled
    /// with a logged warning rather than failing.
    ///
    /// # Errors
    ///
    /// * [`SurveyError::Http`] if the request fails in transport.
    /// * [`SurveyError::RemoteStatus`] on a non-2xx response.
    /// * [`SurveyError::RemoteRejected`] if the envelope reports
    ///   `success: false`.
    /// * [`SurveyError::MalformedResponse`] if `data` is absent or not
    ///   a JSON object.
    pub async fn fetch_statistics(
        &self,
        filter: &NeighborhoodFilter,
    ) -> Result<StatisticsSnapshot, SurveyError> {
        let url = format!("{}/encuestaobras/estadisticas", self.base_url);
        log::debug!("Fetching statistics for '{filter}': {url}");

        let mut request = self.http.get(&url).header("Cache-Control", "no-cache");
        if let Some(name) = filter.name() {
            request = request.query(&[("barrio", name)]);
        }

        let response = request.send().await?;
        ensure_success(response.status())?;
        let body: Value = response.json().await?;
        let data = envelope_data(body)?;
        if !data.is_object() {
            return Err(SurveyError::MalformedResponse {
                detail: "statistics data is not a JSON object".to_owned(),
            });
        }

        let normalized = normalize::normalize_statistics(&data, filter);
        if !normalized.missing.is_empty() {
            log::warn!(
                "Statistics response for '{filter}' missing {:?}, using zeroed values",
                normalized.missing
            );
        }
        log::info!(
            "Fetched statistics for '{filter}': {} surveys across {} neighborhoods",
            normalized.snapshot.total_surveys,
            normalized.snapshot.total_neighborhoods
        );
        Ok(normalized.snapshot)
    }

    /// Refetches statistics for the currently selected neighborhood.
    ///
    /// Returns `Ok(None)` without touching the network when the
    /// selection is unfiltered. A filtered selection always fetches,
    /// even while an earlier reload is still in flight; overlapping
    /// reloads each complete independently.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::Selection`] if the provider is gone, or
    /// any [`fetch_statistics`](Self::fetch_statistics) error.
    pub async fn reload_for_current(
        &self,
        store: &SelectionStore,
    ) -> Result<Option<StatisticsSnapshot>, SurveyError> {
        let filter = store.selected()?;
        if !filter.is_filtered() {
            log::debug!("Reload skipped: no neighborhood selected");
            return Ok(None);
        }

        self.loading.store(true, Ordering::SeqCst);
        let result = self.fetch_statistics(&filter).await;
        self.loading.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    /// Resets the selection to unfiltered, then fetches the city-wide
    /// snapshot.
    ///
    /// The reset happens before the fetch, so a failed fetch still
    /// leaves the filter cleared and the caller keeps its previous
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::Selection`] if the provider is gone, or
    /// any [`fetch_statistics`](Self::fetch_statistics) error.
    pub async fn clear_filter(
        &self,
        control: &FilterControl,
    ) -> Result<StatisticsSnapshot, SurveyError> {
        control.set_selected(NeighborhoodFilter::All)?;

        self.loading.store(true, Ordering::SeqCst);
        let result = self.fetch_statistics(&NeighborhoodFilter::All).await;
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    // ── Listing and detail ──────────────────────────────────────────

    /// Fetches one page of the survey listing.
    ///
    /// The response's `totalPages` is server-computed and adopted
    /// verbatim; callers never recompute it from `total`.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError`] if the request fails, the envelope
    /// rejects, or the page body does not decode.
    pub async fn fetch_page(&self, query: &SurveyQuery) -> Result<SurveyPage, SurveyError> {
        let url = format!("{}/encuestaobras/todas", self.base_url);
        log::debug!("Fetching survey page {}: {url}", query.page);

        let response = self
            .http
            .get(&url)
            .query(&query.to_query_pairs())
            .send()
            .await?;
        ensure_success(response.status())?;
        let body: Value = response.json().await?;
        let page: SurveyPage = serde_json::from_value(envelope_data(body)?)?;

        log::info!(
            "Fetched survey page {}/{}: {} surveys of {}",
            page.page,
            page.total_pages,
            page.surveys.len(),
            page.total
        );
        Ok(page)
    }

    /// Fetches one survey record by id, used when a comment is clicked
    /// to open the full submission.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError`] if the request fails, the envelope
    /// rejects, or the record does not decode.
    pub async fn fetch_survey(&self, id: i64) -> Result<Survey, SurveyError> {
        let url = format!("{}/encuestaobras/respuesta/{id}", self.base_url);
        log::debug!("Fetching survey {id}: {url}");

        let response = self.http.get(&url).send().await?;
        ensure_success(response.status())?;
        let body: Value = response.json().await?;
        let survey: Survey = serde_json::from_value(envelope_data(body)?)?;
        Ok(survey)
    }

    // ── Report download ─────────────────────────────────────────────

    /// Downloads the server-rendered PDF report for the given scope.
    /// Report generation happens entirely server-side; this only
    /// transfers the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError`] if the request fails or the body is
    /// empty.
    pub async fn download_report_pdf(
        &self,
        filter: &NeighborhoodFilter,
    ) -> Result<Vec<u8>, SurveyError> {
        let url = format!("{}/encuestaobras/pdf", self.base_url);
        log::debug!("Downloading PDF report for '{filter}': {url}");

        let mut request = self.http.get(&url);
        if let Some(name) = filter.name() {
            request = request.query(&[("barrio", name)]);
        }

        let response = request.send().await?;
        ensure_success(response.status())?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(SurveyError::MalformedResponse {
                detail: "PDF response body is empty".to_owned(),
            });
        }

        log::info!("Downloaded PDF report for '{filter}': {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl StatisticsSource for StatsClient {
    async fn fetch_statistics(
        &self,
        filter: &NeighborhoodFilter,
    ) -> Result<StatisticsSnapshot, SurveyError> {
        Self::fetch_statistics(self, filter).await
    }
}

/// Maps a non-2xx status to [`SurveyError::RemoteStatus`].
fn ensure_success(status: reqwest::StatusCode) -> Result<(), SurveyError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SurveyError::RemoteStatus {
            status: status.as_u16(),
        })
    }
}

/// Unwraps the `{ success, data }` envelope. A missing or `false`
/// `success` flag is a rejection; a missing `data` is malformed.
fn envelope_data(mut body: Value) -> Result<Value, SurveyError> {
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !success {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        return Err(SurveyError::RemoteRejected { message });
    }
    body.get_mut("data")
        .map(Value::take)
        .ok_or_else(|| SurveyError::MalformedResponse {
            detail: "envelope has no data field".to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use civic_panel_selection::store::SelectionProvider;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    use super::*;

    #[test]
    fn envelope_data_passes_through() {
        let data = envelope_data(json!({ "success": true, "data": { "totalEncuestas": 4 } }))
            .unwrap();
        assert_eq!(data, json!({ "totalEncuestas": 4 }));
    }

    #[test]
    fn envelope_rejection_carries_message() {
        let err = envelope_data(json!({ "success": false, "message": "sin datos" })).unwrap_err();
        match err {
            SurveyError::RemoteRejected { message } => {
                assert_eq!(message.as_deref(), Some("sin datos"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn envelope_without_success_flag_is_rejected() {
        let err = envelope_data(json!({ "data": {} })).unwrap_err();
        assert!(matches!(err, SurveyError::RemoteRejected { message: None }));
    }

    #[test]
    fn envelope_without_data_is_malformed() {
        let err = envelope_data(json!({ "success": true })).unwrap_err();
        assert!(matches!(err, SurveyError::MalformedResponse { .. }));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = StatsClient::new("https://api.example.test/");
        assert_eq!(client.base_url(), "https://api.example.test");
    }

    #[test]
    fn starts_without_loading_flag() {
        assert!(!StatsClient::new("http://localhost").is_loading());
    }

    #[tokio::test]
    async fn reload_skips_when_unfiltered() {
        let (provider, _control) = SelectionProvider::new();
        // Unreachable base URL: the unfiltered early-return must win
        // before any request is attempted.
        let client = StatsClient::new("http://127.0.0.1:9");

        let result = client.reload_for_current(&provider.store()).await.unwrap();

        assert_eq!(result, None);
        assert!(!client.is_loading());
    }

    #[tokio::test]
    async fn reload_fetches_filtered_selection_while_another_is_in_flight() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (provider, control) = SelectionProvider::new();
        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();
        let client = Arc::new(StatsClient::new(&base_url));

        // Park the first reload on a connection the server never answers.
        let first = {
            let client = Arc::clone(&client);
            let store = provider.store();
            tokio::spawn(async move { client.reload_for_current(&store).await })
        };
        let (_held, _) = listener.accept().await.unwrap();

        let second = {
            let client = Arc::clone(&client);
            let store = provider.store();
            tokio::spawn(async move { client.reload_for_current(&store).await })
        };
        let accepted = timeout(Duration::from_secs(5), listener.accept()).await;
        let (mut connection, _) = accepted
            .expect("second reload never reached the API")
            .unwrap();

        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        loop {
            let n = connection.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request.windows(4).any(|window| window == b"\r\n\r\n") {
                break;
            }
        }
        let body = r#"{"success":true,"data":{}}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        connection.write_all(response.as_bytes()).await.unwrap();

        let snapshot = second
            .await
            .unwrap()
            .unwrap()
            .expect("second reload fetches despite the one in flight");
        assert_eq!(snapshot.total_neighborhoods, 1);
        first.abort();
    }

    #[tokio::test]
    async fn clear_filter_resets_selection_even_when_fetch_fails() {
        let (provider, control) = SelectionProvider::new();
        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();
        let client = StatsClient::new("http://127.0.0.1:9");

        let result = client.clear_filter(&control).await;

        assert!(result.is_err());
        assert_eq!(
            provider.store().selected().unwrap(),
            NeighborhoodFilter::All
        );
        assert!(!client.is_loading());
    }
}
