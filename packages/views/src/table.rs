//! State machine for the paginated survey table.
//!
//! The table talks to the listing endpoint through a query it
//! re-derives locally, but the server owns the page math: `totalPages`
//! from the response is adopted verbatim even when it disagrees with
//! `total / per_page` computed locally. Every filter mutation returns
//! the token for the refetch it implies; the host fetches the pending
//! query and feeds the result back through [`TableView::apply_page`].

use chrono::NaiveDate;
use civic_panel_selection::NeighborhoodFilter;
use civic_panel_survey_models::{Survey, SurveyPage, SurveyQuery, SurveySort, SurveyStatus};

use crate::generation::{RequestGeneration, RequestToken};
use crate::snapshot_view::ViewPhase;

/// Paginated survey-table state: the derived remote query plus the
/// last page received.
#[derive(Debug, Default)]
pub struct TableView {
    query: SurveyQuery,
    last_page: Option<SurveyPage>,
    phase: ViewPhase,
    generation: RequestGeneration,
    pending: Option<RequestToken>,
}

impl TableView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The query the next fetch should use.
    #[must_use]
    pub const fn query(&self) -> &SurveyQuery {
        &self.query
    }

    #[must_use]
    pub const fn phase(&self) -> ViewPhase {
        self.phase
    }

    /// Rows from the last received page.
    #[must_use]
    pub fn rows(&self) -> &[Survey] {
        self.last_page
            .as_ref()
            .map_or(&[], |page| page.surveys.as_slice())
    }

    /// Total matching surveys, as last reported by the server.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.last_page.as_ref().map_or(0, |page| page.total)
    }

    /// Server-reported page count, never locally recomputed.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.last_page
            .as_ref()
            .map_or(1, |page| page.total_pages.max(1))
    }

    /// Re-derives the query for a selection change: the neighborhood
    /// parameter follows the filter and the page resets to 1; sort,
    /// search, status, and date range are preserved.
    pub fn apply_selection(&mut self, filter: &NeighborhoodFilter) -> RequestToken {
        self.query.neighborhood = filter.name().map(ToOwned::to_owned);
        self.query.page = 1;
        self.mark_refetch()
    }

    /// Moves to another page, clamped to the last known page bounds.
    pub fn set_page(&mut self, page: u32) -> RequestToken {
        self.query.page = page.clamp(1, self.total_pages());
        self.mark_refetch()
    }

    /// Changes the sort order and returns to the first page.
    pub fn set_sort(&mut self, sort: Option<SurveySort>) -> RequestToken {
        self.query.sort = sort;
        self.query.page = 1;
        self.mark_refetch()
    }

    /// Changes the free-text search and returns to the first page.
    pub fn set_search(&mut self, search: Option<String>) -> RequestToken {
        self.query.search = search;
        self.query.page = 1;
        self.mark_refetch()
    }

    /// Changes the status filter and returns to the first page.
    pub fn set_status(&mut self, status: Option<SurveyStatus>) -> RequestToken {
        self.query.status = status;
        self.query.page = 1;
        self.mark_refetch()
    }

    /// Changes the submission date range and returns to the first page.
    pub fn set_date_range(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> RequestToken {
        self.query.from = from;
        self.query.to = to;
        self.query.page = 1;
        self.mark_refetch()
    }

    /// Hands out the pending fetch, if one is waiting: the token to
    /// apply the result with and the query to send. Each pending fetch
    /// is handed out once.
    pub fn take_pending(&mut self) -> Option<(RequestToken, SurveyQuery)> {
        self.pending.take().map(|token| (token, self.query.clone()))
    }

    /// Adopts a received page if its token is still the latest. The
    /// server's `page` and `totalPages` become authoritative.
    pub fn apply_page(&mut self, token: RequestToken, page: SurveyPage) -> bool {
        if !self.generation.is_current(token) {
            log::debug!("survey-table: discarding stale page {}", page.page);
            return false;
        }
        self.query.page = page.page.max(1);
        self.last_page = Some(page);
        self.phase = ViewPhase::Idle;
        true
    }

    /// Records a failed page fetch if its token is still the latest.
    /// Previously received rows are retained.
    pub fn apply_error(&mut self, token: RequestToken) -> bool {
        if !self.generation.is_current(token) {
            log::debug!("survey-table: ignoring stale fetch failure");
            return false;
        }
        self.phase = ViewPhase::IdleWithError;
        true
    }

    fn mark_refetch(&mut self) -> RequestToken {
        self.phase = ViewPhase::Loading;
        let token = self.generation.issue();
        self.pending = Some(token);
        token
    }
}
