#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical data model for the public-works survey panel.
//!
//! The remote API has grown several spellings for the same aggregate
//! fields. Everything in this crate is the *canonical* shape: clients
//! normalize whatever the wire sends into these types, and the view
//! layer only ever sees this form.
//!
//! Serialized field names use camelCase to match the canonical JSON
//! emitted by the newer API endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Page size the survey table requests on every fetch.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One named bucket with a tally, e.g. a neighborhood and its survey
/// count, or a public work and its vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyCount {
    /// Bucket label as reported by the API
    pub name: String,
    /// Number of surveys or votes in the bucket
    pub count: u64,
}

impl TallyCount {
    #[must_use]
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// How many respondents asked to be contacted about their submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactParticipation {
    /// Respondents who left contact details
    pub want_contact: u64,
    /// Respondents who declined contact
    pub no_contact: u64,
}

/// A free-text answer attributed to the survey it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Identifier of the originating survey
    pub survey_id: i64,
    /// Verbatim respondent text
    pub text: String,
}

impl Comment {
    #[must_use]
    pub fn new(survey_id: i64, text: impl Into<String>) -> Self {
        Self {
            survey_id,
            text: text.into(),
        }
    }
}

/// Free-text answers about public spaces, split by question.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacesAndProposals {
    /// "Which space would you improve?" answers
    pub space_to_improve: Vec<Comment>,
    /// Open proposal answers
    pub proposals: Vec<Comment>,
}

/// All free-text answer groups carried by a statistics response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentGroups {
    /// "Other" answers to the urgent-works question
    pub urgent_works_other: Vec<Comment>,
    /// "Other" answers to the services question
    pub services_other: Vec<Comment>,
    /// Space-improvement and proposal answers
    pub spaces_and_proposals: SpacesAndProposals,
}

/// Aggregated survey statistics for one scope, either the whole city or
/// a single neighborhood.
///
/// A neighborhood-scoped snapshot always reports `total_neighborhoods`
/// of `1` and carries a single entry in `surveys_by_neighborhood`, even
/// when that entry's count is zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    /// Total surveys submitted in scope
    pub total_surveys: u64,
    /// Distinct neighborhoods represented in scope
    pub total_neighborhoods: u64,
    /// Survey tally per neighborhood
    pub surveys_by_neighborhood: Vec<TallyCount>,
    /// Most-voted urgent works, descending
    pub top_urgent_works: Vec<TallyCount>,
    /// Most-voted services to improve, descending
    pub top_services_to_improve: Vec<TallyCount>,
    /// Contact opt-in tallies
    pub contact_participation: ContactParticipation,
    /// Free-text answer groups
    pub other_comments: CommentGroups,
}

impl StatisticsSnapshot {
    /// Snapshot with every tally at zero and every list empty.
    ///
    /// Used as the base when a response is well-formed but missing
    /// aggregate fields.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Names of every neighborhood present in the breakdown, in the
    /// order the API reported them.
    #[must_use]
    pub fn neighborhood_names(&self) -> Vec<String> {
        self.surveys_by_neighborhood
            .iter()
            .map(|tally| tally.name.clone())
            .collect()
    }

    /// Whether the contact opt-in tallies account for every survey in
    /// scope. Older API deployments under-report the opt-out side, so
    /// callers treat a `false` here as a data-quality signal, not an
    /// error. Tallies large enough to overflow their sum are
    /// inconsistent by definition.
    #[must_use]
    pub fn contact_totals_consistent(&self) -> bool {
        self.contact_participation
            .want_contact
            .checked_add(self.contact_participation.no_contact)
            .is_some_and(|sum| sum == self.total_surveys)
    }
}

/// Review state of a submitted survey.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum SurveyStatus {
    /// Submitted, not yet looked at
    #[serde(rename = "pendiente")]
    #[strum(serialize = "pendiente")]
    Pending,
    /// Reviewed by an operator
    #[serde(rename = "revisada")]
    #[strum(serialize = "revisada")]
    Reviewed,
    /// Closed out and hidden from the default listing
    #[serde(rename = "archivada")]
    #[strum(serialize = "archivada")]
    Archived,
}

/// One submitted survey as returned by the listing and detail
/// endpoints.
///
/// Only `id` is required. The API omits answers the respondent skipped,
/// so everything else is optional or defaults to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    /// Unique survey identifier
    pub id: i64,
    /// Neighborhood the respondent selected
    #[serde(rename = "barrio", default)]
    pub neighborhood: Option<String>,
    /// Submission timestamp as the API formats it
    #[serde(rename = "fecha", default)]
    pub submitted_at: Option<String>,
    /// Review state
    #[serde(rename = "estado", default)]
    pub status: Option<SurveyStatus>,
    /// Whether the respondent asked to be contacted
    #[serde(rename = "quiereContacto", default)]
    pub wants_contact: Option<bool>,
    /// Contact phone, present only when contact was requested
    #[serde(rename = "telefono", default)]
    pub contact_phone: Option<String>,
    /// Urgent works the respondent voted for
    #[serde(rename = "obrasUrgentes", default)]
    pub urgent_works: Vec<String>,
    /// Services the respondent voted to improve
    #[serde(rename = "serviciosMejorar", default)]
    pub services_to_improve: Vec<String>,
    /// Free-text answer about a space to improve
    #[serde(rename = "espacioAMejorar", default)]
    pub space_to_improve: Option<String>,
    /// Free-text proposal
    #[serde(rename = "propuesta", default)]
    pub proposal: Option<String>,
}

/// One page of the survey listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyPage {
    /// Surveys on this page
    #[serde(rename = "encuestas", default)]
    pub surveys: Vec<Survey>,
    /// Total surveys matching the query across all pages
    #[serde(default)]
    pub total: u64,
    /// 1-based page number this response covers
    #[serde(default = "first_page")]
    pub page: u32,
    /// Total pages for the query, as computed by the server.
    ///
    /// Authoritative. Clients never recompute this from `total` and
    /// the page size.
    #[serde(rename = "totalPages", default = "first_page")]
    pub total_pages: u32,
}

const fn first_page() -> u32 {
    1
}

/// Listing sort orders accepted by the API's `sort` parameter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum SurveySort {
    /// Newest submissions first
    #[default]
    #[serde(rename = "fecha_desc")]
    #[strum(serialize = "fecha_desc")]
    NewestFirst,
    /// Oldest submissions first
    #[serde(rename = "fecha_asc")]
    #[strum(serialize = "fecha_asc")]
    OldestFirst,
    /// Alphabetical by neighborhood
    #[serde(rename = "barrio_asc")]
    #[strum(serialize = "barrio_asc")]
    NeighborhoodAz,
}

/// Query the survey table sends to the listing endpoint.
///
/// `page` is 1-based. Every optional filter is omitted from the query
/// string when unset, so the server applies its own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuery {
    /// 1-based page to fetch
    pub page: u32,
    /// Rows per page
    pub per_page: u32,
    /// Sort order, server default when `None`
    pub sort: Option<SurveySort>,
    /// Restrict to one neighborhood
    pub neighborhood: Option<String>,
    /// Restrict to one review state
    pub status: Option<SurveyStatus>,
    /// Earliest submission date, inclusive
    pub from: Option<NaiveDate>,
    /// Latest submission date, inclusive
    pub to: Option<NaiveDate>,
    /// Free-text search over answers
    pub search: Option<String>,
}

impl Default for SurveyQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            sort: None,
            neighborhood: None,
            status: None,
            from: None,
            to: None,
            search: None,
        }
    }
}

impl SurveyQuery {
    /// The query with `page` reset to the first page and everything
    /// else kept. Used whenever a filter change invalidates the
    /// current page position.
    #[must_use]
    pub fn back_to_first_page(mut self) -> Self {
        self.page = 1;
        self
    }

    /// Key/value pairs for the listing endpoint's query string, in the
    /// order the API documents them. Unset filters and blank search
    /// text produce no pair.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];

        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.to_string()));
        }
        if let Some(neighborhood) = &self.neighborhood
            && !neighborhood.trim().is_empty()
        {
            pairs.push(("barrio", neighborhood.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("estado", status.to_string()));
        }
        if let Some(from) = self.from {
            pairs.push(("desde", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("hasta", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(search) = &self.search
            && !search.trim().is_empty()
        {
            pairs.push(("search", search.clone()));
        }

        pairs
    }
}
