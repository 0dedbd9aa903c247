//! Normalization of raw statistics payloads.
//!
//! The statistics endpoint has answered in three dialects over time:
//! the canonical camelCase form, a pre-mapped Spanish form
//! (`encuestasPorBarrio`, `obrasUrgentesTop`, ...), and the oldest raw
//! form (`porBarrio`, `obrasMasVotadas`, ...). Counts sometimes arrive
//! as strings. This module probes each known spelling in order and
//! emits the canonical [`StatisticsSnapshot`]; the raw union never
//! crosses this boundary.
//!
//! Coercion rules: numeric counts pass through, string counts are
//! parsed, anything unparsable or negative becomes 0. Comment items
//! missing an id or text are dropped.

use civic_panel_selection::NeighborhoodFilter;
use civic_panel_survey_models::{
    Comment, CommentGroups, ContactParticipation, SpacesAndProposals, StatisticsSnapshot,
    TallyCount,
};
use serde_json::Value;

// ── Alias tables, canonical spelling first ──────────────────────────

const TOTAL_SURVEYS_KEYS: &[&str] = &["totalSurveys", "totalEncuestas"];
const TOTAL_NEIGHBORHOODS_KEYS: &[&str] = &["totalNeighborhoods", "totalBarrios"];
const BREAKDOWN_KEYS: &[&str] = &["surveysByNeighborhood", "encuestasPorBarrio", "porBarrio"];
const URGENT_WORKS_KEYS: &[&str] = &["topUrgentWorks", "obrasUrgentesTop", "obrasMasVotadas"];
const SERVICES_KEYS: &[&str] = &[
    "topServicesToImprove",
    "serviciosMejorarTop",
    "serviciosMasVotados",
];
const CONTACT_KEYS: &[&str] = &["contactParticipation", "participacionContacto"];
const WANT_CONTACT_KEYS: &[&str] = &["wantContact", "quierenContacto"];
const NO_CONTACT_KEYS: &[&str] = &["noContact", "noQuierenContacto"];
const COMMENTS_KEYS: &[&str] = &["otherComments", "otrosComentarios"];
const URGENT_OTHER_KEYS: &[&str] = &["urgentWorksOther", "obrasOtras"];
const SERVICES_OTHER_KEYS: &[&str] = &["servicesOther", "serviciosOtros"];
const SPACES_KEYS: &[&str] = &["spacesAndProposals", "espaciosYPropuestas"];
const SPACE_TO_IMPROVE_KEYS: &[&str] = &["spaceToImprove", "espacioAMejorar"];
const PROPOSALS_KEYS: &[&str] = &["proposals", "propuestas"];

const NEIGHBORHOOD_NAME_KEYS: &[&str] = &["name", "barrio", "nombre"];
const WORK_NAME_KEYS: &[&str] = &["name", "obra", "nombre"];
const SERVICE_NAME_KEYS: &[&str] = &["name", "servicio", "nombre"];
const COUNT_KEYS: &[&str] = &["count", "cantidad", "votos"];
const COMMENT_ID_KEYS: &[&str] = &["surveyId", "encuestaId", "id"];
const COMMENT_TEXT_KEYS: &[&str] = &["text", "texto", "comentario"];

/// Result of normalizing one raw statistics payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStats {
    /// The canonical snapshot, with absent fields zeroed.
    pub snapshot: StatisticsSnapshot,
    /// Canonical names of top-level aggregate fields the payload was
    /// missing in every known spelling.
    pub missing: Vec<&'static str>,
}

/// Folds a raw statistics `data` object into the canonical snapshot.
///
/// The scope shapes the result: a named-neighborhood payload always
/// reports one neighborhood and keeps zero-count top entries, while the
/// city-wide payload drops zero-count entries from both top lists. A
/// scoped payload missing its own neighborhood entry gets one with a
/// zero count.
///
/// Missing aggregate fields are zero-filled and reported in
/// [`NormalizedStats::missing`]; this function never fails.
#[must_use]
pub fn normalize_statistics(data: &Value, filter: &NeighborhoodFilter) -> NormalizedStats {
    let mut missing = Vec::new();

    let total_surveys = match probe(data, TOTAL_SURVEYS_KEYS) {
        Some(value) => coerce_count(value),
        None => {
            missing.push("totalSurveys");
            0
        }
    };
    let total_neighborhoods = match probe(data, TOTAL_NEIGHBORHOODS_KEYS) {
        Some(value) => coerce_count(value),
        None => {
            missing.push("totalNeighborhoods");
            0
        }
    };
    let surveys_by_neighborhood = match probe(data, BREAKDOWN_KEYS) {
        Some(value) => tally_list(value, NEIGHBORHOOD_NAME_KEYS),
        None => {
            missing.push("surveysByNeighborhood");
            Vec::new()
        }
    };
    let top_urgent_works = match probe(data, URGENT_WORKS_KEYS) {
        Some(value) => tally_list(value, WORK_NAME_KEYS),
        None => {
            missing.push("topUrgentWorks");
            Vec::new()
        }
    };
    let top_services_to_improve = match probe(data, SERVICES_KEYS) {
        Some(value) => tally_list(value, SERVICE_NAME_KEYS),
        None => {
            missing.push("topServicesToImprove");
            Vec::new()
        }
    };
    let contact_participation = match probe(data, CONTACT_KEYS) {
        Some(value) => ContactParticipation {
            want_contact: probe(value, WANT_CONTACT_KEYS).map_or(0, coerce_count),
            no_contact: probe(value, NO_CONTACT_KEYS).map_or(0, coerce_count),
        },
        None => {
            missing.push("contactParticipation");
            ContactParticipation::default()
        }
    };
    let other_comments = match probe(data, COMMENTS_KEYS) {
        Some(value) => comment_groups(value),
        None => {
            missing.push("otherComments");
            CommentGroups::default()
        }
    };

    let mut snapshot = StatisticsSnapshot {
        total_surveys,
        total_neighborhoods,
        surveys_by_neighborhood,
        top_urgent_works,
        top_services_to_improve,
        contact_participation,
        other_comments,
    };

    match filter {
        NeighborhoodFilter::All => {
            snapshot.top_urgent_works.retain(|tally| tally.count > 0);
            snapshot
                .top_services_to_improve
                .retain(|tally| tally.count > 0);
        }
        NeighborhoodFilter::Named(name) => {
            snapshot.total_neighborhoods = 1;
            if !snapshot
                .surveys_by_neighborhood
                .iter()
                .any(|tally| tally.name == *name)
            {
                snapshot
                    .surveys_by_neighborhood
                    .push(TallyCount::new(name.clone(), 0));
            }
        }
    }

    NormalizedStats { snapshot, missing }
}

/// Returns the first value present under any of the given keys.
fn probe<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(key))
}

/// Coerces a JSON count to `u64`. Strings are parsed; unparsable or
/// negative values become 0.
fn coerce_count(value: &Value) -> u64 {
    match value {
        Value::Number(_) => value.as_u64().unwrap_or(0),
        Value::String(text) => text.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

/// Coerces a JSON id to `i64`, accepting numeric and string forms.
fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(_) => value.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Extracts a tally list, probing the per-collection name aliases and
/// the shared count aliases. Entries without a usable name are dropped.
fn tally_list(value: &Value, name_keys: &[&str]) -> Vec<TallyCount> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let name = probe(entry, name_keys)?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let count = probe(entry, COUNT_KEYS).map_or(0, coerce_count);
            Some(TallyCount::new(name, count))
        })
        .collect()
}

/// Extracts a comment list. Items must carry both an id and non-blank
/// text in some known spelling.
fn comment_list(value: &Value) -> Vec<Comment> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let survey_id = probe(entry, COMMENT_ID_KEYS).and_then(coerce_id)?;
            let text = probe(entry, COMMENT_TEXT_KEYS)?.as_str()?.trim();
            if text.is_empty() {
                return None;
            }
            Some(Comment::new(survey_id, text))
        })
        .collect()
}

fn comment_groups(value: &Value) -> CommentGroups {
    let spaces = probe(value, SPACES_KEYS);
    CommentGroups {
        urgent_works_other: probe(value, URGENT_OTHER_KEYS).map_or_else(Vec::new, comment_list),
        services_other: probe(value, SERVICES_OTHER_KEYS).map_or_else(Vec::new, comment_list),
        spaces_and_proposals: SpacesAndProposals {
            space_to_improve: spaces
                .and_then(|group| probe(group, SPACE_TO_IMPROVE_KEYS))
                .map_or_else(Vec::new, comment_list),
            proposals: spaces
                .and_then(|group| probe(group, PROPOSALS_KEYS))
                .map_or_else(Vec::new, comment_list),
        },
    }
}
