//! State machine for one snapshot-bearing view.
//!
//! Stat cards, both pie charts, the neighborhood bar chart, and the
//! comment lists all hold a [`StatisticsSnapshot`] and react to
//! selection changes the same way; they differ only in how a fresh
//! snapshot merges into held state. The view never renders anything,
//! it just answers "what data, what phase".

use civic_panel_survey_models::StatisticsSnapshot;

use crate::generation::{RequestGeneration, RequestToken};

/// Lifecycle phase of a data-bearing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewPhase {
    /// Nothing in flight; held data (if any) is current.
    #[default]
    Idle,
    /// A fetch for the latest selection change is in flight.
    Loading,
    /// The latest fetch failed; previous data is retained.
    IdleWithError,
}

/// How a freshly fetched snapshot merges into the view's held state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Replace the whole held snapshot.
    #[default]
    ReplaceAll,
    /// Replace everything except `surveys_by_neighborhood`, which is
    /// always taken from the unfiltered baseline captured at mount.
    /// Keeps the bar chart showing every neighborhood while one is
    /// selected.
    PreserveNeighborhoodBreakdown,
}

/// One chart/card view: held snapshot, phase, merge rule, and the
/// generation tokens that guard against stale fetch results.
#[derive(Debug)]
pub struct SnapshotView {
    label: &'static str,
    policy: MergePolicy,
    baseline: Option<StatisticsSnapshot>,
    current: Option<StatisticsSnapshot>,
    phase: ViewPhase,
    generation: RequestGeneration,
}

impl SnapshotView {
    #[must_use]
    pub const fn new(label: &'static str, policy: MergePolicy) -> Self {
        Self {
            label,
            policy,
            baseline: None,
            current: None,
            phase: ViewPhase::Idle,
            generation: RequestGeneration::new(),
        }
    }

    /// Short identifier used in log lines and notifications.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub const fn policy(&self) -> MergePolicy {
        self.policy
    }

    #[must_use]
    pub const fn phase(&self) -> ViewPhase {
        self.phase
    }

    /// The snapshot the view currently shows, if any fetch has ever
    /// succeeded.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&StatisticsSnapshot> {
        self.current.as_ref()
    }

    /// The unfiltered baseline captured at mount, if the first load
    /// succeeded.
    #[must_use]
    pub const fn baseline(&self) -> Option<&StatisticsSnapshot> {
        self.baseline.as_ref()
    }

    /// Installs the unfiltered baseline captured at mount and shows it.
    pub fn seed_baseline(&mut self, snapshot: StatisticsSnapshot) {
        self.baseline = Some(snapshot.clone());
        self.current = Some(snapshot);
        self.phase = ViewPhase::Idle;
    }

    /// Marks the start of a fetch for the latest selection change and
    /// stamps it. Exactly one call per view per selection change.
    pub fn begin_refresh(&mut self) -> RequestToken {
        self.phase = ViewPhase::Loading;
        self.generation.issue()
    }

    /// Merges a resolved snapshot if its token is still the latest.
    ///
    /// Returns whether the snapshot was applied; a stale result is
    /// discarded without touching phase or data.
    pub fn apply_snapshot(&mut self, token: RequestToken, snapshot: StatisticsSnapshot) -> bool {
        if !self.generation.is_current(token) {
            log::debug!("{}: discarding stale snapshot", self.label);
            return false;
        }

        let merged = match self.policy {
            MergePolicy::ReplaceAll => snapshot,
            MergePolicy::PreserveNeighborhoodBreakdown => {
                let mut merged = snapshot;
                if let Some(baseline) = &self.baseline {
                    merged.surveys_by_neighborhood = baseline.surveys_by_neighborhood.clone();
                }
                merged
            }
        };

        self.current = Some(merged);
        self.phase = ViewPhase::Idle;
        true
    }

    /// Records a failed fetch if its token is still the latest. The
    /// held snapshot is retained either way.
    ///
    /// Returns whether the failure was recorded; callers emit their
    /// one transient notification only on `true`, so a superseded
    /// fetch that fails late stays silent.
    pub fn apply_error(&mut self, token: RequestToken) -> bool {
        if !self.generation.is_current(token) {
            log::debug!("{}: ignoring stale fetch failure", self.label);
            return false;
        }
        self.phase = ViewPhase::IdleWithError;
        true
    }
}
