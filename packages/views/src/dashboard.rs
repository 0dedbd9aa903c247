//! Dashboard orchestration: one selection, many dependent views.
//!
//! The dashboard owns the concrete view set (stat cards, two pies, the
//! neighborhood bar, the comment lists, the survey table), subscribes
//! to the selection store, and drives the fetch-and-merge cycle
//! through a [`StatisticsSource`].
//!
//! A selection change is handled in two steps. The subscription
//! callback runs synchronously inside `set_selected`: it flips every
//! snapshot view to `Loading`, stamps one token per view, re-derives
//! the table query, and records the change as pending. The host then
//! awaits [`Dashboard::refresh`], which performs one statistics fetch
//! per snapshot view (views do not coalesce identical fetches) and
//! merges each result under its token, so a response that was
//! superseded mid-flight is discarded on arrival. Table pages are
//! fetched by the host through [`TableView::take_pending`] and fed
//! back in.
//!
//! Clearing the filter goes through
//! [`StatsClient::clear_filter`](civic_panel_survey::stats::StatsClient::clear_filter):
//! the selection reset lands here like any other change, and the
//! per-view refetch runs unscoped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use civic_panel_selection::NeighborhoodFilter;
use civic_panel_selection::store::{SelectionStore, SubscriptionId};
use civic_panel_survey::{StatisticsSource, SurveyError};
use civic_panel_survey_models::StatisticsSnapshot;

use crate::generation::RequestToken;
use crate::notify::Notifier;
use crate::snapshot_view::{MergePolicy, SnapshotView};
use crate::table::TableView;

/// The concrete view set the dashboard drives.
#[derive(Debug)]
pub struct PanelViews {
    /// Headline stat cards (totals, contact split).
    pub cards: SnapshotView,
    /// Most-voted urgent works pie.
    pub works_pie: SnapshotView,
    /// Most-voted services pie.
    pub services_pie: SnapshotView,
    /// Per-neighborhood bar chart; keeps the city-wide breakdown while
    /// a neighborhood is selected.
    pub neighborhood_bar: SnapshotView,
    /// Free-text comment lists.
    pub comments: SnapshotView,
    /// Paginated survey table.
    pub table: TableView,
}

impl PanelViews {
    fn new() -> Self {
        Self {
            cards: SnapshotView::new("stat-cards", MergePolicy::ReplaceAll),
            works_pie: SnapshotView::new("works-pie", MergePolicy::ReplaceAll),
            services_pie: SnapshotView::new("services-pie", MergePolicy::ReplaceAll),
            neighborhood_bar: SnapshotView::new(
                "neighborhood-bar",
                MergePolicy::PreserveNeighborhoodBreakdown,
            ),
            comments: SnapshotView::new("comment-lists", MergePolicy::ReplaceAll),
            table: TableView::new(),
        }
    }
}

/// One selection change waiting to be fetched: the filter it selected
/// and the token each snapshot view stamped for it.
#[derive(Debug)]
struct PendingRefresh {
    filter: NeighborhoodFilter,
    cards: RequestToken,
    works_pie: RequestToken,
    services_pie: RequestToken,
    neighborhood_bar: RequestToken,
    comments: RequestToken,
}

#[derive(Debug)]
struct PanelState {
    views: PanelViews,
    pending: Option<PendingRefresh>,
    subscription: Option<SubscriptionId>,
}

impl PanelState {
    /// Runs synchronously inside `set_selected`: exactly one
    /// `Idle -> Loading` transition per view per selection change.
    fn begin_selection_refresh(&mut self, filter: &NeighborhoodFilter) {
        log::debug!("Selection changed to '{filter}', marking views for refresh");
        self.pending = Some(PendingRefresh {
            filter: filter.clone(),
            cards: self.views.cards.begin_refresh(),
            works_pie: self.views.works_pie.begin_refresh(),
            services_pie: self.views.services_pie.begin_refresh(),
            neighborhood_bar: self.views.neighborhood_bar.begin_refresh(),
            comments: self.views.comments.begin_refresh(),
        });
        self.views.table.apply_selection(filter);
    }
}

/// Aggregates the dependent views behind one selection store.
pub struct Dashboard {
    source: Arc<dyn StatisticsSource>,
    notifier: Arc<dyn Notifier>,
    store: SelectionStore,
    state: Arc<Mutex<PanelState>>,
}

impl Dashboard {
    #[must_use]
    pub fn new(
        source: Arc<dyn StatisticsSource>,
        notifier: Arc<dyn Notifier>,
        store: SelectionStore,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            state: Arc::new(Mutex::new(PanelState {
                views: PanelViews::new(),
                pending: None,
                subscription: None,
            })),
        }
    }

    /// Fetches the city-wide baseline, seeds every snapshot view with
    /// it, and subscribes to the selection store.
    ///
    /// A failed baseline fetch is reported through the notifier and
    /// leaves the views empty but functional; later selection changes
    /// still work.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::Selection`] if the store's provider is
    /// already gone.
    pub async fn mount(&self) -> Result<(), SurveyError> {
        match self.source.fetch_statistics(&NeighborhoodFilter::All).await {
            Ok(baseline) => {
                let mut state = self.lock_state();
                state.views.cards.seed_baseline(baseline.clone());
                state.views.works_pie.seed_baseline(baseline.clone());
                state.views.services_pie.seed_baseline(baseline.clone());
                state.views.neighborhood_bar.seed_baseline(baseline.clone());
                state.views.comments.seed_baseline(baseline);
                log::info!("Dashboard mounted with city-wide baseline");
            }
            Err(error) => {
                log::error!("Baseline statistics fetch failed: {error}");
                self.notifier
                    .notify_error(&format!("Failed to load statistics: {error}"));
            }
        }

        let weak_state = Arc::downgrade(&self.state);
        let subscription = self.store.subscribe(move |filter: &NeighborhoodFilter| {
            let Some(state) = weak_state.upgrade() else {
                return;
            };
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .begin_selection_refresh(filter);
        })?;
        self.lock_state().subscription = Some(subscription);
        Ok(())
    }

    /// Whether a selection change is waiting for [`refresh`](Self::refresh).
    #[must_use]
    pub fn has_pending_refresh(&self) -> bool {
        self.lock_state().pending.is_some()
    }

    /// Performs the fetches for the most recent pending selection
    /// change, one per snapshot view, and merges each result under the
    /// token stamped at selection time.
    ///
    /// Fetch failures are absorbed: the affected view keeps its data,
    /// moves to `IdleWithError`, and the notifier gets exactly one
    /// message for it. A no-op when nothing is pending.
    pub async fn refresh(&self) {
        let pending = {
            let mut state = self.lock_state();
            state.pending.take()
        };
        let Some(pending) = pending else {
            return;
        };

        self.refresh_view(&pending.filter, pending.cards, |views| &mut views.cards)
            .await;
        self.refresh_view(&pending.filter, pending.works_pie, |views| {
            &mut views.works_pie
        })
        .await;
        self.refresh_view(&pending.filter, pending.services_pie, |views| {
            &mut views.services_pie
        })
        .await;
        self.refresh_view(&pending.filter, pending.neighborhood_bar, |views| {
            &mut views.neighborhood_bar
        })
        .await;
        self.refresh_view(&pending.filter, pending.comments, |views| {
            &mut views.comments
        })
        .await;
    }

    /// Read or mutate the view set under the state lock.
    pub fn with_views<R>(&self, f: impl FnOnce(&mut PanelViews) -> R) -> R {
        let mut state = self.lock_state();
        f(&mut state.views)
    }

    /// Neighborhood names for the filter dropdown, taken from the
    /// baseline breakdown captured at mount.
    #[must_use]
    pub fn neighborhood_options(&self) -> Vec<String> {
        self.lock_state()
            .views
            .cards
            .baseline()
            .map_or_else(Vec::new, StatisticsSnapshot::neighborhood_names)
    }

    /// Detaches from the selection store. Safe to call when the
    /// provider is already gone.
    pub fn unmount(&self) {
        let subscription = self.lock_state().subscription.take();
        if let Some(id) = subscription
            && let Err(error) = self.store.unsubscribe(id)
        {
            log::debug!("Unmount after provider drop: {error}");
        }
    }

    async fn refresh_view(
        &self,
        filter: &NeighborhoodFilter,
        token: RequestToken,
        pick: fn(&mut PanelViews) -> &mut SnapshotView,
    ) {
        // Each view dispatches its own fetch; identical in-flight
        // fetches are not coalesced.
        let result = self.source.fetch_statistics(filter).await;

        let mut state = self.lock_state();
        let view = pick(&mut state.views);
        match result {
            Ok(snapshot) => {
                if view.apply_snapshot(token, snapshot) {
                    log::debug!("{} refreshed for '{filter}'", view.label());
                }
            }
            Err(error) => {
                if view.apply_error(token) {
                    let label = view.label();
                    log::error!("{label} refresh for '{filter}' failed: {error}");
                    drop(state);
                    self.notifier
                        .notify_error(&format!("Failed to refresh statistics ({label}): {error}"));
                }
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use civic_panel_selection::store::SelectionProvider;
    use civic_panel_survey_models::TallyCount;

    use crate::snapshot_view::ViewPhase;

    use super::*;

    fn snapshot(total: u64, breakdown: &[(&str, u64)]) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_surveys: total,
            total_neighborhoods: u64::try_from(breakdown.len()).unwrap(),
            surveys_by_neighborhood: breakdown
                .iter()
                .map(|(name, count)| TallyCount::new(*name, *count))
                .collect(),
            ..StatisticsSnapshot::default()
        }
    }

    /// Answers the city-wide baseline for `All` and a single-entry
    /// scoped snapshot for any named neighborhood, recording every
    /// fetch it serves.
    struct ScopedSource {
        baseline: StatisticsSnapshot,
        scoped_total: u64,
        fail_scoped: bool,
        calls: Mutex<Vec<NeighborhoodFilter>>,
    }

    impl ScopedSource {
        fn new(baseline: StatisticsSnapshot, scoped_total: u64) -> Self {
            Self {
                baseline,
                scoped_total,
                fail_scoped: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_scoped(mut self) -> Self {
            self.fail_scoped = true;
            self
        }

        fn calls(&self) -> Vec<NeighborhoodFilter> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatisticsSource for ScopedSource {
        async fn fetch_statistics(
            &self,
            filter: &NeighborhoodFilter,
        ) -> Result<StatisticsSnapshot, SurveyError> {
            self.calls.lock().unwrap().push(filter.clone());
            match filter {
                NeighborhoodFilter::All => Ok(self.baseline.clone()),
                NeighborhoodFilter::Named(name) => {
                    if self.fail_scoped {
                        return Err(SurveyError::RemoteStatus { status: 500 });
                    }
                    Ok(snapshot(
                        self.scoped_total,
                        &[(name.as_str(), self.scoped_total)],
                    ))
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        errors: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_owned());
        }
    }

    fn city_baseline() -> StatisticsSnapshot {
        snapshot(50, &[("Centro", 40), ("Norte", 10)])
    }

    #[tokio::test]
    async fn mount_seeds_every_snapshot_view() {
        let (provider, _control) = SelectionProvider::new();
        let source = Arc::new(ScopedSource::new(city_baseline(), 40));
        let dashboard = Dashboard::new(
            source.clone(),
            Arc::new(RecordingNotifier::default()),
            provider.store(),
        );

        dashboard.mount().await.unwrap();

        dashboard.with_views(|views| {
            assert_eq!(views.cards.snapshot().unwrap().total_surveys, 50);
            assert_eq!(views.neighborhood_bar.baseline().unwrap().total_surveys, 50);
            assert_eq!(views.comments.phase(), ViewPhase::Idle);
        });
        assert_eq!(source.calls(), vec![NeighborhoodFilter::All]);
    }

    #[tokio::test]
    async fn selection_change_marks_views_loading_without_fetching() {
        let (provider, control) = SelectionProvider::new();
        let source = Arc::new(ScopedSource::new(city_baseline(), 40));
        let dashboard = Dashboard::new(
            source.clone(),
            Arc::new(RecordingNotifier::default()),
            provider.store(),
        );
        dashboard.mount().await.unwrap();

        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();

        assert!(dashboard.has_pending_refresh());
        dashboard.with_views(|views| {
            assert_eq!(views.cards.phase(), ViewPhase::Loading);
            assert_eq!(views.table.phase(), ViewPhase::Loading);
            assert_eq!(views.table.query().neighborhood.as_deref(), Some("Centro"));
            assert_eq!(views.table.query().page, 1);
        });
        // Only the mount-time baseline fetch has happened so far.
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn scoped_refresh_merges_but_bar_keeps_baseline_breakdown() {
        let (provider, control) = SelectionProvider::new();
        let source = Arc::new(ScopedSource::new(city_baseline(), 40));
        let dashboard = Dashboard::new(
            source.clone(),
            Arc::new(RecordingNotifier::default()),
            provider.store(),
        );
        dashboard.mount().await.unwrap();

        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();
        dashboard.refresh().await;

        dashboard.with_views(|views| {
            let cards = views.cards.snapshot().unwrap();
            assert_eq!(cards.total_surveys, 40);
            assert_eq!(cards.total_neighborhoods, 1);

            let bar = views.neighborhood_bar.snapshot().unwrap();
            assert_eq!(bar.total_surveys, 40);
            assert_eq!(
                bar.neighborhood_names(),
                vec!["Centro".to_owned(), "Norte".to_owned()]
            );
            assert_eq!(views.cards.phase(), ViewPhase::Idle);
        });
        // One independent fetch per snapshot view.
        assert_eq!(source.calls().len(), 6);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_data_and_notifies_once_per_view() {
        let (provider, control) = SelectionProvider::new();
        let source = Arc::new(ScopedSource::new(city_baseline(), 40).failing_scoped());
        let notifier = Arc::new(RecordingNotifier::default());
        let dashboard = Dashboard::new(source, notifier.clone(), provider.store());
        dashboard.mount().await.unwrap();

        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();
        dashboard.refresh().await;

        dashboard.with_views(|views| {
            assert_eq!(views.cards.phase(), ViewPhase::IdleWithError);
            assert_eq!(views.cards.snapshot().unwrap().total_surveys, 50);
            assert_eq!(views.works_pie.phase(), ViewPhase::IdleWithError);
        });
        // Five snapshot views, one notification each, none doubled.
        assert_eq!(notifier.errors().len(), 5);
    }

    #[tokio::test]
    async fn second_selection_supersedes_unfetched_first() {
        let (provider, control) = SelectionProvider::new();
        let source = Arc::new(ScopedSource::new(city_baseline(), 10));
        let dashboard = Dashboard::new(
            source.clone(),
            Arc::new(RecordingNotifier::default()),
            provider.store(),
        );
        dashboard.mount().await.unwrap();

        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();
        control
            .set_selected(NeighborhoodFilter::named("Norte"))
            .unwrap();
        dashboard.refresh().await;

        // Only Norte was ever fetched; the Centro change was
        // superseded before its fetches went out.
        let scoped_calls: Vec<_> = source
            .calls()
            .into_iter()
            .filter(|filter| filter.is_filtered())
            .collect();
        assert_eq!(scoped_calls.len(), 5);
        assert!(
            scoped_calls
                .iter()
                .all(|filter| filter.name() == Some("Norte"))
        );

        dashboard.with_views(|views| {
            assert_eq!(
                views.cards.snapshot().unwrap().neighborhood_names(),
                vec!["Norte".to_owned()]
            );
        });
    }

    #[tokio::test]
    async fn clearing_selection_refetches_city_wide() {
        let (provider, control) = SelectionProvider::new();
        let source = Arc::new(ScopedSource::new(city_baseline(), 40));
        let dashboard = Dashboard::new(
            source.clone(),
            Arc::new(RecordingNotifier::default()),
            provider.store(),
        );
        dashboard.mount().await.unwrap();

        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();
        dashboard.refresh().await;
        control.set_selected(NeighborhoodFilter::All).unwrap();
        dashboard.refresh().await;

        dashboard.with_views(|views| {
            let cards = views.cards.snapshot().unwrap();
            assert_eq!(cards.total_surveys, 50);
            assert_eq!(views.table.query().neighborhood, None);
        });
    }

    #[tokio::test]
    async fn mount_failure_leaves_views_empty_but_working() {
        let (provider, control) = SelectionProvider::new();
        // Baseline fails too: every fetch for this source errors.
        struct DownSource;
        #[async_trait]
        impl StatisticsSource for DownSource {
            async fn fetch_statistics(
                &self,
                _filter: &NeighborhoodFilter,
            ) -> Result<StatisticsSnapshot, SurveyError> {
                Err(SurveyError::RemoteStatus { status: 503 })
            }
        }
        let notifier = Arc::new(RecordingNotifier::default());
        let dashboard = Dashboard::new(Arc::new(DownSource), notifier.clone(), provider.store());

        dashboard.mount().await.unwrap();
        assert_eq!(notifier.errors().len(), 1);
        dashboard.with_views(|views| {
            assert_eq!(views.cards.snapshot(), None);
        });

        // Filter interaction is not blocked by the failed first load.
        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();
        assert!(dashboard.has_pending_refresh());
    }

    #[tokio::test]
    async fn neighborhood_options_come_from_baseline() {
        let (provider, _control) = SelectionProvider::new();
        let dashboard = Dashboard::new(
            Arc::new(ScopedSource::new(city_baseline(), 40)),
            Arc::new(RecordingNotifier::default()),
            provider.store(),
        );
        dashboard.mount().await.unwrap();

        assert_eq!(
            dashboard.neighborhood_options(),
            vec!["Centro".to_owned(), "Norte".to_owned()]
        );
    }

    #[tokio::test]
    async fn unmount_stops_reacting_to_selection() {
        let (provider, control) = SelectionProvider::new();
        let dashboard = Dashboard::new(
            Arc::new(ScopedSource::new(city_baseline(), 40)),
            Arc::new(RecordingNotifier::default()),
            provider.store(),
        );
        dashboard.mount().await.unwrap();

        dashboard.unmount();
        control
            .set_selected(NeighborhoodFilter::named("Centro"))
            .unwrap();

        assert!(!dashboard.has_pending_refresh());
    }
}
