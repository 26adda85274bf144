//! Sweep controller and map view behaviour over real repositories.

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use gppd_map::api::FacilityPageResponse;
use gppd_map::client::{
    FetchError, MapConfig, MapView, PageFetcher, RepositoryPageFetcher, RenderStatus,
    SweepConfig, SweepController, SweepOutcome, ViewUpdate,
};
use gppd_map::db::FullRepository;
use gppd_map::models::{FacilityFilter, PrimaryFuel, QueryFilter, ViewportBounds};

use support::{facility, global_grid, seeded_repo};

/// Wraps a repository fetcher, records requests, and can hold or fail them.
struct ScriptedFetcher {
    inner: RepositoryPageFetcher,
    requests: Mutex<Vec<QueryFilter>>,
    hold_country: Option<String>,
    entered: Notify,
    release: Notify,
    fail: Mutex<bool>,
}

impl ScriptedFetcher {
    fn new(repo: Arc<dyn FullRepository>) -> Self {
        Self {
            inner: RepositoryPageFetcher::new(repo),
            requests: Mutex::new(Vec::new()),
            hold_country: None,
            entered: Notify::new(),
            release: Notify::new(),
            fail: Mutex::new(false),
        }
    }

    fn holding(mut self, country: &str) -> Self {
        self.hold_country = Some(country.to_string());
        self
    }

    fn offsets(&self) -> Vec<u64> {
        self.requests.lock().iter().map(|r| r.offset).collect()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, request: &QueryFilter) -> Result<FacilityPageResponse, FetchError> {
        self.requests.lock().push(request.clone());
        if self.hold_country.is_some() && request.filter.country == self.hold_country {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if *self.fail.lock() {
            return Err(FetchError::Transport("connection refused".into()));
        }
        self.inner.fetch_page(request).await
    }
}

fn shared(repo: gppd_map::db::LocalRepository) -> Arc<dyn FullRepository> {
    Arc::new(repo)
}

#[tokio::test]
async fn test_sweep_requests_pages_until_declared_total() {
    let fetcher = Arc::new(ScriptedFetcher::new(shared(seeded_repo(global_grid(5000)))));
    let sweeps = SweepController::new(
        fetcher.clone(),
        SweepConfig {
            page_limit: 2000,
            max_pages: 64,
        },
    );

    let SweepOutcome::Committed(snapshot) = sweeps.sweep(FacilityFilter::default()).await else {
        panic!("sweep should commit");
    };

    assert_eq!(fetcher.offsets(), vec![0, 2000, 4000]);
    assert_eq!(snapshot.declared_total, 5000);
    assert!(snapshot.rows.len() <= 5000);
    let ids: HashSet<_> = snapshot.rows.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids.len(), snapshot.rows.len());
}

#[tokio::test]
async fn test_stale_sweep_never_overwrites_newer_view() {
    let repo = seeded_repo(vec![
        support::facility_in("us", "USA", 40.0, -100.0, 500.0),
        support::facility_in("fr", "FRA", 46.0, 2.0, 900.0),
    ]);
    let fetcher = Arc::new(ScriptedFetcher::new(shared(repo)).holding("USA"));
    let view = Arc::new(MapView::new(fetcher.clone(), &MapConfig::default()).unwrap());

    let slow_view = view.clone();
    let slow = tokio::spawn(async move {
        slow_view
            .set_viewport(None, FacilityFilter::default().with_country("USA"))
            .await
    });
    fetcher.entered.notified().await;

    let fast = view
        .set_viewport(None, FacilityFilter::default().with_country("FRA"))
        .await;
    let ViewUpdate::Rendered(state) = fast else {
        panic!("newer sweep should render");
    };
    assert_eq!(state.generation, 2);

    fetcher.release.notify_one();
    let stale = slow.await.unwrap();
    assert_eq!(stale, ViewUpdate::Superseded);

    let current = view.current().unwrap();
    assert_eq!(current.generation, 2);
    let ids: Vec<_> = current
        .glyphs
        .iter()
        .flat_map(|g| g.members())
        .filter_map(|r| r.id.clone())
        .collect();
    assert_eq!(ids, vec!["fr"]);
    assert_eq!(view.sweeps().committed().unwrap().generation, 2);
}

#[tokio::test]
async fn test_failure_retains_last_good_state_and_retry_recovers() {
    let repo = seeded_repo(global_grid(300));
    let fetcher = Arc::new(ScriptedFetcher::new(shared(repo)));
    let config = MapConfig {
        page_limit: 100,
        ..MapConfig::default()
    };
    let view = MapView::new(fetcher.clone(), &config).unwrap();

    let ViewUpdate::Rendered(good) = view.set_viewport(None, FacilityFilter::default()).await
    else {
        panic!("first sweep should render");
    };
    assert_eq!(good.available, 300);

    *fetcher.fail.lock() = true;
    let europe = ViewportBounds::new(-10.0, 35.0, 30.0, 60.0).unwrap();
    let update = view
        .set_viewport(Some(europe), FacilityFilter::default())
        .await;
    let ViewUpdate::Failed { error, retained } = update else {
        panic!("sweep should fail");
    };
    assert!(error.is_retryable());
    assert_eq!(error.offset, 0);
    assert_eq!(retained, Some(good.clone()));
    assert_eq!(view.current(), Some(good));
    assert!(view.last_error().is_some());

    *fetcher.fail.lock() = false;
    let Some(ViewUpdate::Rendered(recovered)) = view.retry().await else {
        panic!("retry should render");
    };
    assert_eq!(recovered.bounds, Some(europe));
    assert_eq!(recovered.generation, 2);
    assert!(view.last_error().is_none());
}

#[tokio::test]
async fn test_retry_targets_only_latest_failure() {
    let repo = seeded_repo(global_grid(10));
    let fetcher = Arc::new(ScriptedFetcher::new(shared(repo)));
    let view = MapView::new(fetcher.clone(), &MapConfig::default()).unwrap();

    *fetcher.fail.lock() = true;
    assert!(matches!(
        view.set_viewport(None, FacilityFilter::default()).await,
        ViewUpdate::Failed { .. }
    ));
    assert!(matches!(
        view.set_viewport(None, FacilityFilter::default()).await,
        ViewUpdate::Failed { .. }
    ));

    *fetcher.fail.lock() = false;
    let requests_before = fetcher.offsets().len();
    assert!(view.retry().await.is_some());
    assert_eq!(fetcher.offsets().len(), requests_before + 1);
    assert_eq!(view.current().unwrap().generation, 2);
}

#[tokio::test]
async fn test_empty_viewport_renders_no_data_state() {
    let repo = seeded_repo(vec![facility("a", 10.0, 10.0, 50.0, PrimaryFuel::Hydro)]);
    let fetcher = Arc::new(RepositoryPageFetcher::new(shared(repo)));
    let view = MapView::new(fetcher, &MapConfig::default()).unwrap();

    let arctic = ViewportBounds::new(-20.0, 70.0, 20.0, 80.0).unwrap();
    let ViewUpdate::Rendered(state) = view
        .set_viewport(Some(arctic), FacilityFilter::default())
        .await
    else {
        panic!("empty sweep should still render");
    };
    assert_eq!(state.status, RenderStatus::Empty);
    assert!(state.glyphs.is_empty());
}
