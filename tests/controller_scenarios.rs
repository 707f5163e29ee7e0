// Cross-crate scenarios: URL state, cache and data source behaving as one list view.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use querylens::controller::url_state::{apply_updates, parse_query_string, to_query_string, QueryParams};
use querylens::controller::{
    ColumnVisibilityStore, LoadStatus, LocalStorage, SourceError, StatePatch, UrlState,
};
use querylens::protocol::list::{FilterKind, ListRequest, OrderOptions, QueryOptions, TimeRange};
use querylens::protocol::records::SlowQueryRecord;
use querylens::{
    CoreConfig, DataSource, MemoryParamStore, QueryCache, ResultController, UrlParamStore,
    UrlStateCodec, ViewConfig,
};
use serde_json::json;
use test_case::test_case;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Counts list calls and replays the same rows after an optional delay.
#[derive(Clone)]
struct CountingSource {
    rows: Vec<SlowQueryRecord>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl CountingSource {
    fn new(rows: Vec<SlowQueryRecord>) -> Self {
        Self {
            rows,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl DataSource for CountingSource {
    type Row = SlowQueryRecord;

    async fn list_results(&self, _request: &ListRequest) -> Result<Vec<SlowQueryRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.rows.clone())
    }

    async fn list_available_fields(&self) -> Result<Vec<String>, SourceError> {
        Ok(Vec::new())
    }

    async fn list_filter_values(&self, _kind: FilterKind) -> Result<Vec<String>, SourceError> {
        Ok(Vec::new())
    }

    async fn download_token(&self, _request: &ListRequest) -> Result<String, SourceError> {
        Err(SourceError::Unsupported("download".into()))
    }
}

fn fixture_rows() -> Vec<SlowQueryRecord> {
    vec![
        SlowQueryRecord {
            digest: Some("a".into()),
            timestamp: Some(1_700_000_300.0),
            ..Default::default()
        },
        SlowQueryRecord {
            digest: Some("b".into()),
            timestamp: Some(1_700_000_200.0),
            ..Default::default()
        },
        SlowQueryRecord {
            digest: Some("c".into()),
            timestamp: Some(1_700_000_100.0),
            ..Default::default()
        },
    ]
}

fn codec() -> UrlStateCodec {
    let view = ViewConfig::slow_queries();
    UrlStateCodec::new(view.default_query, view.default_order)
}

#[test_case(QueryOptions::default() ; "defaults")]
#[test_case(QueryOptions::default().with_time_range(TimeRange::recent(300)) ; "relative range")]
#[test_case(
    QueryOptions::default()
        .with_time_range(TimeRange::absolute(1_600_000_000, 1_600_086_400))
        .with_dbs(["app", "billing"])
        .with_groups(["rg_oltp"])
        .with_term("where id = 1 & name = 'x'")
        .with_limit(250)
        .with_digest("abc123")
    ; "every filter"
)]
fn url_round_trip(query: QueryOptions) {
    let codec = codec();
    let state = UrlState {
        query,
        order: OrderOptions::ascending("query_time"),
        page: 0,
    };
    let mut params = QueryParams::new();
    apply_updates(&mut params, codec.encode_state(&state));

    let reparsed = parse_query_string(&to_query_string(&params));
    assert_eq!(codec.decode(&reparsed), state);
}

#[test]
fn lenient_defaults() {
    let state = codec().decode(&parse_query_string("limit=not-a-number&from=x&to=y"));
    assert_eq!(state.query.limit, 100);
    assert_eq!(state.query.time_range, TimeRange::recent(1800));
    assert_eq!(state.order, OrderOptions::descending("timestamp"));
}

#[tokio::test]
async fn end_to_end_fixture_scenario() {
    let source = CountingSource::new(fixture_rows());
    let controller =
        ResultController::new(source, MemoryParamStore::new(), ViewConfig::slow_queries());

    controller
        .set_query_options(QueryOptions::default().with_time_range(TimeRange::recent(1800)))
        .await;

    let snapshot = controller.snapshot();
    assert!(!snapshot.is_loading);
    assert!(snapshot.errors.is_empty());
    assert_eq!(snapshot.order, OrderOptions::descending("timestamp"));
    let digests: Vec<String> = snapshot
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| row.digest)
        .collect();
    assert_eq!(digests, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn cache_is_shared_between_controllers_of_a_session() {
    let source = Arc::new(CountingSource::new(fixture_rows()));
    let calls = source.calls.clone();
    let cache = QueryCache::new();

    let first = ResultController::with_source(
        source.clone(),
        MemoryParamStore::new(),
        ViewConfig::slow_queries(),
    )
    .with_cache(cache.clone());
    let second =
        ResultController::with_source(source, MemoryParamStore::new(), ViewConfig::slow_queries())
            .with_cache(cache);

    first.load().await;
    second.load().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    second.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(first.snapshot().data.map(|rows| rows.len()), Some(3));
}

#[tokio::test(start_paused = true)]
async fn slow_threshold_boundary() {
    let slow = ResultController::new(
        CountingSource::new(fixture_rows()).with_delay(Duration::from_millis(2100)),
        MemoryParamStore::new(),
        ViewConfig::slow_queries(),
    );
    let fast = ResultController::new(
        CountingSource::new(fixture_rows()).with_delay(Duration::from_millis(100)),
        MemoryParamStore::new(),
        ViewConfig::slow_queries(),
    );

    assert_eq!(slow.snapshot().is_data_loaded_slowly, None);
    tokio::join!(slow.load(), fast.load());

    assert_eq!(slow.snapshot().is_data_loaded_slowly, Some(true));
    assert_eq!(fast.snapshot().is_data_loaded_slowly, Some(false));
}

#[tokio::test]
async fn url_backed_view_keeps_foreign_parameters() {
    let params = UrlParamStore::parse("https://dashboard.local/slow_query?tab=2&page=3&dbs=x")
        .unwrap();
    let controller = ResultController::new(
        CountingSource::new(fixture_rows()),
        params,
        ViewConfig::slow_queries(),
    );
    assert_eq!(controller.page(), 3);

    controller.apply(StatePatch::default().with_dbs(["db1"])).await;

    let url = controller.with_param_store(|store| store.url().clone());
    let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs.get("tab").map(String::as_str), Some("2"));
    assert_eq!(pairs.get("dbs").map(String::as_str), Some("db1"));
    assert!(!pairs.contains_key("page"));
    assert_eq!(controller.page(), 0);
}

#[tokio::test]
async fn persisted_columns_drive_the_controller() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::open(dir.path()).unwrap();
    let view = ViewConfig::slow_queries();
    let store = ColumnVisibilityStore::new(storage.clone(), &view.key, view.default_columns.clone());
    store.toggle("memory_max", false).unwrap();

    // A new session reads the same choice back.
    let reopened = ColumnVisibilityStore::new(storage, &view.key, view.default_columns.clone());
    let controller = ResultController::new(
        CountingSource::new(fixture_rows()),
        MemoryParamStore::new(),
        view,
    )
    .with_visible_columns(&reopened.get());

    assert!(!controller.visible_columns().contains(&"memory_max".to_string()));
    assert!(!controller.change_order("memory_max", true).await);
}

#[tokio::test]
async fn http_controller_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/slow_query/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"digest": "a", "timestamp": 3.0},
            {"digest": "b", "timestamp": 2.0}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let api_url = format!("{}/api", server.uri());
    let storage_dir = dir.path().display().to_string();
    let config = CoreConfig::from_lookup("QUERYLENS_", |key| match key {
        "QUERYLENS_API_URL" => Some(api_url.clone()),
        "QUERYLENS_STORAGE_DIR" => Some(storage_dir.clone()),
        "QUERYLENS_CACHE_CAPACITY" => Some("4".into()),
        _ => None,
    })
    .unwrap();

    let controller = querylens::slow_query_controller(&config, MemoryParamStore::new()).unwrap();
    assert_eq!(controller.cache().capacity(), Some(4));

    controller.load().await;
    controller.load().await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, LoadStatus::Loaded);
    assert_eq!(snapshot.data.map(|rows| rows.len()), Some(2));
}
