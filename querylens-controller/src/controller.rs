use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use querylens_protocol::list::{FilterKind, ListRequest, OrderOptions, QueryOptions};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, CacheEntry, QueryCache};
use crate::columns::{available_columns, visible_columns, ColumnDescriptor, ColumnVisibility};
use crate::params::ParamStore;
use crate::source::DataSource;
use crate::url_state::{to_query_string, StatePatch, UrlState, UrlStateCodec};
use crate::view::{page_count, paginate, sort_rows, OrderingPolicy, StaleResponsePolicy, ViewConfig};

/// Where a controller is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// No query issued yet.
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// Read-only view of a controller, handed to whatever renders the list.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot<R> {
    pub status: LoadStatus,
    /// `None` until the first successful load.
    pub data: Option<Vec<R>>,
    pub is_loading: bool,
    pub errors: Vec<String>,
    /// `None` while a request is in flight or before any request completed.
    pub is_data_loaded_slowly: Option<bool>,
    pub query: QueryOptions,
    pub order: OrderOptions,
    pub page: usize,
}

impl<R> ControllerSnapshot<R> {
    /// Loaded successfully but matched nothing.
    pub fn is_empty_result(&self) -> bool {
        !self.is_loading && matches!(&self.data, Some(rows) if rows.is_empty())
    }
}

struct ControllerState<R> {
    status: LoadStatus,
    data: Option<Vec<R>>,
    errors: Vec<String>,
    is_data_loaded_slowly: Option<bool>,
    visible_columns: Vec<String>,
    available_fields: Option<Vec<String>>,
    /// Sequence number of the most recently issued load.
    latest_seq: u64,
}

/// Per-view orchestrator tying URL state, the query cache and a data source
/// together.
///
/// Every method takes `&self`; state lives behind locks that are released
/// before any call into the data source. Fetch failures never escape: they
/// land in [`ControllerSnapshot::errors`].
pub struct ResultController<S: DataSource, P: ParamStore> {
    source: Arc<S>,
    params: Mutex<P>,
    codec: UrlStateCodec,
    view: ViewConfig,
    cache: QueryCache<S::Row>,
    state: RwLock<ControllerState<S::Row>>,
    seq: AtomicU64,
}

impl<S: DataSource, P: ParamStore> ResultController<S, P> {
    pub fn new(source: S, params: P, view: ViewConfig) -> Self {
        Self::with_source(Arc::new(source), params, view)
    }

    pub fn with_source(source: Arc<S>, params: P, view: ViewConfig) -> Self {
        let codec = UrlStateCodec::new(view.default_query.clone(), view.default_order.clone());
        let state = ControllerState {
            status: LoadStatus::Idle,
            data: None,
            errors: Vec::new(),
            is_data_loaded_slowly: None,
            visible_columns: view.default_columns.clone(),
            available_fields: None,
            latest_seq: 0,
        };
        Self {
            source,
            params: Mutex::new(params),
            codec,
            cache: QueryCache::new(),
            state: RwLock::new(state),
            seq: AtomicU64::new(0),
            view,
        }
    }

    /// Shares `cache` with other controllers of the same session.
    pub fn with_cache(mut self, cache: QueryCache<S::Row>) -> Self {
        self.cache = cache;
        self
    }

    /// Starts from a persisted column choice instead of the view defaults.
    pub fn with_visible_columns(self, visibility: &ColumnVisibility) -> Self {
        self.state.write().visible_columns = visible_columns(visibility);
        self
    }

    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    pub fn cache(&self) -> &QueryCache<S::Row> {
        &self.cache
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn codec(&self) -> &UrlStateCodec {
        &self.codec
    }

    /// Runs `f` against the param store, e.g. to read back a shareable URL.
    pub fn with_param_store<T>(&self, f: impl FnOnce(&P) -> T) -> T {
        f(&self.params.lock())
    }

    pub fn url_state(&self) -> UrlState {
        let params = self.params.lock().read();
        self.codec.decode(&params)
    }

    pub fn query_options(&self) -> QueryOptions {
        self.url_state().query
    }

    pub fn order_options(&self) -> OrderOptions {
        self.url_state().order
    }

    pub fn page(&self) -> usize {
        self.url_state().page
    }

    /// Current state as a query string, without the leading `?`.
    pub fn query_string(&self) -> String {
        to_query_string(&self.params.lock().read())
    }

    pub fn visible_columns(&self) -> Vec<String> {
        self.state.read().visible_columns.clone()
    }

    /// Writes a partial state change and loads if the change can alter the
    /// result set.
    pub async fn apply(&self, patch: StatePatch) {
        let refetch = patch.touches_filters()
            || (patch.order.is_some() && self.view.ordering == OrderingPolicy::Server);
        self.stage(&patch);
        if refetch {
            self.load().await;
        }
    }

    /// Replaces every filter. Always returns to the first page.
    pub async fn set_query_options(&self, next: QueryOptions) {
        self.apply(StatePatch::from_query(&next)).await;
    }

    /// Sorts by `column`. Columns that are not visible are rejected and
    /// `false` is returned.
    pub async fn change_order(&self, column: &str, desc: bool) -> bool {
        if !self.is_visible(column) {
            debug!(view = %self.view.key, column, "ignoring order on hidden column");
            return false;
        }
        self.apply(StatePatch::order(OrderOptions::new(column, desc)))
            .await;
        true
    }

    pub async fn reset_order(&self) {
        self.apply(StatePatch::order(self.view.default_order.clone()))
            .await;
    }

    /// Moves to another page of the current rows. Never fetches.
    pub fn set_page(&self, page: usize) {
        self.stage(&StatePatch::page(page));
    }

    /// Clears every filter, keeps the sort, and reloads.
    pub async fn reset_filters(&self) {
        self.apply(StatePatch::reset()).await;
    }

    /// Forgets all view state including sort and drops the whole cache.
    pub async fn reset_all(&self) {
        self.params.lock().clear();
        self.cache.clear();
        self.load().await;
    }

    /// Drops the memo for the current key and fetches again.
    pub async fn refresh(&self) {
        let key = self.current_key();
        if self.cache.remove(&key) {
            debug!(view = %self.view.key, "invalidated cached result");
        }
        self.load().await;
    }

    /// Adopts a cached result for the current state or fetches it.
    pub async fn load(&self) {
        let url_state = self.settled_state();
        let order = self.request_order(&url_state.order);
        let fields = self.request_fields();
        let key = cache_key(&self.view.key, &url_state.query, order.as_ref(), &fields);

        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(entry) = self.cache.get(&key) {
            debug!(view = %self.view.key, "serving result from cache");
            let mut state = self.state.write();
            state.latest_seq = seq;
            state.status = LoadStatus::Loaded;
            state.is_data_loaded_slowly = Some(entry.is_data_loaded_slowly);
            state.data = Some(entry.data);
            return;
        }

        {
            let mut state = self.state.write();
            state.latest_seq = seq;
            state.status = LoadStatus::Loading;
            state.is_data_loaded_slowly = None;
        }

        let request =
            ListRequest::from_options(&url_state.query, order.as_ref(), &fields, Utc::now());
        debug!(
            view = %self.view.key,
            seq,
            begin_time = request.begin_time,
            end_time = request.end_time,
            limit = request.limit,
            "fetching results"
        );

        let started = Instant::now();
        let result = self.source.list_results(&request).await;
        let elapsed = started.elapsed();
        let is_slow = elapsed > self.view.slow_threshold;

        if let Ok(rows) = &result {
            self.cache.set(
                key,
                CacheEntry {
                    data: rows.clone(),
                    is_data_loaded_slowly: is_slow,
                },
            );
        }

        let mut state = self.state.write();
        let is_latest = state.latest_seq == seq;
        if !is_latest && self.view.stale_responses == StaleResponsePolicy::LatestIssued {
            debug!(view = %self.view.key, seq, latest = state.latest_seq, "discarding superseded response");
            return;
        }

        match result {
            Ok(rows) => {
                if is_slow {
                    info!(view = %self.view.key, elapsed_ms = elapsed.as_millis() as u64, "results loaded slowly");
                }
                state.errors.clear();
                state.data = Some(rows);
                state.is_data_loaded_slowly = Some(is_slow);
                if is_latest {
                    state.status = LoadStatus::Loaded;
                }
            }
            Err(err) => {
                warn!(view = %self.view.key, %err, "failed to load results");
                state.errors.push(err.to_string());
                if is_latest {
                    state.status = LoadStatus::Errored;
                }
            }
        }
    }

    /// Fetches the backend's supported columns; the result prunes the fields
    /// requested from then on.
    pub async fn load_available_fields(&self) -> Option<Vec<String>> {
        match self.source.list_available_fields().await {
            Ok(fields) => {
                self.state.write().available_fields = Some(fields.clone());
                Some(fields)
            }
            Err(err) => {
                self.push_error("failed to load available fields", err.to_string());
                None
            }
        }
    }

    pub fn available_columns(&self) -> Vec<ColumnDescriptor> {
        let state = self.state.read();
        let rows = state.data.as_deref().unwrap_or_default();
        available_columns(rows, state.available_fields.as_deref())
    }

    pub async fn filter_values(&self, kind: FilterKind) -> Option<Vec<String>> {
        match self.source.list_filter_values(kind).await {
            Ok(values) => Some(values),
            Err(err) => {
                self.push_error("failed to load filter values", err.to_string());
                None
            }
        }
    }

    /// Token for downloading the current result set as CSV.
    pub async fn download_token(&self) -> Option<String> {
        let url_state = self.settled_state();
        let order = self.request_order(&url_state.order);
        let fields = self.request_fields();
        let request =
            ListRequest::from_options(&url_state.query, order.as_ref(), &fields, Utc::now());
        match self.source.download_token(&request).await {
            Ok(token) => Some(token),
            Err(err) => {
                self.push_error("failed to obtain download token", err.to_string());
                None
            }
        }
    }

    /// Applies a new column choice. A hidden sort column sends the order back
    /// to the view default before reloading.
    pub async fn apply_visible_columns(&self, visibility: &ColumnVisibility) {
        let columns = visible_columns(visibility);
        let order = self.order_options();
        let sort_hidden = !columns.iter().any(|column| column == &order.column);
        self.state.write().visible_columns = columns;

        if sort_hidden && order != self.view.default_order {
            info!(view = %self.view.key, column = %order.column, "sort column hidden, restoring default order");
            self.stage(&StatePatch::order(self.view.default_order.clone()));
        }
        self.load().await;
    }

    pub fn dismiss_errors(&self) {
        self.state.write().errors.clear();
    }

    pub fn snapshot(&self) -> ControllerSnapshot<S::Row> {
        let url_state = self.url_state();
        let state = self.state.read();
        ControllerSnapshot {
            status: state.status,
            data: state.data.clone(),
            is_loading: state.status == LoadStatus::Loading,
            errors: state.errors.clone(),
            is_data_loaded_slowly: state.is_data_loaded_slowly,
            query: url_state.query,
            order: url_state.order,
            page: url_state.page,
        }
    }

    /// Current rows in display order. Client-ordered views sort locally.
    pub fn view_rows(&self) -> Vec<S::Row> {
        let order = self.order_options();
        let state = self.state.read();
        let rows = state.data.as_deref().unwrap_or_default();
        match self.view.ordering {
            OrderingPolicy::Server => rows.to_vec(),
            OrderingPolicy::Client => sort_rows(rows, &order),
        }
    }

    /// Rows of the current page.
    pub fn page_rows(&self) -> Vec<S::Row> {
        paginate(&self.view_rows(), self.page(), self.view.page_size)
    }

    pub fn page_count(&self) -> usize {
        let total = self.state.read().data.as_ref().map_or(0, Vec::len);
        page_count(total, self.view.page_size)
    }

    /// Writes a patch to the param store without loading.
    pub fn stage(&self, patch: &StatePatch) {
        let updates = self.codec.encode(patch);
        self.params.lock().write(updates);
    }

    fn push_error(&self, context: &str, message: String) {
        warn!(view = %self.view.key, error = %message, "{context}");
        self.state.write().errors.push(message);
    }

    /// Sort sent to the backend; client-ordered views never send one.
    fn request_order(&self, order: &OrderOptions) -> Option<OrderOptions> {
        match self.view.ordering {
            OrderingPolicy::Server => Some(order.clone()),
            OrderingPolicy::Client => None,
        }
    }

    /// Visible plus required fields, pruned to the backend allowlist when known.
    fn request_fields(&self) -> Vec<String> {
        let state = self.state.read();
        let mut fields: Vec<String> = state
            .visible_columns
            .iter()
            .chain(self.view.required_fields.iter())
            .filter(|field| match &state.available_fields {
                Some(allowed) => allowed.contains(field),
                None => true,
            })
            .cloned()
            .collect();
        fields.sort();
        fields.dedup();
        fields
    }

    fn current_key(&self) -> String {
        let url_state = self.settled_state();
        let order = self.request_order(&url_state.order);
        cache_key(
            &self.view.key,
            &url_state.query,
            order.as_ref(),
            &self.request_fields(),
        )
    }

    fn is_visible(&self, column: &str) -> bool {
        self.state
            .read()
            .visible_columns
            .iter()
            .any(|visible| visible == column)
    }

    /// Decoded state with the sort forced onto a visible column. An order
    /// naming a hidden column (e.g. from a shared link) is replaced by the
    /// view default and written back to the param store.
    fn settled_state(&self) -> UrlState {
        let mut url_state = self.url_state();
        let default_order = &self.view.default_order;
        if url_state.order != *default_order && !self.is_visible(&url_state.order.column) {
            info!(
                view = %self.view.key,
                column = %url_state.order.column,
                "order names a hidden column, restoring default order"
            );
            self.stage(&StatePatch::order(default_order.clone()));
            url_state.order = default_order.clone();
        }
        url_state
    }
}
