//! QueryLens: result-list controller for slow-query and statement telemetry.
//!
//! The workspace is split into:
//!
//! * [`core`]: configuration, error types, logging and JSON helpers
//! * [`protocol`]: query/order options, list requests and row records
//! * [`controller`]: URL state codec, query cache, column stores and the
//!   per-view [`ResultController`](controller::ResultController)
//! * [`client`]: HTTP data sources for the diagnostics API

pub use querylens_client as client;
pub use querylens_controller as controller;
pub use querylens_core as core;
pub use querylens_protocol as protocol;

pub use querylens_controller::{
    DataSource, MemoryParamStore, QueryCache, ResultController, UrlParamStore, UrlStateCodec,
    ViewConfig,
};
pub use querylens_core::{CoreConfig, QueryLensError};

/// Wires a controller to the HTTP slow-query source using `config`.
pub fn slow_query_controller<P: controller::ParamStore>(
    config: &CoreConfig,
    params: P,
) -> Result<ResultController<client::SlowQuerySource, P>, client::ClientError> {
    let source = client::SlowQuerySource::new(client::ApiClient::from_config(config)?);
    let view = ViewConfig::slow_queries().with_core_config(config);
    Ok(ResultController::new(source, params, view)
        .with_cache(QueryCache::from_capacity(config.cache_capacity)))
}

/// Wires a controller to the HTTP statement source using `config`.
pub fn statement_controller<P: controller::ParamStore>(
    config: &CoreConfig,
    params: P,
) -> Result<ResultController<client::StatementSource, P>, client::ClientError> {
    let source = client::StatementSource::new(client::ApiClient::from_config(config)?);
    let view = ViewConfig::statements().with_core_config(config);
    Ok(ResultController::new(source, params, view)
        .with_cache(QueryCache::from_capacity(config.cache_capacity)))
}
