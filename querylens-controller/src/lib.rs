//! QueryLens controller: keeps a list view's filters in URL form, memoizes
//! fetched result sets, and drives an injected [`DataSource`].

pub mod cache;
pub mod columns;
pub mod controller;
pub mod error;
pub mod params;
pub mod source;
pub mod storage;
pub mod url_state;
pub mod view;

pub use cache::{cache_key, CacheEntry, QueryCache};
pub use columns::{
    available_columns, visible_columns, ColumnDescriptor, ColumnVisibility, ColumnVisibilityStore,
    PreferenceStore,
};
pub use controller::{ControllerSnapshot, LoadStatus, ResultController};
pub use error::{SourceError, StorageError};
pub use params::{MemoryParamStore, ParamStore, UrlParamStore};
pub use source::DataSource;
pub use storage::{LocalStorage, VersionedStore};
pub use url_state::{StatePatch, UrlState, UrlStateCodec};
pub use view::{OrderingPolicy, StaleResponsePolicy, ViewConfig};
