use url::Url;

use crate::url_state::{apply_updates, ParamUpdates, QueryParams};

/// Where a view keeps its serialized state.
pub trait ParamStore: Send + 'static {
    fn read(&self) -> QueryParams;
    fn write(&mut self, updates: ParamUpdates);
    /// Drops every stored parameter.
    fn clear(&mut self);
}

/// Address-bar backed store: state lives in the query of a page URL.
///
/// Keys the codec does not own (tabs, feature flags, ...) are preserved on
/// every write.
#[derive(Debug, Clone)]
pub struct UrlParamStore {
    url: Url,
}

impl UrlParamStore {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Url::parse(raw).map(Self::new)
    }

    /// Current URL, suitable for copy/paste sharing.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn replace_query(&mut self, params: &QueryParams) {
        if params.is_empty() {
            self.url.set_query(None);
        } else {
            self.url
                .query_pairs_mut()
                .clear()
                .extend_pairs(params.iter());
        }
    }
}

impl ParamStore for UrlParamStore {
    fn read(&self) -> QueryParams {
        self.url.query_pairs().into_owned().collect()
    }

    fn write(&mut self, updates: ParamUpdates) {
        let mut params = self.read();
        apply_updates(&mut params, updates);
        self.replace_query(&params);
    }

    fn clear(&mut self) {
        self.url.set_query(None);
    }
}

/// Component-local store for views that do not mirror state into the URL.
#[derive(Debug, Clone, Default)]
pub struct MemoryParamStore {
    params: QueryParams,
}

impl MemoryParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: QueryParams) -> Self {
        Self { params }
    }
}

impl ParamStore for MemoryParamStore {
    fn read(&self) -> QueryParams {
        self.params.clone()
    }

    fn write(&mut self, updates: ParamUpdates) {
        apply_updates(&mut self.params, updates);
    }

    fn clear(&mut self) {
        self.params.clear();
    }
}
