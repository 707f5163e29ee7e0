use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use querylens_core::serde_utils::to_canonical_json;
use querylens_protocol::list::{OrderOptions, QueryOptions};
use serde::Serialize;

/// Memoized result of one list fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<R> {
    pub data: Vec<R>,
    pub is_data_loaded_slowly: bool,
}

struct CacheInner<R> {
    entries: HashMap<String, CacheEntry<R>>,
    /// Keys from oldest to newest write, used for capacity eviction.
    order: VecDeque<String>,
}

impl<R> Default for CacheInner<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }
}

/// Session-scoped key/value memo of list results.
///
/// No freshness checks happen here; callers key by every input that affects
/// the result and call [`remove`](Self::remove) or [`clear`](Self::clear) on
/// refresh. Reads hand out clones, so rows handed to a renderer can never
/// alter the cached copy. Clones of the cache share storage.
#[derive(Clone)]
pub struct QueryCache<R> {
    inner: Arc<RwLock<CacheInner<R>>>,
    capacity: Option<usize>,
}

impl<R: Clone> QueryCache<R> {
    /// Unbounded cache that lives as long as its last handle.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::default())),
            capacity: None,
        }
    }

    /// Cache holding at most `capacity` entries (minimum one); the oldest write
    /// is evicted first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::default())),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<R>> {
        self.inner.read().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: CacheEntry<R>) {
        let key = key.into();
        let mut inner = self.inner.write();

        inner.order.retain(|existing| existing != &key);
        inner.order.push_back(key.clone());
        inner.entries.insert(key, value);

        if let Some(capacity) = self.capacity {
            while inner.entries.len() > capacity {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    /// Removes one entry, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        inner.order.retain(|existing| existing != key);
        inner.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Clone> Default for QueryCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct KeyParts<'a> {
    view: &'a str,
    query: &'a QueryOptions,
    order: Option<&'a OrderOptions>,
    fields: &'a [String],
}

/// Canonical cache key for a list fetch.
///
/// `view` keeps views that share one cache apart. Relative time ranges are keyed by their duration, not by resolved bounds,
/// so revisiting "last 30 minutes" hits the memo until it is refreshed.
pub fn cache_key(
    view: &str,
    query: &QueryOptions,
    order: Option<&OrderOptions>,
    fields: &[String],
) -> String {
    let parts = KeyParts {
        view,
        query,
        order,
        fields,
    };
    to_canonical_json(&parts).unwrap_or_else(|_| format!("{view}|{query:?}|{order:?}|{fields:?}"))
}
