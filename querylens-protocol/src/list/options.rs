use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::time_range::TimeRange;

/// Result-count limit applied when none is requested.
pub const DEFAULT_LIMIT: u32 = 100;

/// Filter and search state of one list view.
///
/// Sets are ordered so that two equal option values always serialize to the
/// same JSON, which keeps cache keys stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub time_range: TimeRange,
    #[serde(default)]
    pub dbs: BTreeSet<String>,
    /// Resource-group filters.
    #[serde(default)]
    pub groups: BTreeSet<String>,
    /// Statement-kind filters (`Select`, `Insert`, ...).
    #[serde(default)]
    pub kinds: BTreeSet<String>,
    #[serde(default)]
    pub term: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Fixed digest, set when a list is opened from a detail link.
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub plans: BTreeSet<String>,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            dbs: BTreeSet::new(),
            groups: BTreeSet::new(),
            kinds: BTreeSet::new(),
            term: String::new(),
            limit: DEFAULT_LIMIT,
            digest: None,
            plans: BTreeSet::new(),
        }
    }
}

impl QueryOptions {
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn with_dbs<I, S>(mut self, dbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dbs = dbs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn with_plans<I, S>(mut self, plans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plans = plans.into_iter().map(Into::into).collect();
        self
    }
}

/// Sort state of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderOptions {
    pub column: String,
    pub desc: bool,
}

impl OrderOptions {
    pub fn new(column: impl Into<String>, desc: bool) -> Self {
        Self {
            column: column.into(),
            desc,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self::new(column, true)
    }

    pub fn ascending(column: impl Into<String>) -> Self {
        Self::new(column, false)
    }

    /// Parses a signed token: `-column` is descending, `column` ascending.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        let (column, desc) = match token.strip_prefix('-') {
            Some(rest) => (rest.trim(), true),
            None => (token, false),
        };
        if column.is_empty() {
            return None;
        }
        Some(Self::new(column, desc))
    }

    pub fn to_token(&self) -> String {
        if self.desc {
            format!("-{}", self.column)
        } else {
            self.column.clone()
        }
    }
}

impl fmt::Display for OrderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.column,
            if self.desc { "desc" } else { "asc" }
        )
    }
}
