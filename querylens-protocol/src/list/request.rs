use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::{OrderOptions, QueryOptions};

/// Fully resolved list call handed to a data source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListRequest {
    pub begin_time: i64,
    pub end_time: i64,
    pub dbs: Vec<String>,
    pub groups: Vec<String>,
    pub kinds: Vec<String>,
    pub term: String,
    pub digest: Option<String>,
    pub plans: Vec<String>,
    /// Output fields to select; empty means the backend's default set.
    pub fields: Vec<String>,
    pub limit: u32,
    /// Only set for views whose backend performs the ordering.
    pub order_by: Option<String>,
    pub desc: bool,
}

impl ListRequest {
    /// Builds a request from view state, resolving the time range against `now`.
    pub fn from_options(
        query: &QueryOptions,
        order: Option<&OrderOptions>,
        fields: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let range = query.time_range.resolve(now);
        Self {
            begin_time: range.begin,
            end_time: range.end,
            dbs: query.dbs.iter().cloned().collect(),
            groups: query.groups.iter().cloned().collect(),
            kinds: query.kinds.iter().cloned().collect(),
            term: query.term.trim().to_string(),
            digest: query.digest.clone().filter(|digest| !digest.is_empty()),
            plans: query.plans.iter().cloned().collect(),
            fields: fields.to_vec(),
            limit: query.limit,
            order_by: order.map(|order| order.column.clone()),
            desc: order.map(|order| order.desc).unwrap_or(true),
        }
    }
}

/// Categorical filters whose candidate values come from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Databases,
    ResourceGroups,
    StatementKinds,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Databases => "databases",
            FilterKind::ResourceGroups => "resource_groups",
            FilterKind::StatementKinds => "statement_kinds",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
