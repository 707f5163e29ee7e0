use std::cmp::Ordering;
use std::time::Duration;

use querylens_core::config::{CoreConfig, DEFAULT_SLOW_THRESHOLD_MS};
use querylens_protocol::list::{OrderOptions, QueryOptions};
use querylens_protocol::records::Record;
use serde_json::Value;

/// Who orders the rows of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingPolicy {
    /// The backend sorts; order changes refetch with `order_by`/`desc`.
    Server,
    /// The backend returns an unsorted, limited set; order and page changes
    /// only recompute a local view of the rows already fetched.
    Client,
}

/// What to do with a response that resolves after a newer request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleResponsePolicy {
    /// Drop responses to superseded requests.
    #[default]
    LatestIssued,
    /// Whichever response resolves last wins.
    LastResolved,
}

/// Static description of one list view.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Namespace for local storage keys.
    pub key: String,
    pub default_query: QueryOptions,
    pub default_order: OrderOptions,
    pub ordering: OrderingPolicy,
    pub stale_responses: StaleResponsePolicy,
    /// Columns visible before the user customizes anything.
    pub default_columns: Vec<String>,
    /// Fields requested on every fetch whether shown or not.
    pub required_fields: Vec<String>,
    pub page_size: usize,
    pub slow_threshold: Duration,
}

impl ViewConfig {
    pub fn new(key: impl Into<String>, default_order: OrderOptions, ordering: OrderingPolicy) -> Self {
        Self {
            key: key.into(),
            default_query: QueryOptions::default(),
            default_order,
            ordering,
            stale_responses: StaleResponsePolicy::default(),
            default_columns: Vec::new(),
            required_fields: Vec::new(),
            page_size: 20,
            slow_threshold: Duration::from_millis(DEFAULT_SLOW_THRESHOLD_MS),
        }
    }

    /// Slow-query list: newest first, ordered by the backend.
    pub fn slow_queries() -> Self {
        Self::new(
            "slow_query",
            OrderOptions::descending("timestamp"),
            OrderingPolicy::Server,
        )
        .with_default_columns(["query", "timestamp", "query_time", "memory_max"])
        .with_required_fields(["digest", "connection_id", "instance", "timestamp"])
    }

    /// Statement list: heaviest total latency first, ordered locally.
    pub fn statements() -> Self {
        Self::new(
            "statement",
            OrderOptions::descending("sum_latency"),
            OrderingPolicy::Client,
        )
        .with_default_columns([
            "digest_text",
            "sum_latency",
            "avg_latency",
            "exec_count",
            "avg_mem",
            "related_schemas",
        ])
        .with_required_fields(["digest", "schema_name"])
    }

    pub fn with_default_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn with_stale_responses(mut self, policy: StaleResponsePolicy) -> Self {
        self.stale_responses = policy;
        self
    }

    /// Applies the process-wide slow threshold and default limit.
    pub fn with_core_config(mut self, config: &CoreConfig) -> Self {
        self.slow_threshold = config.slow_threshold;
        self.default_query.limit = config.default_limit;
        self
    }
}

/// Returns a copy of `rows` ordered by `order`.
///
/// The sort is stable and rows without a value for the column always go last,
/// whichever the direction.
pub fn sort_rows<R: Record>(rows: &[R], order: &OrderOptions) -> Vec<R> {
    let mut keyed: Vec<(Option<Value>, &R)> = rows
        .iter()
        .map(|row| (row.field_value(&order.column), row))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b);
            if order.desc {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, row)| row.clone()).collect()
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Rows of the zero-based `page`; empty past the end.
pub fn paginate<R: Clone>(rows: &[R], page: usize, page_size: usize) -> Vec<R> {
    let page_size = page_size.max(1);
    rows.iter()
        .skip(page.saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect()
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use querylens_protocol::records::StatementRecord;

    fn stmt(digest: &str, sum_latency: Option<i64>) -> StatementRecord {
        StatementRecord {
            digest: Some(digest.into()),
            sum_latency,
            ..Default::default()
        }
    }

    fn digests(rows: &[StatementRecord]) -> Vec<&str> {
        rows.iter()
            .map(|row| row.digest.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn sorts_numbers_descending_with_missing_last() {
        let rows = vec![
            stmt("a", Some(10)),
            stmt("b", None),
            stmt("c", Some(30)),
            stmt("d", Some(20)),
        ];
        let sorted = sort_rows(&rows, &OrderOptions::descending("sum_latency"));
        assert_eq!(digests(&sorted), vec!["c", "d", "a", "b"]);

        let sorted = sort_rows(&rows, &OrderOptions::ascending("sum_latency"));
        assert_eq!(digests(&sorted), vec!["a", "d", "c", "b"]);
    }

    #[test]
    fn sort_is_stable_and_does_not_touch_input() {
        let rows = vec![stmt("x", Some(1)), stmt("y", Some(1)), stmt("z", Some(0))];
        let sorted = sort_rows(&rows, &OrderOptions::descending("sum_latency"));
        assert_eq!(digests(&sorted), vec!["x", "y", "z"]);
        assert_eq!(digests(&rows), vec!["x", "y", "z"]);
    }

    #[test]
    fn sorts_strings_lexicographically() {
        let rows = vec![stmt("b", None), stmt("a", None), stmt("c", None)];
        let sorted = sort_rows(&rows, &OrderOptions::ascending("digest"));
        assert_eq!(digests(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn paginates_with_partial_last_page() {
        let rows: Vec<u32> = (0..25).collect();
        assert_eq!(paginate(&rows, 0, 10), (0..10).collect::<Vec<_>>());
        assert_eq!(paginate(&rows, 2, 10), (20..25).collect::<Vec<_>>());
        assert!(paginate(&rows, 3, 10).is_empty());
        assert_eq!(page_count(rows.len(), 10), 3);
        assert_eq!(page_count(0, 10), 0);
    }

    #[test]
    fn presets_carry_their_ordering_policy() {
        assert_eq!(ViewConfig::slow_queries().ordering, OrderingPolicy::Server);
        assert_eq!(ViewConfig::statements().ordering, OrderingPolicy::Client);
        assert_eq!(
            ViewConfig::slow_queries().default_order,
            OrderOptions::descending("timestamp")
        );
    }
}
