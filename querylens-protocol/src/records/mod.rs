mod slow_query;
mod statement;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use slow_query::SlowQueryRecord;
pub use statement::StatementRecord;

/// Row type rendered by a list view.
///
/// Field access goes through the row's JSON form so that sorting and column
/// discovery work for any column the backend returns, including ones the
/// typed struct does not name.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// JSON snapshot of the row; `Value::Null` if it cannot be serialized.
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Value of a single column, `None` when absent or null.
    fn field_value(&self, column: &str) -> Option<Value> {
        match self.snapshot() {
            Value::Object(mut map) => map.remove(column).filter(|value| !value.is_null()),
            _ => None,
        }
    }

    /// Names of the non-null columns this row carries.
    fn field_names(&self) -> Vec<String> {
        match self.snapshot() {
            Value::Object(map) => map
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, _)| key)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Record for SlowQueryRecord {}
impl Record for StatementRecord {}
