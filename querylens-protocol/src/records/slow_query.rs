use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the slow-query log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlowQueryRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<i64>,
    /// Unix seconds with sub-second precision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_time: Option<f64>,
    /// Bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_start_ts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    /// Columns returned by the backend that have no typed field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;
    use serde_json::json;

    #[test]
    fn keeps_unknown_columns() {
        let record: SlowQueryRecord = serde_json::from_value(json!({
            "digest": "abc",
            "query_time": 2.5,
            "rocksdb_block_read_count": 12
        }))
        .unwrap();

        assert_eq!(record.query_time, Some(2.5));
        assert_eq!(
            record.field_value("rocksdb_block_read_count"),
            Some(json!(12))
        );
        let mut names = record.field_names();
        names.sort();
        assert_eq!(names, vec!["digest", "query_time", "rocksdb_block_read_count"]);
    }
}
