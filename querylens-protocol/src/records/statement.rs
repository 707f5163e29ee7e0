use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Aggregated statistics for one statement digest over a summary window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_sample_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stmt_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_count: Option<i64>,
    // Latencies are nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum_latency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_latency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_mem: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mem: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum_errors: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum_warnings: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_begin_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_schemas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
