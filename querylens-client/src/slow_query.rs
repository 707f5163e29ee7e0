use async_trait::async_trait;
use querylens_controller::{DataSource, SourceError};
use querylens_protocol::list::{FilterKind, ListRequest};
use querylens_protocol::records::SlowQueryRecord;
use serde::Serialize;
use tracing::debug;

use crate::client::{push_list, push_non_empty, ApiClient, QueryPairs};
use crate::error::ClientError;
use crate::info::list_info_values;

/// Slow-query log endpoints. The backend orders rows by `orderBy`/`desc`.
#[derive(Clone)]
pub struct SlowQuerySource {
    client: ApiClient,
}

/// Request body shared by the list query string and the download token call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowQueryParams {
    pub begin_time: i64,
    pub end_time: i64,
    pub db: Vec<String>,
    pub resource_group: Vec<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub plans: Vec<String>,
    /// Comma-joined output fields.
    pub fields: String,
    pub limit: u32,
    #[serde(rename = "orderBy", skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    pub desc: bool,
}

impl From<&ListRequest> for SlowQueryParams {
    fn from(request: &ListRequest) -> Self {
        Self {
            begin_time: request.begin_time,
            end_time: request.end_time,
            db: request.dbs.clone(),
            resource_group: request.groups.clone(),
            text: request.term.clone(),
            digest: request.digest.clone(),
            plans: request.plans.clone(),
            fields: request.fields.join(","),
            limit: request.limit,
            order_by: request.order_by.clone(),
            desc: request.desc,
        }
    }
}

impl SlowQueryParams {
    pub fn to_pairs(&self) -> QueryPairs {
        let mut pairs = vec![
            ("begin_time".to_string(), self.begin_time.to_string()),
            ("end_time".to_string(), self.end_time.to_string()),
        ];
        push_list(&mut pairs, "db", &self.db);
        push_list(&mut pairs, "resource_group", &self.resource_group);
        push_non_empty(&mut pairs, "text", &self.text);
        if let Some(digest) = &self.digest {
            push_non_empty(&mut pairs, "digest", digest);
        }
        push_list(&mut pairs, "plans", &self.plans);
        push_non_empty(&mut pairs, "fields", &self.fields);
        pairs.push(("limit".to_string(), self.limit.to_string()));
        if let Some(order_by) = &self.order_by {
            pairs.push(("orderBy".to_string(), order_by.clone()));
        }
        pairs.push(("desc".to_string(), self.desc.to_string()));
        pairs
    }
}

impl SlowQuerySource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Exchanges a download token for the CSV body.
    pub async fn download(&self, token: &str) -> Result<Vec<u8>, ClientError> {
        let query = vec![("token".to_string(), token.to_string())];
        self.client.get_bytes("slow_query/download", &query).await
    }
}

#[async_trait]
impl DataSource for SlowQuerySource {
    type Row = SlowQueryRecord;

    async fn list_results(&self, request: &ListRequest) -> Result<Vec<SlowQueryRecord>, SourceError> {
        let params = SlowQueryParams::from(request);
        let rows: Vec<SlowQueryRecord> = self
            .client
            .get_json("slow_query/list", &params.to_pairs())
            .await?;
        debug!(rows = rows.len(), "slow queries listed");
        Ok(rows)
    }

    async fn list_available_fields(&self) -> Result<Vec<String>, SourceError> {
        Ok(self
            .client
            .get_json("slow_query/available_fields", &QueryPairs::new())
            .await?)
    }

    async fn list_filter_values(&self, kind: FilterKind) -> Result<Vec<String>, SourceError> {
        match kind {
            FilterKind::Databases | FilterKind::ResourceGroups => {
                Ok(list_info_values(&self.client, kind).await?)
            }
            FilterKind::StatementKinds => Err(SourceError::Unsupported(format!(
                "{kind} filter on slow queries"
            ))),
        }
    }

    async fn download_token(&self, request: &ListRequest) -> Result<String, SourceError> {
        let body = SlowQueryParams::from(request);
        Ok(self
            .client
            .post_json("slow_query/download/token", &body)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_follow_the_list_endpoint_shape() {
        let request = ListRequest {
            begin_time: 100,
            end_time: 200,
            dbs: vec!["app".into(), "billing".into()],
            term: "select".into(),
            fields: vec!["query".into(), "timestamp".into()],
            limit: 50,
            order_by: Some("timestamp".into()),
            desc: true,
            ..Default::default()
        };
        let pairs = SlowQueryParams::from(&request).to_pairs();
        let get = |key: &str| -> Vec<&str> {
            pairs
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .collect()
        };

        assert_eq!(get("db"), vec!["app", "billing"]);
        assert_eq!(get("fields"), vec!["query,timestamp"]);
        assert_eq!(get("orderBy"), vec!["timestamp"]);
        assert_eq!(get("desc"), vec!["true"]);
        assert!(get("digest").is_empty());
        assert!(get("resource_group").is_empty());
    }

    #[test]
    fn token_body_uses_camel_case_order_key() {
        let request = ListRequest {
            order_by: Some("query_time".into()),
            ..Default::default()
        };
        let body = serde_json::to_value(SlowQueryParams::from(&request)).unwrap();
        assert_eq!(body["orderBy"], "query_time");
        assert!(body.get("digest").is_none());
    }
}
