use async_trait::async_trait;
use querylens_controller::{DataSource, SourceError};
use querylens_protocol::list::{FilterKind, ListRequest};
use querylens_protocol::records::StatementRecord;
use serde::Serialize;
use tracing::debug;

use crate::client::{push_list, push_non_empty, ApiClient, QueryPairs};
use crate::error::ClientError;
use crate::info::list_info_values;

/// Statement summary endpoints. The backend neither sorts nor limits; rows
/// are capped to the request limit here and sorted by the controller.
#[derive(Clone)]
pub struct StatementSource {
    client: ApiClient,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementParams {
    pub begin_time: i64,
    pub end_time: i64,
    pub schemas: Vec<String>,
    pub resource_groups: Vec<String>,
    pub stmt_types: Vec<String>,
    pub text: String,
    pub fields: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub plans: Vec<String>,
}

impl From<&ListRequest> for StatementParams {
    fn from(request: &ListRequest) -> Self {
        Self {
            begin_time: request.begin_time,
            end_time: request.end_time,
            schemas: request.dbs.clone(),
            resource_groups: request.groups.clone(),
            stmt_types: request.kinds.clone(),
            text: request.term.clone(),
            fields: request.fields.join(","),
            digest: request.digest.clone(),
            plans: request.plans.clone(),
        }
    }
}

impl StatementParams {
    pub fn to_pairs(&self) -> QueryPairs {
        let mut pairs = vec![
            ("begin_time".to_string(), self.begin_time.to_string()),
            ("end_time".to_string(), self.end_time.to_string()),
        ];
        push_list(&mut pairs, "schemas", &self.schemas);
        push_list(&mut pairs, "resource_groups", &self.resource_groups);
        push_list(&mut pairs, "stmt_types", &self.stmt_types);
        push_non_empty(&mut pairs, "text", &self.text);
        push_non_empty(&mut pairs, "fields", &self.fields);
        if let Some(digest) = &self.digest {
            push_non_empty(&mut pairs, "digest", digest);
        }
        push_list(&mut pairs, "plans", &self.plans);
        pairs
    }
}

impl StatementSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn download(&self, token: &str) -> Result<Vec<u8>, ClientError> {
        let query = vec![("token".to_string(), token.to_string())];
        self.client.get_bytes("statements/download", &query).await
    }
}

/// Whether `row` passes the digest and plan filters. Rows without a plan
/// digest are summaries across plans and pass the plan filter.
fn matches_detail_filters(row: &StatementRecord, request: &ListRequest) -> bool {
    let digest_ok = match &request.digest {
        Some(digest) => row.digest.as_deref() == Some(digest.as_str()),
        None => true,
    };
    let plan_ok = request.plans.is_empty()
        || !matches!(&row.plan_digest, Some(plan) if !request.plans.contains(plan));
    digest_ok && plan_ok
}

#[async_trait]
impl DataSource for StatementSource {
    type Row = StatementRecord;

    async fn list_results(&self, request: &ListRequest) -> Result<Vec<StatementRecord>, SourceError> {
        let params = StatementParams::from(request);
        let mut rows: Vec<StatementRecord> = self
            .client
            .get_json("statements/list", &params.to_pairs())
            .await?;
        let total = rows.len();
        rows.retain(|row| matches_detail_filters(row, request));
        rows.truncate(request.limit as usize);
        debug!(total, kept = rows.len(), "statements listed");
        Ok(rows)
    }

    async fn list_available_fields(&self) -> Result<Vec<String>, SourceError> {
        Ok(self
            .client
            .get_json("statements/available_fields", &QueryPairs::new())
            .await?)
    }

    async fn list_filter_values(&self, kind: FilterKind) -> Result<Vec<String>, SourceError> {
        Ok(list_info_values(&self.client, kind).await?)
    }

    async fn download_token(&self, request: &ListRequest) -> Result<String, SourceError> {
        let body = StatementParams::from(request);
        Ok(self
            .client
            .post_json("statements/download/token", &body)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_filters_to_statement_parameters() {
        let request = ListRequest {
            begin_time: 1,
            end_time: 2,
            dbs: vec!["app".into()],
            groups: vec!["rg".into()],
            kinds: vec!["Select".into(), "Update".into()],
            fields: vec!["digest_text".into()],
            ..Default::default()
        };
        let pairs = StatementParams::from(&request).to_pairs();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "begin_time",
                "end_time",
                "schemas",
                "resource_groups",
                "stmt_types",
                "stmt_types",
                "fields"
            ]
        );
    }

    #[test]
    fn detail_filters_are_forwarded_and_applied() {
        let request = ListRequest {
            digest: Some("d1".into()),
            plans: vec!["p1".into()],
            ..Default::default()
        };
        let pairs = StatementParams::from(&request).to_pairs();
        assert!(pairs.contains(&("digest".to_string(), "d1".to_string())));
        assert!(pairs.contains(&("plans".to_string(), "p1".to_string())));

        let row = |digest: &str, plan: Option<&str>| StatementRecord {
            digest: Some(digest.into()),
            plan_digest: plan.map(str::to_string),
            ..Default::default()
        };
        assert!(matches_detail_filters(&row("d1", Some("p1")), &request));
        assert!(matches_detail_filters(&row("d1", None), &request));
        assert!(!matches_detail_filters(&row("d2", Some("p1")), &request));
        assert!(!matches_detail_filters(&row("d1", Some("p2")), &request));
    }
}
