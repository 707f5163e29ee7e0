use std::time::Duration;

use querylens_core::CoreConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

/// Query parameters in wire order; repeated keys encode lists.
pub type QueryPairs = Vec<(String, String)>;

/// Typed HTTP client bound to the diagnostics API base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client bound to `base_url`. Relative endpoint paths are
    /// resolved under it, so a trailing slash is added when missing.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::build(base_url, None, reqwest::Client::new())
    }

    /// Client carrying the configured token and request timeout.
    pub fn from_config(config: &CoreConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::build(config.api_url(), config.api_token.clone(), http)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::build(base_url, None, http)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn build(
        base_url: &str,
        token: Option<String>,
        http: reqwest::Client,
    ) -> Result<Self, ClientError> {
        let mut url = Url::parse(base_url).map_err(|err| ClientError::InvalidUrl {
            url: base_url.to_string(),
            source: err,
        })?;

        if !url.path().ends_with('/') {
            let mut path = url.path().trim_end_matches('/').to_string();
            path.push('/');
            url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url: url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                source: err,
            })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryPairs,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        debug!(%url, params = query.len(), "GET");
        let response = self.authorize(self.http.get(url).query(query)).send().await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self.authorize(self.http.post(url).json(body)).send().await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }

    /// Raw body of a GET, used for file downloads.
    pub async fn get_bytes(&self, path: &str, query: &QueryPairs) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET (download)");
        let response = self.authorize(self.http.get(url).query(query)).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| {
            body.message.or_else(|| match body.error {
                Some(serde_json::Value::String(text)) => Some(text),
                _ => None,
            })
        })
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty() && !text.starts_with('{')).then(|| text.to_string())
        });

    debug!(%status, ?message, "API error response");
    Err(ClientError::UnexpectedStatus { status, message })
}

/// Appends one pair per list item.
pub(crate) fn push_list(pairs: &mut QueryPairs, key: &str, values: &[String]) {
    pairs.extend(values.iter().map(|value| (key.to_string(), value.clone())));
}

pub(crate) fn push_non_empty(pairs: &mut QueryPairs, key: &str, value: &str) {
    if !value.is_empty() {
        pairs.push((key.to_string(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = ApiClient::new("http://127.0.0.1:12333/dashboard/api").unwrap();
        assert_eq!(
            client.endpoint("slow_query/list").unwrap().as_str(),
            "http://127.0.0.1:12333/dashboard/api/slow_query/list"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn list_helpers_repeat_keys() {
        let mut pairs = QueryPairs::new();
        push_list(&mut pairs, "db", &["a".into(), "b".into()]);
        push_non_empty(&mut pairs, "text", "");
        assert_eq!(
            pairs,
            vec![("db".to_string(), "a".to_string()), ("db".to_string(), "b".to_string())]
        );
    }
}
