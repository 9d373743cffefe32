use std::num::NonZeroU32;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde_json::Value;
use tracing::{error, info};

use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com";
pub const LISTINGS_PATH: &str = "/v1/cryptocurrency/listings/latest";
pub const QUOTE_CURRENCY: &str = "USD";

const API_KEY_HEADER: &str = "x-cmc_pro_api_key";

/// Untouched JSON body of one listings response.
#[derive(Debug, Clone)]
pub struct RawBatch(pub Value);

impl RawBatch {
    pub fn data_len(&self) -> Option<usize> {
        self.0.get("data").and_then(Value::as_array).map(Vec::len)
    }
}

pub struct ListingsClient {
    client: reqwest::Client,
    base_url: String,
}

impl ListingsClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Requests the top `limit` listings quoted in USD. One attempt, no retry.
    pub async fn fetch(&self, limit: NonZeroU32) -> Result<RawBatch, FetchError> {
        let url = format!("{}{}", self.base_url, LISTINGS_PATH);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("start", "1"), ("limit", limit.as_str()), ("convert", QUOTE_CURRENCY)])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{} returned {}: {}", url, status, body);
            return Err(FetchError::Http { status, body });
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                FetchError::InvalidBody(e)
            } else {
                FetchError::Transport(e)
            }
        })?;

        let batch = RawBatch(body);
        info!("fetched {} listings from {}", batch.data_len().unwrap_or(0), url);
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn client_for(server: &MockServer, timeout: Duration) -> ListingsClient {
        ListingsClient::new(&server.base_url(), "test-key", timeout).unwrap()
    }

    #[tokio::test]
    async fn sends_limit_currency_and_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(LISTINGS_PATH)
                    .query_param("start", "1")
                    .query_param("limit", "7")
                    .query_param("convert", "USD")
                    .header(API_KEY_HEADER, "test-key");
                then.status(200).json_body(json!({
                    "status": { "timestamp": "2024-05-01T10:00:00.000Z" },
                    "data": [{ "id": 1 }]
                }));
            })
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let batch = client.fetch(NonZeroU32::new(7).unwrap()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(batch.data_len(), Some(1));
    }

    #[tokio::test]
    async fn unauthorized_is_http_error_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(LISTINGS_PATH);
                then.status(401)
                    .body(r#"{"status":{"error_message":"API key missing."}}"#);
            })
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch(NonZeroU32::new(100).unwrap()).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        match err {
            FetchError::Http { body, .. } => assert!(body.contains("API key missing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_upstream_is_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(LISTINGS_PATH);
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({ "data": [] }));
            })
            .await;

        let client = client_for(&server, Duration::from_millis(50));
        let err = client.fetch(NonZeroU32::new(1).unwrap()).await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(LISTINGS_PATH);
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch(NonZeroU32::new(1).unwrap()).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let client =
            ListingsClient::new("http://127.0.0.1:1", "test-key", Duration::from_secs(2)).unwrap();
        let err = client.fetch(NonZeroU32::new(1).unwrap()).await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
    }
}
