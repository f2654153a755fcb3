use crate::domain::model::{PostingListRequest, Warehouse};
use crate::domain::ports::{ApiTransport, RawResponse, SendError};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api-seller.ozon.ru";
pub const POSTING_LIST_PATH: &str = "/v1/assembly/fbs/posting/list";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// 以倉庫憑證呼叫出貨單列表端點（單次，不重試）
pub struct OzonHttpTransport {
    client: Client,
    url: String,
    client_id: String,
    api_key: String,
}

impl OzonHttpTransport {
    pub fn new(settings: &HttpSettings, warehouse: &Warehouse) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}{}",
                settings.endpoint.trim_end_matches('/'),
                POSTING_LIST_PATH
            ),
            client_id: warehouse.client_id.clone(),
            api_key: warehouse.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ApiTransport for OzonHttpTransport {
    async fn send(&self, request: &PostingListRequest) -> std::result::Result<RawResponse, SendError> {
        tracing::debug!("POST {} (cursor={:?})", self.url, request.cursor);

        let response = self
            .client
            .post(&self.url)
            .header("Client-Id", &self.client_id)
            .header("Api-Key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(RawResponse { status, body })
    }
}

fn classify(e: reqwest::Error) -> SendError {
    if e.is_timeout() {
        SendError::Timeout(e.to_string())
    } else {
        SendError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{PostingFilter, SortDir};
    use httpmock::prelude::*;
    use serde_json::json;

    fn warehouse() -> Warehouse {
        Warehouse {
            warehouse_name: "Main".to_string(),
            city: "Moscow".to_string(),
            client_id: "2585490".to_string(),
            api_key: "test-key".to_string(),
        }
    }

    fn request(cursor: Option<&str>) -> PostingListRequest {
        PostingListRequest {
            filter: PostingFilter {
                cutoff_from: Some("2024-03-01T00:00:00.000Z".to_string()),
                cutoff_to: Some("2024-03-15T23:59:59.999Z".to_string()),
                ..Default::default()
            },
            limit: 1000,
            sort_dir: SortDir::Asc,
            cursor: cursor.map(str::to_string),
        }
    }

    fn transport(server: &MockServer) -> OzonHttpTransport {
        let settings = HttpSettings {
            endpoint: server.base_url(),
            ..Default::default()
        };
        OzonHttpTransport::new(&settings, &warehouse()).unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_credentials_and_body() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path(POSTING_LIST_PATH)
                .header("Client-Id", "2585490")
                .header("Api-Key", "test-key")
                .json_body(json!({
                    "filter": {
                        "cutoff_from": "2024-03-01T00:00:00.000Z",
                        "cutoff_to": "2024-03-15T23:59:59.999Z"
                    },
                    "limit": 1000,
                    "sort_dir": "ASC",
                    "cursor": "abc"
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"postings": [], "cursor": ""}));
        });

        let response = transport(&server).send(&request(Some("abc"))).await.unwrap();

        api_mock.assert();
        assert_eq!(response.status, 200);
        assert!(response.body.contains("postings"));
    }

    #[tokio::test]
    async fn test_send_returns_error_status_unclassified() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path(POSTING_LIST_PATH);
            then.status(401).body("{\"message\":\"Invalid Api-Key\"}");
        });

        let response = transport(&server).send(&request(None)).await.unwrap();

        api_mock.assert();
        assert_eq!(response.status, 401);
        assert!(response.body.contains("Invalid Api-Key"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let settings = HttpSettings {
            endpoint: "http://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        };
        let transport = OzonHttpTransport::new(&settings, &warehouse()).unwrap();

        let err = transport.send(&request(None)).await.unwrap_err();
        assert!(matches!(err, SendError::Network(_) | SendError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path(POSTING_LIST_PATH);
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"postings": [], "cursor": ""}));
        });
        let settings = HttpSettings {
            endpoint: server.base_url(),
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
        };
        let transport = OzonHttpTransport::new(&settings, &warehouse()).unwrap();

        let err = transport.send(&request(None)).await.unwrap_err();

        api_mock.assert();
        assert!(matches!(err, SendError::Timeout(_)), "got {:?}", err);
    }

    #[test]
    fn test_url_joins_endpoint_and_path() {
        let settings = HttpSettings {
            endpoint: "https://api.example.com/".to_string(),
            ..Default::default()
        };
        let transport = OzonHttpTransport::new(&settings, &warehouse()).unwrap();
        assert_eq!(
            transport.url(),
            "https://api.example.com/v1/assembly/fbs/posting/list"
        );
    }
}
