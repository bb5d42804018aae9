use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::ImportConfig;
use crate::models::ImportPayload;
use crate::utils::error::AppError;

/// Outcome of one import attempt, reported back to the caller; the core
/// never retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub success: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// The outbound submission channel: one fire-and-forget JSON POST per
/// user-initiated send.
#[derive(Debug, Clone)]
pub struct ImportClient {
    client: Client,
    endpoint: Url,
}

impl ImportClient {
    pub fn new(config: &ImportConfig) -> crate::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| AppError::Validation(format!("invalid import endpoint: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(ImportClient { client, endpoint })
    }

    /// Transport-level failures come back as a failed result, not an error:
    /// a broken send is a reportable state, never a crash.
    pub async fn send(&self, payload: &ImportPayload) -> ImportResult {
        info!(title = %payload.title, price = %payload.price, "sending product for review");

        match self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    info!("product import accepted");
                    ImportResult {
                        success: true,
                        status: Some(status.as_u16()),
                        error: None,
                    }
                } else {
                    warn!(%status, "import endpoint rejected the payload");
                    ImportResult {
                        success: false,
                        status: Some(status.as_u16()),
                        error: Some(format!("endpoint returned {}", status)),
                    }
                }
            }
            Err(e) => {
                warn!("import request failed: {}", e);
                ImportResult {
                    success: false,
                    status: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> ImportPayload {
        ImportPayload {
            supplier: "aliexpress".to_string(),
            title: "Camping Stove".to_string(),
            price: "19.99".to_string(),
            description: "Foldable".to_string(),
        }
    }

    fn config_for(server: &MockServer) -> ImportConfig {
        ImportConfig {
            endpoint: format!("{}/import-from-extension", server.uri()),
            supplier: "aliexpress".to_string(),
            request_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_successful_import() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/import-from-extension"))
            .and(body_json(payload()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ImportClient::new(&config_for(&server)).unwrap();
        let result = client.send(&payload()).await;

        assert!(result.success);
        assert_eq!(result.status, Some(200));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ImportClient::new(&config_for(&server)).unwrap();
        let result = client.send(&payload()).await;

        assert!(!result.success);
        assert_eq!(result.status, Some(500));
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_reported_not_raised() {
        let config = ImportConfig {
            endpoint: "http://127.0.0.1:9/import".to_string(),
            supplier: "aliexpress".to_string(),
            request_timeout_secs: 1,
        };
        let client = ImportClient::new(&config).unwrap();
        let result = client.send(&payload()).await;

        assert!(!result.success);
        assert!(result.status.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_invalid_endpoint_rejected_at_construction() {
        let config = ImportConfig {
            endpoint: "not a url".to_string(),
            supplier: "aliexpress".to_string(),
            request_timeout_secs: 1,
        };
        assert!(ImportClient::new(&config).is_err());
    }
}
