//! Video payload retrieval

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use provider_panopto::VideoRef;
use std::sync::Arc;
use tracing::instrument;

use crate::error::{Result, SyncError};

/// Fetches the full payload of a recording into memory.
#[async_trait]
pub trait VideoTransfer: Send + Sync {
    async fn fetch(&self, video: &VideoRef) -> Result<Bytes>;
}

/// Plain GET of the download URL, one attempt.
///
/// The client should be built without a request timeout; recordings can take
/// minutes to download. The URL is public so no session cookies are needed.
pub struct HttpVideoTransfer {
    http_client: Arc<dyn HttpClient>,
}

impl HttpVideoTransfer {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl VideoTransfer for HttpVideoTransfer {
    #[instrument(skip(self, video), fields(video = %video.name))]
    async fn fetch(&self, video: &VideoRef) -> Result<Bytes> {
        let response = self
            .http_client
            .execute(HttpRequest::get(video.url.clone()))
            .await
            .map_err(|e| SyncError::transfer(&video.name, e.to_string()))?;

        if !response.is_success() {
            return Err(SyncError::transfer(
                &video.name,
                format!("download returned status {}", response.status),
            ));
        }

        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpMethod, HttpResponse};
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn video() -> VideoRef {
        VideoRef {
            url: "https://cdn.example/l1.mp4".to_string(),
            name: "Lecture 1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.method == HttpMethod::Get && req.url == "https://cdn.example/l1.mp4")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    headers: HashMap::new(),
                    body: Bytes::from_static(b"MP4"),
                    final_url: None,
                })
            });

        let bytes = HttpVideoTransfer::new(Arc::new(mock))
            .fetch(&video())
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"MP4");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 403,
                headers: HashMap::new(),
                body: Bytes::new(),
                final_url: None,
            })
        });

        let err = HttpVideoTransfer::new(Arc::new(mock))
            .fetch(&video())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Transfer { ref video, .. } if video == "Lecture 1"));
    }

    #[tokio::test]
    async fn test_fetch_transport_error_is_not_retried() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("reset".to_string())));

        assert!(HttpVideoTransfer::new(Arc::new(mock))
            .fetch(&video())
            .await
            .is_err());
    }
}
