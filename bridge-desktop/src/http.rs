//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{CookieSession, HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use reqwest_cookie_store::CookieStoreMutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("lecture-mirror/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - TLS support by default
/// - Redirect following (reqwest default policy)
///
/// Requests are sent once; there is no built-in retry.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with a 30 second request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Some(Duration::from_secs(30)))
    }

    /// Create a new HTTP client with a custom request timeout
    ///
    /// `None` leaves only the connect timeout in place, which is what whole
    /// video downloads need.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let client = Self::builder(timeout)
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn builder(timeout: Option<Duration>) -> reqwest::ClientBuilder {
        let builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT);

        match timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn map_send_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "Executing HTTP request");

        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "HTTP request failed");
                Self::map_send_error(e)
            })?;

        let status = response.status().as_u16();
        let final_url = Some(response.url().to_string());
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        debug!(status = status, bytes = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
            final_url,
        })
    }
}

/// Reqwest client bound to an in-memory cookie jar
///
/// Every response along a redirect chain feeds the jar, and every request
/// sends the matching cookies back, which is what a form-post SSO exchange
/// relies on. The jar lives as long as the session and is never persisted.
pub struct ReqwestCookieSession {
    inner: ReqwestHttpClient,
    jar: Arc<CookieStoreMutex>,
}

impl ReqwestCookieSession {
    /// Create a session with an empty jar and a 30 second request timeout
    pub fn new() -> Result<Self> {
        let jar = Arc::new(CookieStoreMutex::default());
        let client = ReqwestHttpClient::builder(Some(Duration::from_secs(30)))
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: ReqwestHttpClient::with_client(client),
            jar,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestCookieSession {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.inner.execute(request).await
    }
}

impl CookieSession for ReqwestCookieSession {
    fn cookie_names(&self) -> Result<Vec<String>> {
        let store = self
            .jar
            .lock()
            .map_err(|_| BridgeError::OperationFailed("Cookie jar lock poisoned".to_string()))?;

        Ok(store
            .iter_unexpired()
            .map(|cookie| cookie.name().to_string())
            .collect())
    }
}
