//! Interactive Authorization Grant
//!
//! When no usable credential is cached the user has to authorize the
//! application once in a browser. [`LoopbackGrantProvider`] does that the way
//! installed desktop apps do: it listens on an ephemeral loopback port, opens
//! the consent page with the port as redirect target, and trades the returned
//! code for a credential.

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, OAuthFlowManager};
use crate::types::DriveCredential;
use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};
use url::Url;

const CALLBACK_PAGE: &str = "<html><body><p>Authorization complete. You may close this window.</p></body></html>";
const CALLBACK_ERROR_PAGE: &str = "<html><body><p>Authorization failed. Check the terminal for details.</p></body></html>";

/// Source of a brand-new credential when neither the cache nor a refresh can supply one.
#[async_trait]
pub trait AuthorizationGrantProvider: Send + Sync {
    async fn grant(&self) -> Result<DriveCredential>;
}

/// Browser consent with a loopback redirect listener.
pub struct LoopbackGrantProvider {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    open_browser: bool,
}

impl LoopbackGrantProvider {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            clock: Arc::new(SystemClock),
            open_browser: true,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Only log the consent URL instead of launching a browser.
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }
}

#[async_trait]
impl AuthorizationGrantProvider for LoopbackGrantProvider {
    #[instrument(skip(self))]
    async fn grant(&self) -> Result<DriveCredential> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::GrantFailed(format!("Failed to bind loopback listener: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::GrantFailed(e.to_string()))?
            .port();

        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let flow = OAuthFlowManager::new(
            self.config.clone().with_redirect_uri(redirect_uri),
            Arc::clone(&self.http_client),
        )
        .with_clock(Arc::clone(&self.clock));

        let (auth_url, verifier) = flow.build_auth_url()?;

        info!(url = %auth_url, "Authorize Google Drive access in your browser");
        if self.open_browser {
            if let Err(e) = webbrowser::open(&auth_url) {
                warn!(error = %e, "Failed to open browser; open the URL manually");
            }
        }

        let callback = wait_for_callback(&listener).await?;
        flow.exchange_code(&callback.code, &callback.state, &verifier)
            .await
    }
}

/// Parameters the authorization server appends to the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// Accept connections until one carries the authorization response.
///
/// Requests without `code` or `error` (favicon fetches and the like) are
/// answered and ignored.
pub async fn wait_for_callback(listener: &TcpListener) -> Result<CallbackParams> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| AuthError::GrantFailed(format!("Loopback accept failed: {}", e)))?;
        debug!(peer = %peer, "Loopback connection");

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .await
            .map_err(|e| AuthError::GrantFailed(format!("Failed to read callback: {}", e)))?;

        let outcome = parse_callback_request(&request_line);
        let page = match &outcome {
            Some(Ok(_)) => CALLBACK_PAGE,
            Some(Err(_)) => CALLBACK_ERROR_PAGE,
            None => "",
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            page.len(),
            page
        );
        if let Err(e) = write_half.write_all(response.as_bytes()).await {
            debug!(error = %e, "Failed to answer loopback request");
        }
        let _ = write_half.shutdown().await;

        if let Some(result) = outcome {
            return result;
        }
    }
}

/// Parse `GET /?code=..&state=.. HTTP/1.1`.
///
/// Returns `None` for requests that are not an authorization response.
pub fn parse_callback_request(request_line: &str) -> Option<Result<CallbackParams>> {
    let target = request_line.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(AuthError::GrantFailed(format!(
            "Authorization denied: {}",
            error
        ))));
    }

    code.map(|code| {
        Ok(CallbackParams {
            code,
            state: state.unwrap_or_default(),
        })
    })
}
