//! OAuth 2.0 Authorization Flow Manager with PKCE Support
//!
//! This module implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for the
//! installed-application flow used to authorize destination storage access.
//!
//! # Overview
//!
//! The OAuth flow manager handles:
//! - Loading client settings from an installed-app client-secret descriptor
//! - Building authorization URLs with PKCE challenge
//! - Exchanging authorization codes for tokens
//! - Refreshing access tokens
//!
//! # Security
//!
//! - Generates cryptographically secure random state and code verifier
//! - Validates state parameter to prevent CSRF attacks
//! - Never logs sensitive values (tokens, codes, verifiers)
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let secrets = std::fs::read("credentials.json").unwrap();
//! let config = OAuthConfig::from_client_secrets(
//!     &secrets,
//!     vec!["https://www.googleapis.com/auth/drive".to_string()],
//! )?
//! .with_redirect_uri("http://127.0.0.1:8080/");
//!
//! let flow_manager = OAuthFlowManager::new(config, http_client);
//! let (auth_url, pkce_verifier) = flow_manager.build_auth_url()?;
//! // Send the user to auth_url...
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::DriveCredential;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::time::{Clock, SystemClock};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth 2.0 client configuration.
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (installed apps still receive one)
    pub client_secret: Option<String>,
    /// Redirect URI for OAuth callback
    pub redirect_uri: String,
    /// List of OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Parse a Google client-secret descriptor (`{"installed": {...}}` or `{"web": {...}}`).
    ///
    /// The redirect URI defaults to the first one listed; loopback grants
    /// replace it once their listener port is known.
    pub fn from_client_secrets(bytes: &[u8], scopes: Vec<String>) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_slice(bytes)
            .map_err(|e| AuthError::InvalidClientSecrets(e.to_string()))?;

        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AuthError::InvalidClientSecrets(
                "expected an \"installed\" or \"web\" client section".to_string(),
            )
        })?;

        if secrets.client_id.is_empty() {
            return Err(AuthError::InvalidClientSecrets(
                "client_id is empty".to_string(),
            ));
        }

        Ok(Self {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret.filter(|s| !s.is_empty()),
            redirect_uri: secrets
                .redirect_uris
                .into_iter()
                .next()
                .unwrap_or_else(|| "http://localhost".to_string()),
            scopes,
            auth_url: secrets
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: secrets
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        })
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// # Security
///
/// The verifier must be kept secret and never transmitted to the authorization server.
/// Only the challenge (derived from the verifier) is sent during authorization.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// Create a new PKCE verifier with cryptographically secure random values.
    ///
    /// Generates a 32-byte code verifier and a 16-byte state, both
    /// URL-safe base64 without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Compute the code challenge from the verifier.
    ///
    /// Uses S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        let hash = hasher.finalize();
        URL_SAFE_NO_PAD.encode(hash)
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth 2.0 flow manager.
///
/// Every token endpoint call is made once; failures are returned to the caller.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` to stamp token expiry instants.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization URL with PKCE challenge.
    ///
    /// Returns the URL and the verifier that must be presented again in
    /// [`exchange_code`](Self::exchange_code).
    #[instrument(skip(self))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Other(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", &challenge);
            query.append_pair("code_challenge_method", "S256");
            // Request a refresh token
            query.append_pair("access_type", "offline");
        }

        debug!("Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for a credential.
    ///
    /// # Errors
    ///
    /// - [`AuthError::StateMismatch`] when `state` differs from the verifier's
    /// - [`AuthError::GrantFailed`] when the token endpoint rejects the code
    /// - [`AuthError::NetworkError`] on transport failure
    #[instrument(skip(self, code, state, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        verifier: &PkceVerifier,
    ) -> Result<DriveCredential> {
        if state != verifier.state() {
            warn!("OAuth state mismatch on authorization callback");
            return Err(AuthError::StateMismatch {
                expected: verifier.state().to_string(),
                actual: state.to_string(),
            });
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Exchanging authorization code for tokens");

        let request = HttpRequest::post(self.config.token_url.clone())
            .form(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = status, "Token endpoint rejected the authorization code");

            return Err(AuthError::GrantFailed(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::GrantFailed(format!("Failed to parse token response: {}", e)))?;

        info!(
            expires_in = token_response.expires_in,
            has_refresh_token = token_response.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );

        Ok(DriveCredential::from_expires_in(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            self.clock.now(),
        ))
    }

    /// Refresh an access token.
    ///
    /// The returned credential keeps `refresh_token` unless the endpoint
    /// rotated it. A rejected or unreadable reply is
    /// [`AuthError::TokenRefreshFailed`]; an unreachable endpoint is
    /// [`AuthError::NetworkError`].
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<DriveCredential> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Refreshing access token");

        let request = HttpRequest::post(self.config.token_url.clone())
            .form(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| {
                warn!(error = %e, "Token endpoint unreachable");
                AuthError::NetworkError(e.to_string())
            })?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = status, "Token refresh rejected");

            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            AuthError::TokenRefreshFailed(format!("Failed to parse token response: {}", e))
        })?;

        info!(
            expires_in = token_response.expires_in,
            "Refreshed access token"
        );

        Ok(DriveCredential::from_expires_in(
            token_response.access_token,
            token_response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            token_response.expires_in,
            self.clock.now(),
        ))
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const CLIENT_SECRETS: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "shh",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        }
    }

    /// Replies with a canned response and records request bodies.
    struct CannedHttpClient {
        status: u16,
        body: &'static str,
        bodies: Mutex<Vec<String>>,
    }

    impl CannedHttpClient {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                bodies: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl HttpClient for CannedHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            let body = request
                .body
                .map(|b| String::from_utf8_lossy(&b).to_string())
                .unwrap_or_default();
            self.bodies.lock().unwrap().push(body);
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: Bytes::from_static(self.body.as_bytes()),
                final_url: None,
            })
        }
    }

    struct OfflineHttpClient;

    #[async_trait::async_trait]
    impl HttpClient for OfflineHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::OperationFailed("connection refused".to_string()))
        }
    }

    fn config() -> OAuthConfig {
        OAuthConfig::from_client_secrets(
            CLIENT_SECRETS.as_bytes(),
            vec!["https://www.googleapis.com/auth/drive".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_client_secrets_parsing() {
        let config = config();

        assert_eq!(config.client_id, "123.apps.googleusercontent.com");
        assert_eq!(config.client_secret.as_deref(), Some("shh"));
        assert_eq!(config.redirect_uri, "http://localhost");
        assert_eq!(config.token_url, "https://oauth2.googleapis.com/token");
        assert!(!format!("{:?}", config).contains("shh"));
    }

    #[test]
    fn test_client_secrets_rejects_unknown_shape() {
        let result = OAuthConfig::from_client_secrets(br#"{"other": {}}"#, vec![]);
        assert!(matches!(result, Err(AuthError::InvalidClientSecrets(_))));

        let result = OAuthConfig::from_client_secrets(b"not json", vec![]);
        assert!(matches!(result, Err(AuthError::InvalidClientSecrets(_))));
    }

    #[test]
    fn test_pkce_verifier_generation() {
        let verifier = PkceVerifier::new();
        assert!(!verifier.verifier().is_empty());
        assert_eq!(verifier.challenge(), verifier.challenge());

        let other = PkceVerifier::new();
        assert_ne!(verifier.state(), other.state());
        assert_ne!(verifier.challenge(), other.challenge());

        let challenge = verifier.challenge();
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('='));
    }

    #[test]
    fn test_build_auth_url() {
        let manager = OAuthFlowManager::new(
            config().with_redirect_uri("http://127.0.0.1:8765/"),
            Arc::new(OfflineHttpClient),
        );
        let (url, verifier) = manager.build_auth_url().unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=123.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8765%2F"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(&format!("state={}", verifier.state())));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn test_exchange_code_rejects_state_mismatch() {
        let manager = OAuthFlowManager::new(config(), Arc::new(OfflineHttpClient));
        let verifier = PkceVerifier::new();

        let result = manager.exchange_code("code", "forged", &verifier).await;
        assert!(matches!(result, Err(AuthError::StateMismatch { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let http = Arc::new(CannedHttpClient::new(
            200,
            r#"{"access_token":"ya29.new","refresh_token":"1//r","expires_in":3599}"#,
        ));
        let manager =
            OAuthFlowManager::new(config(), http.clone()).with_clock(Arc::new(FixedClock));
        let verifier = PkceVerifier::new();

        let credential = manager
            .exchange_code("auth-code", verifier.state(), &verifier)
            .await
            .unwrap();

        assert_eq!(credential.access_token, "ya29.new");
        assert_eq!(credential.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(
            credential.expires_at,
            FixedClock.now() + chrono::Duration::seconds(3599)
        );

        let bodies = http.bodies.lock().unwrap();
        assert!(bodies[0].contains("grant_type=authorization_code"));
        assert!(bodies[0].contains("code=auth-code"));
        assert!(bodies[0].contains("client_secret=shh"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token() {
        let http = Arc::new(CannedHttpClient::new(
            200,
            r#"{"access_token":"ya29.fresh","expires_in":3600}"#,
        ));
        let manager = OAuthFlowManager::new(config(), http.clone());

        let credential = manager.refresh_access_token("1//keep").await.unwrap();

        assert_eq!(credential.access_token, "ya29.fresh");
        assert_eq!(credential.refresh_token.as_deref(), Some("1//keep"));
        assert!(http.bodies.lock().unwrap()[0].contains("grant_type=refresh_token"));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_single_attempt() {
        let http = Arc::new(CannedHttpClient::new(
            400,
            r#"{"error":"invalid_grant"}"#,
        ));
        let manager = OAuthFlowManager::new(config(), http.clone());

        let result = manager.refresh_access_token("1//revoked").await;

        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
        assert_eq!(http.bodies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_unreachable_endpoint_is_network_error() {
        let manager = OAuthFlowManager::new(config(), Arc::new(OfflineHttpClient));
        let result = manager.refresh_access_token("1//r").await;
        assert!(matches!(result, Err(AuthError::NetworkError(_))));
    }

    #[test]
    fn test_token_response_deserialization_minimal() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token": "token"}"#).unwrap();
        assert_eq!(response.access_token, "token");
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, 3600);
    }
}
