//! SAML Single Sign-On Negotiation
//!
//! Drives a browser-less SAML login: fetch the identity provider login page,
//! post the credentials, lift the signed assertion out of the auto-submit
//! form, hand it to the service provider and finally visit the lecture
//! platform so it issues its own session cookie.
//!
//! Every step is attempted once. Checkpoint cookies are verified after the
//! first and the last step so a misconfigured or changed login flow fails
//! early with the missing cookie names.

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{CookieSession, HttpClient, HttpRequest, HttpResponse};
use core_runtime::config::SsoConfig;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const SAML_RESPONSE_FIELD: &str = "SAMLResponse";

/// Authenticated lecture platform session.
///
/// Wraps the cookie-carrying client the negotiation ran on; requests sent
/// through it carry the platform cookies.
#[derive(Clone)]
pub struct SsoSession {
    client: Arc<dyn CookieSession>,
}

impl SsoSession {
    pub fn cookie_names(&self) -> BridgeResult<Vec<String>> {
        self.client.cookie_names()
    }
}

impl fmt::Debug for SsoSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsoSession").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpClient for SsoSession {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.client.execute(request).await
    }
}

/// Identity negotiator for the SAML login flow.
pub struct SsoNegotiator {
    config: SsoConfig,
    client: Arc<dyn CookieSession>,
}

impl SsoNegotiator {
    /// `client` should start with an empty cookie jar.
    pub fn new(config: SsoConfig, client: Arc<dyn CookieSession>) -> Self {
        Self { config, client }
    }

    /// Run the login flow and return the authenticated session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCookies`] when a checkpoint cookie is absent
    /// - [`AuthError::InvalidCredentials`] when the identity provider does not
    ///   issue an assertion (it answers 200 even for a wrong password)
    /// - [`AuthError::NetworkError`] on any transport failure
    #[instrument(skip(self), fields(idp = %self.config.idp_login_url))]
    pub async fn negotiate(self) -> Result<SsoSession> {
        info!("Starting single sign-on");

        let login_page = self.send(HttpRequest::get(&self.config.idp_login_url)).await?;
        self.require_cookies("identity provider login", &self.config.initial_cookies)?;

        let form_url = login_page
            .final_url
            .clone()
            .unwrap_or_else(|| self.config.idp_login_url.clone());
        debug!(url = %form_url, "Posting credentials");

        let credentials = [
            ("j_username", self.config.username.as_str()),
            ("j_password", self.config.password.as_str()),
            ("_eventId_proceed", "Sign in"),
        ];
        let request = HttpRequest::post(form_url)
            .form(&credentials)
            .map_err(|e| AuthError::Other(e.to_string()))?;
        let assertion_page = self.send(request).await?;

        let body = assertion_page
            .text()
            .map_err(|e| AuthError::Other(format!("Unreadable identity provider reply: {}", e)))?;
        let saml_response = extract_saml_response(&body)?.ok_or_else(|| {
            warn!("Identity provider did not issue an assertion");
            AuthError::InvalidCredentials(
                "no SAMLResponse in identity provider reply; check username and password"
                    .to_string(),
            )
        })?;
        debug!("Received SAML assertion");

        let request = HttpRequest::post(&self.config.consumer_url)
            .form(&[(SAML_RESPONSE_FIELD, saml_response.as_str())])
            .map_err(|e| AuthError::Other(e.to_string()))?;
        self.send(request).await?;

        self.send(HttpRequest::get(&self.config.landing_url)).await?;
        self.require_cookies(
            "lecture platform landing",
            std::slice::from_ref(&self.config.auth_cookie),
        )?;

        info!("Single sign-on complete");
        Ok(SsoSession {
            client: self.client,
        })
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;
        debug!(status = response.status, "SSO step completed");
        Ok(response)
    }

    fn require_cookies(&self, stage: &str, required: &[String]) -> Result<()> {
        let present = self
            .client
            .cookie_names()
            .map_err(|e| AuthError::Other(e.to_string()))?;

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !present.iter().any(|p| p == *name))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            warn!(stage = stage, missing = ?missing, "Session checkpoint failed");
            Err(AuthError::MissingCookies {
                stage: stage.to_string(),
                missing,
            })
        }
    }
}

/// Value of the first `<input name="SAMLResponse">` in `html`.
pub fn extract_saml_response(html: &str) -> Result<Option<String>> {
    let mut value: Option<String> = None;

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("input[name=\"SAMLResponse\"]", |el| {
                if value.is_none() {
                    value = el.get_attribute("value");
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| AuthError::Other(format!("Failed to parse identity provider reply: {}", e)))?;

    Ok(value.filter(|v| !v.is_empty()))
}
