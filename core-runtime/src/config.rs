//! # Mirror Configuration
//!
//! Holds every setting the mirror needs, assembled once at startup and
//! handed to each component constructor.
//!
//! ## Usage
//!
//! ### From the environment
//!
//! ```ignore
//! use core_runtime::config::MirrorConfig;
//!
//! let config = MirrorConfig::from_env()?;
//! ```
//!
//! ### With the builder
//!
//! ```
//! use core_runtime::config::{MirrorConfig, TransferFailurePolicy};
//!
//! let config = MirrorConfig::builder()
//!     .credentials("student", "hunter2")
//!     .folder_marker("CSE")
//!     .transfer_failure_policy(TransferFailurePolicy::Continue)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.drive.root_folder_name, "Panopto Videos");
//! ```
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |---|---|
//! | `PANOPTO_USERNAME` / `PANOPTO_PASSWORD` | SSO credentials (required) |
//! | `LECTURE_MIRROR_ONLY_MARKED` | only mirror folders whose name contains the marker |
//! | `LECTURE_MIRROR_FOLDER_MARKER` | marker substring (default `CSE`) |
//! | `LECTURE_MIRROR_DRIVE_FOLDER` | destination root folder name |
//! | `LECTURE_MIRROR_CLIENT_SECRETS` | OAuth client-secret descriptor path |
//! | `LECTURE_MIRROR_TOKEN_CACHE` | OAuth token cache path |
//! | `LECTURE_MIRROR_LOG` / `RUST_LOG` | tracing filter |
//! | `LECTURE_MIRROR_LOG_FORMAT` | `pretty`, `compact` or `json` |
//! | `LECTURE_MIRROR_CONTINUE_ON_ERROR` | keep going after a failed transfer |

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LoggingConfig};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const ENV_USERNAME: &str = "PANOPTO_USERNAME";
pub const ENV_PASSWORD: &str = "PANOPTO_PASSWORD";
pub const ENV_ONLY_MARKED: &str = "LECTURE_MIRROR_ONLY_MARKED";
pub const ENV_FOLDER_MARKER: &str = "LECTURE_MIRROR_FOLDER_MARKER";
pub const ENV_DRIVE_FOLDER: &str = "LECTURE_MIRROR_DRIVE_FOLDER";
pub const ENV_CLIENT_SECRETS: &str = "LECTURE_MIRROR_CLIENT_SECRETS";
pub const ENV_TOKEN_CACHE: &str = "LECTURE_MIRROR_TOKEN_CACHE";
pub const ENV_LOG: &str = "LECTURE_MIRROR_LOG";
pub const ENV_LOG_FORMAT: &str = "LECTURE_MIRROR_LOG_FORMAT";
pub const ENV_CONTINUE_ON_ERROR: &str = "LECTURE_MIRROR_CONTINUE_ON_ERROR";

const DEFAULT_IDP_LOGIN_URL: &str = "https://canvas.uw.edu/login/saml/83";
const DEFAULT_CONSUMER_URL: &str = "https://canvas.uw.edu/login/saml";
const DEFAULT_LANDING_URL: &str = "https://uw.hosted.panopto.com/Panopto/Pages/Auth/Login.aspx?instance=UWNetid&ReturnUrl=https%3a%2f%2fuw.hosted.panopto.com%2fPanopto%2fPages%2fHome.aspx";
const DEFAULT_PANOPTO_BASE_URL: &str = "https://uw.hosted.panopto.com";
const DEFAULT_DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Single-sign-on endpoints, checkpoint cookies and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct SsoConfig {
    /// Entry point of the SAML login; redirects to the identity provider
    pub idp_login_url: String,
    /// Service-provider endpoint that accepts the SAML assertion
    pub consumer_url: String,
    /// Lecture platform page that completes the login
    pub landing_url: String,
    /// Cookies that must be present after the first request
    pub initial_cookies: Vec<String>,
    /// Cookie proving the lecture platform session
    pub auth_cookie: String,
    pub username: String,
    pub password: String,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            idp_login_url: DEFAULT_IDP_LOGIN_URL.to_string(),
            consumer_url: DEFAULT_CONSUMER_URL.to_string(),
            landing_url: DEFAULT_LANDING_URL.to_string(),
            initial_cookies: vec![
                "_csrf_token".to_string(),
                "bbbbbbbbbbbbbbb".to_string(),
                "JSESSIONID".to_string(),
            ],
            auth_cookie: ".ASPXAUTH".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for SsoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsoConfig")
            .field("idp_login_url", &self.idp_login_url)
            .field("consumer_url", &self.consumer_url)
            .field("landing_url", &self.landing_url)
            .field("initial_cookies", &self.initial_cookies)
            .field("auth_cookie", &self.auth_cookie)
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Lecture platform API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanoptoConfig {
    pub base_url: String,
    /// Upper bound passed to the session listing call
    pub max_videos_per_folder: u32,
}

impl Default for PanoptoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PANOPTO_BASE_URL.to_string(),
            max_videos_per_folder: 50,
        }
    }
}

/// Which source folders are mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFilterConfig {
    /// Restrict to folders whose name contains `marker`
    pub only_marked: bool,
    pub marker: String,
}

impl Default for FolderFilterConfig {
    fn default() -> Self {
        Self {
            only_marked: true,
            marker: "CSE".to_string(),
        }
    }
}

/// Google Drive destination and OAuth file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    /// Top-level folder every mirrored folder is created under
    pub root_folder_name: String,
    /// Installed-app client-secret descriptor (read only)
    pub client_secrets_path: PathBuf,
    /// Where the OAuth credential is cached between runs
    pub token_cache_path: PathBuf,
    pub scopes: Vec<String>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            root_folder_name: "Panopto Videos".to_string(),
            client_secrets_path: PathBuf::from("credentials.json"),
            token_cache_path: PathBuf::from("token.json"),
            scopes: vec![DEFAULT_DRIVE_SCOPE.to_string()],
        }
    }
}

/// Exponential backoff applied to destination storage calls.
///
/// Delays start at `initial_delay` and double per attempt up to `max_delay`.
/// Attempts are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// What the sync driver does when one video fails to transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferFailurePolicy {
    /// Stop the run and report the failure
    #[default]
    Abort,
    /// Record the failure and move on to the next video
    Continue,
}

/// Complete configuration of one mirror run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MirrorConfig {
    pub sso: SsoConfig,
    pub panopto: PanoptoConfig,
    pub folder_filter: FolderFilterConfig,
    pub drive: DriveConfig,
    pub retry: RetryConfig,
    pub transfer_failure_policy: TransferFailurePolicy,
    pub logging: LoggingConfig,
}

impl MirrorConfig {
    pub fn builder() -> MirrorConfigBuilder {
        MirrorConfigBuilder::default()
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`] when the SSO credentials are not set and
    /// [`Error::Config`] when an optional variable holds an unparsable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::MissingEnv(key.to_string()))
        };

        let mut builder = Self::builder().credentials(required(ENV_USERNAME)?, required(ENV_PASSWORD)?);

        if let Some(value) = lookup(ENV_ONLY_MARKED) {
            builder = builder.only_marked(parse_bool(ENV_ONLY_MARKED, &value)?);
        }
        if let Some(value) = lookup(ENV_FOLDER_MARKER) {
            builder = builder.folder_marker(value);
        }
        if let Some(value) = lookup(ENV_DRIVE_FOLDER) {
            builder = builder.drive_root_folder(value);
        }
        if let Some(value) = lookup(ENV_CLIENT_SECRETS) {
            builder = builder.client_secrets_path(value);
        }
        if let Some(value) = lookup(ENV_TOKEN_CACHE) {
            builder = builder.token_cache_path(value);
        }
        if let Some(value) = lookup(ENV_CONTINUE_ON_ERROR) {
            if parse_bool(ENV_CONTINUE_ON_ERROR, &value)? {
                builder = builder.transfer_failure_policy(TransferFailurePolicy::Continue);
            }
        }

        let mut logging = LoggingConfig::default();
        if let Some(filter) = lookup(ENV_LOG).or_else(|| lookup("RUST_LOG")) {
            if !filter.trim().is_empty() {
                logging = logging.with_filter(filter);
            }
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            logging = logging.with_format(format.parse::<LogFormat>()?);
        }

        builder.logging(logging).build()
    }

    /// Check invariants the components rely on.
    pub fn validate(&self) -> Result<()> {
        if self.sso.username.is_empty() || self.sso.password.is_empty() {
            return Err(Error::Config(
                "SSO username and password must both be set".to_string(),
            ));
        }

        for (name, value) in [
            ("idp_login_url", &self.sso.idp_login_url),
            ("consumer_url", &self.sso.consumer_url),
            ("landing_url", &self.sso.landing_url),
            ("panopto.base_url", &self.panopto.base_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::Config(format!("Invalid URL for {}: {}", name, e)))?;
        }

        if self.sso.auth_cookie.is_empty() {
            return Err(Error::Config("Auth cookie name cannot be empty".to_string()));
        }

        if self.panopto.max_videos_per_folder == 0 {
            return Err(Error::Config(
                "max_videos_per_folder must be greater than 0".to_string(),
            ));
        }

        if self.folder_filter.only_marked && self.folder_filter.marker.is_empty() {
            return Err(Error::Config(
                "Folder marker cannot be empty when only marked folders are mirrored".to_string(),
            ));
        }

        if self.drive.root_folder_name.trim().is_empty() {
            return Err(Error::Config(
                "Drive root folder name cannot be empty".to_string(),
            ));
        }

        if self.drive.client_secrets_path.as_os_str().is_empty()
            || self.drive.token_cache_path.as_os_str().is_empty()
        {
            return Err(Error::Config(
                "Client secrets and token cache paths cannot be empty".to_string(),
            ));
        }

        if self.drive.scopes.is_empty() {
            return Err(Error::Config("At least one OAuth scope is required".to_string()));
        }

        if self.retry.initial_delay.is_zero() {
            return Err(Error::Config(
                "Retry initial delay must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_delay < self.retry.initial_delay {
            return Err(Error::Config(
                "Retry max delay must not be shorter than the initial delay".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

/// Builder for [`MirrorConfig`]. Unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct MirrorConfigBuilder {
    config: MirrorConfig,
}

impl MirrorConfigBuilder {
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.sso.username = username.into();
        self.config.sso.password = password.into();
        self
    }

    /// Replace the SSO endpoints and cookie names; credentials set earlier are kept.
    pub fn sso(mut self, sso: SsoConfig) -> Self {
        let username = std::mem::take(&mut self.config.sso.username);
        let password = std::mem::take(&mut self.config.sso.password);
        self.config.sso = sso;
        if self.config.sso.username.is_empty() {
            self.config.sso.username = username;
        }
        if self.config.sso.password.is_empty() {
            self.config.sso.password = password;
        }
        self
    }

    pub fn panopto_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.panopto.base_url = url.into();
        self
    }

    pub fn max_videos_per_folder(mut self, max: u32) -> Self {
        self.config.panopto.max_videos_per_folder = max;
        self
    }

    pub fn only_marked(mut self, only_marked: bool) -> Self {
        self.config.folder_filter.only_marked = only_marked;
        self
    }

    pub fn folder_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.folder_filter.marker = marker.into();
        self
    }

    pub fn drive_root_folder(mut self, name: impl Into<String>) -> Self {
        self.config.drive.root_folder_name = name.into();
        self
    }

    pub fn client_secrets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.drive.client_secrets_path = path.into();
        self
    }

    pub fn token_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.drive.token_cache_path = path.into();
        self
    }

    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.config.drive.scopes = scopes;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn transfer_failure_policy(mut self, policy: TransferFailurePolicy) -> Self {
        self.config.transfer_failure_policy = policy;
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<MirrorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_original_layout() {
        let config = MirrorConfig::builder()
            .credentials("student", "secret")
            .build()
            .unwrap();

        assert_eq!(config.panopto.max_videos_per_folder, 50);
        assert!(config.folder_filter.only_marked);
        assert_eq!(config.folder_filter.marker, "CSE");
        assert_eq!(config.drive.root_folder_name, "Panopto Videos");
        assert_eq!(config.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.retry.max_delay, Duration::from_secs(10));
        assert_eq!(config.transfer_failure_policy, TransferFailurePolicy::Abort);
        assert_eq!(config.sso.auth_cookie, ".ASPXAUTH");
        assert_eq!(config.sso.initial_cookies.len(), 3);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = MirrorConfig::builder().build();
        assert!(matches!(result, Err(Error::Config(_))));

        let result = MirrorConfig::from_lookup(env(&[(ENV_USERNAME, "student")]));
        match result {
            Err(Error::MissingEnv(key)) => assert_eq!(key, ENV_PASSWORD),
            other => panic!("expected MissingEnv, got {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = MirrorConfig::from_lookup(env(&[
            (ENV_USERNAME, "student"),
            (ENV_PASSWORD, "secret"),
            (ENV_ONLY_MARKED, "false"),
            (ENV_DRIVE_FOLDER, "Lectures"),
            (ENV_TOKEN_CACHE, "/tmp/token.json"),
            (ENV_CONTINUE_ON_ERROR, "yes"),
            (ENV_LOG_FORMAT, "json"),
            ("RUST_LOG", "core_sync=trace"),
        ]))
        .unwrap();

        assert!(!config.folder_filter.only_marked);
        assert_eq!(config.drive.root_folder_name, "Lectures");
        assert_eq!(config.drive.token_cache_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.transfer_failure_policy, TransferFailurePolicy::Continue);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter.as_deref(), Some("core_sync=trace"));
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let result = MirrorConfig::from_lookup(env(&[
            (ENV_USERNAME, "student"),
            (ENV_PASSWORD, "secret"),
            (ENV_ONLY_MARKED, "sometimes"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_retry_bounds_validated() {
        let result = MirrorConfig::builder()
            .credentials("student", "secret")
            .retry(RetryConfig {
                initial_delay: Duration::from_secs(5),
                max_delay: Duration::from_secs(1),
            })
            .build();
        assert!(result.is_err());

        let result = MirrorConfig::builder()
            .credentials("student", "secret")
            .max_videos_per_folder(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_sso_replacement_keeps_credentials() {
        let sso = SsoConfig {
            idp_login_url: "https://idp.example.edu/login".to_string(),
            ..SsoConfig::default()
        };
        let config = MirrorConfig::builder()
            .credentials("student", "secret")
            .sso(sso)
            .build()
            .unwrap();

        assert_eq!(config.sso.idp_login_url, "https://idp.example.edu/login");
        assert_eq!(config.sso.username, "student");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = MirrorConfig::builder()
            .credentials("student", "hunter2")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("student"));
        assert!(debug.contains("[REDACTED]"));
    }
}
