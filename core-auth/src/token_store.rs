//! Session Token Store
//!
//! Owns the destination storage credential for the lifetime of a run:
//! loads the cached credential, refreshes it when it has expired, falls back
//! to an interactive grant when nothing usable is cached, and persists
//! whatever it obtained.
//!
//! ## Security Features
//!
//! - Tokens are never logged or exposed in error messages
//! - Storage goes through the `SecureStore` trait
//! - A corrupted cache entry is deleted rather than trusted
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{LoopbackGrantProvider, OAuthConfig, OAuthFlowManager, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::{http::HttpClient, storage::SecureStore};
//! # async fn example(
//! #     secure_store: Arc<dyn SecureStore>,
//! #     http: Arc<dyn HttpClient>,
//! #     config: OAuthConfig,
//! # ) -> core_auth::Result<()> {
//! let flow = Arc::new(OAuthFlowManager::new(config.clone(), Arc::clone(&http)));
//! let grant = Arc::new(LoopbackGrantProvider::new(config, http));
//! let store = TokenStore::new(secure_store, flow, grant);
//!
//! let credential = store.authenticate().await?;
//! let bearer = store.access_token().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::grant::AuthorizationGrantProvider;
use crate::oauth::OAuthFlowManager;
use crate::types::DriveCredential;
use async_trait::async_trait;
use bridge_traits::storage::SecureStore;
use bridge_traits::time::{Clock, SystemClock};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Default secure store key of the cached credential.
pub const DEFAULT_TOKEN_KEY: &str = "drive_token";

/// Supplier of bearer tokens for API calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Cached, self-refreshing destination credential.
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    flow: Arc<OAuthFlowManager>,
    grant: Arc<dyn AuthorizationGrantProvider>,
    clock: Arc<dyn Clock>,
    key: String,
    current: Mutex<Option<DriveCredential>>,
}

impl TokenStore {
    pub fn new(
        secure_store: Arc<dyn SecureStore>,
        flow: Arc<OAuthFlowManager>,
        grant: Arc<dyn AuthorizationGrantProvider>,
    ) -> Self {
        debug!("Initializing TokenStore");
        Self {
            secure_store,
            flow,
            grant,
            clock: Arc::new(SystemClock),
            key: DEFAULT_TOKEN_KEY.to_string(),
            current: Mutex::new(None),
        }
    }

    /// Store the credential under `key` instead of [`DEFAULT_TOKEN_KEY`].
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Produce a valid credential.
    ///
    /// 1. A cached credential that has not expired is returned as is.
    /// 2. An expired one with a refresh token is refreshed. If that fails
    ///    the error is returned; no interactive grant is attempted.
    /// 3. Otherwise the grant provider is asked for a new credential.
    ///
    /// Refreshed and newly granted credentials are persisted before return.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn authenticate(&self) -> Result<DriveCredential> {
        let mut current = self.current.lock().await;

        if current.is_none() {
            *current = self.load().await?;
        }

        let credential = self.ensure_valid(current.take()).await?;
        *current = Some(credential.clone());
        Ok(credential)
    }

    /// Bearer token for the next API call, refreshed transparently if it expired mid-run.
    pub async fn access_token(&self) -> Result<String> {
        {
            let current = self.current.lock().await;
            if let Some(credential) = current.as_ref() {
                if !credential.is_expired_at(self.clock.now()) {
                    return Ok(credential.access_token.clone());
                }
            }
        }

        Ok(self.authenticate().await?.access_token)
    }

    async fn ensure_valid(&self, cached: Option<DriveCredential>) -> Result<DriveCredential> {
        let now = self.clock.now();

        let credential = match cached {
            Some(credential) if !credential.is_expired_at(now) => {
                debug!("Cached credential is valid");
                return Ok(credential);
            }
            Some(credential) if credential.can_refresh() => {
                info!("Cached credential expired; refreshing");
                let refresh_token = credential.refresh_token.unwrap_or_default();
                self.flow.refresh_access_token(&refresh_token).await?
            }
            Some(_) => {
                info!("Cached credential expired without refresh token; requesting authorization");
                self.grant.grant().await?
            }
            None => {
                info!("No cached credential; requesting authorization");
                self.grant.grant().await?
            }
        };

        self.persist(&credential).await?;
        Ok(credential)
    }

    async fn load(&self) -> Result<Option<DriveCredential>> {
        let data = self
            .secure_store
            .get_secret(&self.key)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read credential cache");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(data) = data else {
            debug!("No credential cached");
            return Ok(None);
        };

        match serde_json::from_slice::<DriveCredential>(&data) {
            Ok(credential) => {
                debug!(expires_at = %credential.expires_at, "Loaded cached credential");
                Ok(Some(credential))
            }
            Err(e) => {
                warn!(error = %e, "Cached credential is corrupted; discarding it");
                if let Err(e) = self.secure_store.delete_secret(&self.key).await {
                    warn!(error = %e, "Failed to delete corrupted credential cache");
                }
                Ok(None)
            }
        }
    }

    async fn persist(&self, credential: &DriveCredential) -> Result<()> {
        let json = serde_json::to_vec(credential)
            .map_err(|e| AuthError::Other(format!("Failed to serialize credential: {}", e)))?;

        self.secure_store
            .set_secret(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist credential");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            has_refresh_token = credential.can_refresh(),
            "Credential persisted"
        );
        Ok(())
    }
}

#[async_trait]
impl AccessTokenSource for TokenStore {
    async fn access_token(&self) -> Result<String> {
        TokenStore::access_token(self).await
    }
}
