//! Core service façade and bootstrap.
//!
//! This crate wires the desktop bridge implementations (HTTP clients, token
//! cache on disk) into the mirror components and runs one sync. Everything
//! is built from a single [`MirrorConfig`].

pub mod error;

pub use error::{CoreError, Result};

use std::path::Path;
use std::sync::Arc;

use bridge_desktop::{FileSecureStore, ReqwestCookieSession, ReqwestHttpClient};
use bridge_traits::http::HttpClient;
use core_auth::{LoopbackGrantProvider, OAuthConfig, OAuthFlowManager, SsoNegotiator, TokenStore};
use core_runtime::config::MirrorConfig;
use core_sync::{HttpVideoTransfer, Reconciler, RetryPolicy, SyncDriver, SyncPhase, SyncReport};
use provider_google_drive::GoogleDriveConnector;
use provider_panopto::PanoptoClient;
use tracing::{info, instrument, warn};

/// Primary façade exposed to the binary.
#[derive(Clone)]
pub struct MirrorService {
    config: Arc<MirrorConfig>,
}

impl MirrorService {
    /// Create a service after validating `config`.
    pub fn new(config: MirrorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Sign in to both sides and mirror every qualifying lecture folder once.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SyncReport> {
        let config = self.config.as_ref();
        SyncPhase::Start.trace();
        let api_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);

        let sso_client = Arc::new(ReqwestCookieSession::new()?);
        let session = SsoNegotiator::new(config.sso.clone(), sso_client)
            .negotiate()
            .await?;
        info!("Lecture platform session established");

        let tokens = Arc::new(self.token_store(Arc::clone(&api_client)).await?);
        tokens.authenticate().await?;
        info!("Destination storage authorized");
        SyncPhase::Authenticated.trace();

        // Payload transfers run as long as the recording takes.
        let media_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(None)?);

        let source = Arc::new(PanoptoClient::new(Arc::new(session), &config.panopto));
        let destination = Arc::new(
            GoogleDriveConnector::new(Arc::clone(&api_client), tokens)
                .with_upload_client(Arc::clone(&media_client)),
        );
        let reconciler = Reconciler::new(destination, RetryPolicy::from(config.retry));
        let transfer = Arc::new(HttpVideoTransfer::new(media_client));

        let report = SyncDriver::new(config, source, reconciler, transfer)
            .run()
            .await?;

        for failure in &report.failures {
            warn!(
                folder = %failure.folder,
                video = %failure.video,
                error = %failure.message,
                "Recording not mirrored"
            );
        }

        Ok(report)
    }

    async fn token_store(&self, http_client: Arc<dyn HttpClient>) -> Result<TokenStore> {
        let drive = &self.config.drive;

        let secrets = tokio::fs::read(&drive.client_secrets_path)
            .await
            .map_err(|e| {
                CoreError::InitializationFailed(format!(
                    "Failed to read client secrets {}: {}",
                    drive.client_secrets_path.display(),
                    e
                ))
            })?;
        let oauth = OAuthConfig::from_client_secrets(&secrets, drive.scopes.clone())?;

        let (cache_dir, cache_key) = split_cache_path(&drive.token_cache_path)?;
        let secure_store = Arc::new(FileSecureStore::new(cache_dir));
        let flow = Arc::new(OAuthFlowManager::new(oauth.clone(), Arc::clone(&http_client)));
        let grant = Arc::new(LoopbackGrantProvider::new(oauth, http_client));

        Ok(TokenStore::new(secure_store, flow, grant).with_key(cache_key))
    }
}

/// Directory and file name of the token cache.
///
/// A bare file name resolves to the working directory.
pub fn split_cache_path(path: &Path) -> Result<(std::path::PathBuf, String)> {
    let key = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            CoreError::InitializationFailed(format!(
                "Token cache path has no file name: {}",
                path.display()
            ))
        })?
        .to_string();

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };

    Ok((dir, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_split_bare_file_name() {
        let (dir, key) = split_cache_path(Path::new("token.json")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(key, "token.json");
    }

    #[test]
    fn test_split_nested_path() {
        let (dir, key) = split_cache_path(Path::new("/var/lib/mirror/token.json")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/lib/mirror"));
        assert_eq!(key, "token.json");
    }

    #[test]
    fn test_split_rejects_directory_only() {
        assert!(split_cache_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = MirrorService::new(MirrorConfig::default()).err().unwrap();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_client_secrets() {
        let config = MirrorConfig::builder()
            .credentials("student", "hunter2")
            .client_secrets_path("/nonexistent/credentials.json")
            .build()
            .unwrap();
        let service = MirrorService::new(config).unwrap();
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new().unwrap());

        let err = service.token_store(http).await.err().unwrap();
        assert!(matches!(err, CoreError::InitializationFailed(_)));
    }
}
