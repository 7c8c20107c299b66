//! Storage Abstractions
//!
//! Credential persistence for the OAuth token cache and the destination
//! storage service videos are mirrored into.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{DestinationResult, Result};

/// Secure credential storage trait
///
/// Abstracts where long-lived credentials are kept. The desktop adapter
/// writes one file per key; hosts with a keychain can plug that in instead.
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Never log or expose secret values
/// - Overwrite previous values atomically where the platform allows
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn store_token(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("drive_token", token.as_bytes()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

/// Kind of entry a destination lookup matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
}

/// Exact-name lookup against destination storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub kind: EntryKind,
    pub name: String,
    pub parent: Option<String>,
}

impl EntryQuery {
    pub fn folder(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            kind: EntryKind::Folder,
            name: name.into(),
            parent: parent.map(str::to_string),
        }
    }

    pub fn file(name: impl Into<String>, parent: &str) -> Self {
        Self {
            kind: EntryKind::File,
            name: name.into(),
            parent: Some(parent.to_string()),
        }
    }
}

/// Entry returned by a destination lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
}

/// Destination storage provider
///
/// The minimal object/folder API the mirror needs: exact-name lookup,
/// folder creation and whole-file upload. Every method is a single remote
/// call; retry lives with the caller.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{DestinationStore, EntryQuery};
///
/// async fn find_root(store: &dyn DestinationStore) -> DestinationResult<Option<String>> {
///     let hits = store.find(&EntryQuery::folder("Panopto Videos", None)).await?;
///     Ok(hits.into_iter().next().map(|entry| entry.id))
/// }
/// ```
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// List entries matching the query exactly (trashed entries excluded)
    async fn find(&self, query: &EntryQuery) -> DestinationResult<Vec<RemoteEntry>>;

    /// Create a folder and return its id
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> DestinationResult<String>;

    /// Upload `content` as a new file under `parent` and return its id
    async fn create_file(
        &self,
        name: &str,
        parent: &str,
        mime_type: &str,
        content: Bytes,
    ) -> DestinationResult<String>;
}
