//! # Destination Reconciler
//!
//! Check-then-create operations against the mirror target. Each remote call
//! runs under the [`RetryPolicy`] so a flaky destination slows the run down
//! instead of failing it.

use bridge_traits::error::DestinationResult;
use bridge_traits::storage::{DestinationStore, EntryQuery};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Extension given to every mirrored recording.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// MIME type of uploaded recordings.
pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Destination file name of a recording.
pub fn video_file_name(item_name: &str) -> String {
    format!("{}{}", item_name, VIDEO_EXTENSION)
}

pub struct Reconciler {
    store: Arc<dyn DestinationStore>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DestinationStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the timer used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Return the id of the folder `name` under `parent`, creating it if absent.
    ///
    /// When several folders share the name the first one returned wins.
    /// Assumes a single writer: two concurrent runs can both miss the folder
    /// and each create one.
    #[instrument(skip(self))]
    pub async fn ensure_folder(&self, name: &str, parent: Option<&str>) -> DestinationResult<String> {
        let store = self.store.as_ref();
        let query = EntryQuery::folder(name, parent);

        let existing = self
            .policy
            .run(self.sleeper.as_ref(), "find_folder", || store.find(&query))
            .await?;

        if let Some(entry) = existing.into_iter().next() {
            debug!(folder_id = %entry.id, "Destination folder exists");
            return Ok(entry.id);
        }

        let id = self
            .policy
            .run(self.sleeper.as_ref(), "create_folder", || {
                store.create_folder(name, parent)
            })
            .await?;

        info!(folder_id = %id, "Created destination folder");
        Ok(id)
    }

    /// Whether `parent` already holds `<item_name>.mp4`.
    #[instrument(skip(self))]
    pub async fn exists(&self, item_name: &str, parent: &str) -> DestinationResult<bool> {
        let store = self.store.as_ref();
        let query = EntryQuery::file(video_file_name(item_name), parent);

        let matches = self
            .policy
            .run(self.sleeper.as_ref(), "find_file", || store.find(&query))
            .await?;

        Ok(!matches.is_empty())
    }

    /// Store `content` as `<item_name>.mp4` under `parent`.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upload(
        &self,
        item_name: &str,
        parent: &str,
        content: Bytes,
    ) -> DestinationResult<String> {
        let store = self.store.as_ref();
        let file_name = video_file_name(item_name);

        self.policy
            .run(self.sleeper.as_ref(), "create_file", || {
                store.create_file(&file_name, parent, VIDEO_MIME_TYPE, content.clone())
            })
            .await
    }
}
