//! # Sync Driver
//!
//! Runs one mirror pass: lecture folders and recordings are read from a
//! [`LectureSource`], reconciled against the destination and missing
//! recordings are transferred.
//!
//! ## Workflow
//!
//! 1. Ensure the root destination folder exists
//! 2. List top-level lecture folders and keep those the [`FolderFilter`] accepts
//! 3. For each folder, list its recordings; a refused listing skips the folder
//! 4. Ensure the destination sub-folder once per folder
//! 5. For each recording, skip it if `<name>.mp4` exists, otherwise download
//!    and upload it
//!
//! Everything runs sequentially. What happens when a single recording fails
//! to transfer is decided by [`TransferFailurePolicy`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{Reconciler, SyncDriver};
//!
//! let driver = SyncDriver::new(&config, source, reconciler, transfer);
//! let report = driver.run().await?;
//! println!("{} recordings uploaded", report.videos_transferred);
//! ```

use core_runtime::config::{MirrorConfig, TransferFailurePolicy};
use provider_panopto::{FolderRef, LectureSource, VideoRef};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::filter::FolderFilter;
use crate::reconciler::Reconciler;
use crate::transfer::VideoTransfer;

/// Stage of a mirror run, traced at every transition.
///
/// `Start` and `Authenticated` belong to whoever signs in to both sides;
/// the driver traces the stages from `FoldersListed` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Start,
    Authenticated,
    FoldersListed,
    VideosListed,
    Reconciled,
    Skipped,
    Transferred,
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Start => "start",
            SyncPhase::Authenticated => "authenticated",
            SyncPhase::FoldersListed => "folders_listed",
            SyncPhase::VideosListed => "videos_listed",
            SyncPhase::Reconciled => "reconciled",
            SyncPhase::Skipped => "skipped",
            SyncPhase::Transferred => "transferred",
            SyncPhase::Done => "done",
        };
        f.write_str(name)
    }
}

impl SyncPhase {
    /// Record the transition into this phase.
    pub fn trace(self) {
        debug!(phase = %self, "Sync phase");
    }
}

/// A recording that could not be mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    pub folder: String,
    pub video: String,
    pub message: String,
}

/// Counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub folders_seen: usize,
    pub folders_qualifying: usize,
    /// Folders whose recording listing was refused
    pub folders_skipped: usize,
    pub videos_seen: usize,
    /// Already present at the destination
    pub videos_skipped: usize,
    pub videos_transferred: usize,
    pub videos_failed: usize,
    /// Only filled under [`TransferFailurePolicy::Continue`]
    pub failures: Vec<TransferFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrates a single mirror run.
pub struct SyncDriver {
    source: Arc<dyn LectureSource>,
    reconciler: Reconciler,
    transfer: Arc<dyn VideoTransfer>,
    filter: FolderFilter,
    root_folder_name: String,
    max_videos_per_folder: u32,
    failure_policy: TransferFailurePolicy,
}

impl SyncDriver {
    /// Create a driver
    ///
    /// # Arguments
    ///
    /// * `config` - Run configuration (root folder, filter, listing limit, failure policy)
    /// * `source` - Lecture listing built on an authenticated session
    /// * `reconciler` - Destination reconciler built on an authenticated store
    /// * `transfer` - Downloader for recording payloads
    pub fn new(
        config: &MirrorConfig,
        source: Arc<dyn LectureSource>,
        reconciler: Reconciler,
        transfer: Arc<dyn VideoTransfer>,
    ) -> Self {
        Self {
            source,
            reconciler,
            transfer,
            filter: FolderFilter::new(&config.folder_filter),
            root_folder_name: config.drive.root_folder_name.clone(),
            max_videos_per_folder: config.panopto.max_videos_per_folder,
            failure_policy: config.transfer_failure_policy,
        }
    }

    /// Run one mirror pass.
    ///
    /// Listing and destination errors end the run. Transfer errors end it
    /// under [`TransferFailurePolicy::Abort`]; completed uploads stay in place.
    #[instrument(skip(self), fields(root = %self.root_folder_name))]
    pub async fn run(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::default();

        let root_id = self
            .reconciler
            .ensure_folder(&self.root_folder_name, None)
            .await?;

        let folders = self.source.list_top_folders().await?;
        report.folders_seen = folders.len();
        SyncPhase::FoldersListed.trace();

        for folder in folders.iter().filter(|folder| self.filter.qualifies(folder)) {
            report.folders_qualifying += 1;
            self.sync_folder(folder, &root_id, &mut report).await?;
        }

        SyncPhase::Done.trace();
        info!(
            folders_seen = report.folders_seen,
            folders_qualifying = report.folders_qualifying,
            folders_skipped = report.folders_skipped,
            videos_seen = report.videos_seen,
            videos_skipped = report.videos_skipped,
            videos_transferred = report.videos_transferred,
            videos_failed = report.videos_failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Mirror run complete"
        );

        Ok(report)
    }

    #[instrument(skip(self, folder, root_id, report), fields(folder = %folder.name))]
    async fn sync_folder(
        &self,
        folder: &FolderRef,
        root_id: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        let videos = match self
            .source
            .list_videos(&folder.id, self.max_videos_per_folder)
            .await?
        {
            Some(videos) => videos,
            None => {
                warn!(folder_id = %folder.id, "Recording listing unavailable; skipping folder");
                report.folders_skipped += 1;
                return Ok(());
            }
        };
        SyncPhase::VideosListed.trace();
        info!(count = videos.len(), "Processing lecture folder");

        let folder_id = self
            .reconciler
            .ensure_folder(&folder.name, Some(root_id))
            .await?;

        for video in &videos {
            report.videos_seen += 1;

            let present = self.reconciler.exists(&video.name, &folder_id).await?;
            SyncPhase::Reconciled.trace();

            if present {
                debug!(video = %video.name, "Already mirrored");
                report.videos_skipped += 1;
                SyncPhase::Skipped.trace();
                continue;
            }

            match self.transfer_video(video, &folder_id).await {
                Ok(()) => {
                    report.videos_transferred += 1;
                    SyncPhase::Transferred.trace();
                }
                Err(e) => {
                    report.videos_failed += 1;
                    match self.failure_policy {
                        TransferFailurePolicy::Abort => return Err(e),
                        TransferFailurePolicy::Continue => {
                            error!(video = %video.name, error = %e, "Transfer failed; continuing");
                            report.failures.push(TransferFailure {
                                folder: folder.name.clone(),
                                video: video.name.clone(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn transfer_video(&self, video: &VideoRef, folder_id: &str) -> Result<()> {
        info!(video = %video.name, "Transferring recording");

        let download_started = Instant::now();
        let content = self.transfer.fetch(video).await?;
        debug!(
            video = %video.name,
            bytes = content.len(),
            elapsed_ms = download_started.elapsed().as_millis() as u64,
            "Download finished"
        );

        let upload_started = Instant::now();
        self.reconciler
            .upload(&video.name, folder_id, content)
            .await
            .map_err(|e| SyncError::transfer(&video.name, e.to_string()))?;
        debug!(
            video = %video.name,
            elapsed_ms = upload_started.elapsed().as_millis() as u64,
            "Upload finished"
        );

        Ok(())
    }
}
