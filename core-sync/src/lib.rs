//! # Sync Module
//!
//! Mirrors lecture recordings into destination storage.
//!
//! ## Overview
//!
//! This module manages one mirror run, including:
//! - Selecting lecture folders worth mirroring
//! - Reconciling folders and files against the destination
//! - Retrying transient destination failures with exponential backoff
//! - Downloading recordings and uploading the missing ones
//!
//! ## Components
//!
//! - **Folder Filter** (`filter`): Which lecture folders are mirrored
//! - **Retry Policy** (`retry`): Unbounded, capped exponential backoff
//! - **Reconciler** (`reconciler`): Check-then-create against the destination
//! - **Video Transfer** (`transfer`): Recording download
//! - **Sync Driver** (`driver`): Orchestrates a full run

pub mod driver;
pub mod error;
pub mod filter;
pub mod reconciler;
pub mod retry;
pub mod transfer;

pub use driver::{SyncDriver, SyncPhase, SyncReport, TransferFailure};
pub use error::{Result, SyncError};
pub use filter::FolderFilter;
pub use reconciler::{video_file_name, Reconciler, VIDEO_EXTENSION, VIDEO_MIME_TYPE};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use transfer::{HttpVideoTransfer, VideoTransfer};
