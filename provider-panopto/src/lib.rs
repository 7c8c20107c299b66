//! # Panopto Provider
//!
//! Enumerates lecture folders and recordings from a Panopto site over an
//! authenticated session.
//!
//! ## Overview
//!
//! - [`LectureSource`]: the read contract the sync driver depends on
//! - [`PanoptoClient`]: implementation against the Panopto web API
//! - [`rewrite_manifest_url`]: HLS manifest to direct MP4 download URL

pub mod client;
pub mod error;
pub mod types;

pub use client::{rewrite_manifest_url, LectureSource, PanoptoClient};
pub use error::{PanoptoError, Result};
pub use types::{FolderRef, VideoRef};
