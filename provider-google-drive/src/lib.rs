//! # Google Drive Provider
//!
//! Implements the `DestinationStore` trait for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Exact-name folder and file lookup scoped to a parent folder
//! - Folder creation
//! - Multipart upload of whole files
//! - Classification of failures into transient and permanent
//!
//! Bearer tokens come from a [`core_auth::AccessTokenSource`], so expired
//! tokens are refreshed between calls without the connector knowing how.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{build_query, escape_query_value, GoogleDriveConnector};
pub use error::{GoogleDriveError, Result};
