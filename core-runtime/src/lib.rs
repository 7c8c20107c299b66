//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the lecture mirror:
//! - Logging and tracing infrastructure
//! - Configuration management (builder and environment loading)
//!
//! Every other crate in the workspace receives its settings from
//! [`config::MirrorConfig`] at construction time; nothing reads global state.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    DriveConfig, FolderFilterConfig, MirrorConfig, MirrorConfigBuilder, PanoptoConfig,
    RetryConfig, SsoConfig, TransferFailurePolicy,
};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
