//! # Host Bridge Traits
//!
//! Platform abstraction traits implemented by host adapters.
//!
//! ## Overview
//!
//! This crate defines the contract between the mirror core and the concrete
//! adapters that talk to the network and the disk. Each trait represents a
//! capability the core requires but that is implemented elsewhere (desktop
//! adapters in `bridge-desktop`, Google Drive in `provider-google-drive`).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations, one attempt per call
//! - [`CookieSession`](http::CookieSession) - HTTP client with an inspectable cookie jar
//!
//! ### Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (token cache)
//! - [`DestinationStore`](storage::DestinationStore) - Lookup/create API of the mirror target
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! Adapters report transport failures as [`BridgeError`](error::BridgeError).
//! Destination adapters classify failures as
//! [`DestinationError`](error::DestinationError) so callers can retry only
//! what is worth retrying.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared behind
//! `Arc` across async tasks.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::{BridgeError, DestinationError, DestinationResult};

// Re-export commonly used types
pub use http::{CookieSession, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{DestinationStore, EntryKind, EntryQuery, RemoteEntry, SecureStore};
pub use time::{Clock, LogLevel, SystemClock};
