//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `CookieSession` using `reqwest` with a `cookie_store` jar
//! - `SecureStore` writing one file per key
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileSecureStore, ReqwestCookieSession, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let sso_session = ReqwestCookieSession::new()?;
//!     let token_cache = FileSecureStore::new(".");
//!
//!     // Use in service bootstrap
//!     Ok(())
//! }
//! ```

mod http;
mod secure_store;

pub use http::{ReqwestCookieSession, ReqwestHttpClient};
pub use secure_store::FileSecureStore;
