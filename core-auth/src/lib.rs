//! # Authentication Module
//!
//! Everything the mirror needs to act on behalf of the user.
//!
//! ## Overview
//!
//! - [`sso`]: browser-less SAML login against the institutional identity
//!   provider, producing a cookie-carrying [`SsoSession`] for the lecture
//!   platform
//! - [`token_store`]: cached, self-refreshing OAuth credential for Google Drive
//! - [`oauth`]: OAuth 2.0 authorization code flow with PKCE
//! - [`grant`]: interactive consent through a loopback redirect listener
//!
//! Errors are reported as [`AuthError`]; see
//! [`AuthError::is_credential_error`] and
//! [`AuthError::is_authentication_error`] for the two failure families.

pub mod error;
pub mod grant;
pub mod oauth;
pub mod sso;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use grant::{AuthorizationGrantProvider, LoopbackGrantProvider};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use sso::{SsoNegotiator, SsoSession};
pub use token_store::{AccessTokenSource, TokenStore};
pub use types::DriveCredential;
