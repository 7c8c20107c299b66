//! Credential types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds before the recorded expiry at which a token is already treated as expired.
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// OAuth credential for the destination storage API.
///
/// # Examples
///
/// ```
/// use core_auth::DriveCredential;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let credential = DriveCredential::new("ya29.a0", Some("1//0g".to_string()), now + Duration::hours(1));
///
/// assert!(!credential.is_expired_at(now));
/// assert!(credential.can_refresh());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCredential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl DriveCredential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }

    /// Build a credential from a token endpoint reply received at `now`.
    pub fn from_expires_in(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(access_token, refresh_token, now + Duration::seconds(expires_in))
    }

    /// Expired, or within [`EXPIRY_SKEW_SECONDS`] of expiring, at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(EXPIRY_SKEW_SECONDS)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

// Tokens never reach logs
impl fmt::Debug for DriveCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveCredential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
