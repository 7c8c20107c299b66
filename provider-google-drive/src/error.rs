//! Error types for Google Drive provider

use bridge_traits::error::{BridgeError, DestinationError};
use core_auth::AuthError;
use thiserror::Error;

use crate::types::ApiErrorResponse;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// No bearer token could be obtained
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(#[from] AuthError),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for DestinationError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::AuthenticationFailed(AuthError::NetworkError(msg)) => {
                DestinationError::Transient(format!("Token endpoint unreachable: {}", msg))
            }
            GoogleDriveError::AuthenticationFailed(e) => {
                DestinationError::Permanent(format!("Authentication failed: {}", e))
            }
            GoogleDriveError::ApiError {
                status_code: 403,
                message,
            } if ApiErrorResponse::is_rate_limited(&message) => {
                DestinationError::Transient(format!("status 403: {}", message))
            }
            GoogleDriveError::ApiError {
                status_code,
                message,
            } => DestinationError::from_status(status_code, message),
            GoogleDriveError::ParseError(msg) => {
                DestinationError::Permanent(format!("Parse error: {}", msg))
            }
            GoogleDriveError::BridgeError(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GoogleDriveError::ApiError {
            status_code: 404,
            message: "File not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 404): File not found"
        );
    }

    #[test]
    fn test_destination_classification() {
        let transient: DestinationError = GoogleDriveError::ApiError {
            status_code: 503,
            message: "backend error".to_string(),
        }
        .into();
        assert!(transient.is_transient());

        let permanent: DestinationError = GoogleDriveError::ApiError {
            status_code: 403,
            message: "insufficient permissions".to_string(),
        }
        .into();
        assert!(!permanent.is_transient());

        let throttled: DestinationError = GoogleDriveError::ApiError {
            status_code: 403,
            message: r#"{"error":{"errors":[{"domain":"usageLimits","reason":"rateLimitExceeded"}],"code":403}}"#
                .to_string(),
        }
        .into();
        assert!(throttled.is_transient());

        let network: DestinationError =
            GoogleDriveError::BridgeError(BridgeError::OperationFailed("reset".to_string())).into();
        assert!(network.is_transient());

        let revoked: DestinationError = GoogleDriveError::AuthenticationFailed(
            AuthError::TokenRefreshFailed("invalid_grant".to_string()),
        )
        .into();
        assert!(!revoked.is_transient());
    }
}
