//! Error types for the Panopto provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Lecture platform errors
///
/// A folder whose session listing is refused is not an error; see
/// [`LectureSource::list_videos`](crate::LectureSource::list_videos).
#[derive(Error, Debug)]
pub enum PanoptoError {
    /// API request returned an error status
    #[error("Panopto API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse Panopto response: {0}")]
    ParseError(String),

    /// Request could not be sent or the reply not received
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Result type for Panopto operations
pub type Result<T> = std::result::Result<T, PanoptoError>;

impl From<BridgeError> for PanoptoError {
    fn from(error: BridgeError) -> Self {
        PanoptoError::NetworkError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PanoptoError::ApiError {
            status_code: 401,
            message: "Unauthorized".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Panopto API error (status 401): Unauthorized"
        );
    }

    #[test]
    fn test_bridge_error_conversion() {
        let error: PanoptoError = BridgeError::OperationFailed("reset".to_string()).into();
        assert!(matches!(error, PanoptoError::NetworkError(_)));
    }
}
