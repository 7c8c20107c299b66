use bridge_traits::error::DestinationError;
use provider_panopto::PanoptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Enumeration failed: {0}")]
    Enumeration(#[from] PanoptoError),

    #[error("Destination error: {0}")]
    Destination(#[from] DestinationError),

    #[error("Transfer of '{video}' failed: {message}")]
    Transfer { video: String, message: String },
}

impl SyncError {
    pub fn transfer(video: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Transfer {
            video: video.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_display() {
        let error = SyncError::transfer("Lecture 3", "connection reset");
        assert_eq!(
            error.to_string(),
            "Transfer of 'Lecture 3' failed: connection reset"
        );
    }

    #[test]
    fn test_destination_conversion() {
        let error: SyncError = DestinationError::Permanent("bad parent".to_string()).into();
        assert!(matches!(error, SyncError::Destination(_)));
    }
}
