use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure reported by a [`DestinationStore`](crate::storage::DestinationStore).
///
/// Adapters decide the class; callers only retry [`DestinationError::Transient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    /// Network failure, timeout, rate limit or server-side error
    #[error("Transient destination failure: {0}")]
    Transient(String),

    /// Request rejected or response malformed; retrying will not help
    #[error("Destination rejected request: {0}")]
    Permanent(String),
}

impl DestinationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DestinationError::Transient(_))
    }

    /// Classify an HTTP status code returned by a destination API.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = format!("status {}: {}", status, message.into());
        if status == 408 || status == 429 || (500..600).contains(&status) {
            DestinationError::Transient(message)
        } else {
            DestinationError::Permanent(message)
        }
    }
}

impl From<BridgeError> for DestinationError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::NotAvailable(msg) => DestinationError::Permanent(msg),
            other => DestinationError::Transient(other.to_string()),
        }
    }
}

pub type DestinationResult<T> = std::result::Result<T, DestinationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(DestinationError::from_status(503, "unavailable").is_transient());
        assert!(DestinationError::from_status(429, "slow down").is_transient());
        assert!(DestinationError::from_status(408, "timeout").is_transient());
        assert!(!DestinationError::from_status(400, "bad query").is_transient());
        assert!(!DestinationError::from_status(404, "no parent").is_transient());
    }

    #[test]
    fn test_bridge_error_is_transient() {
        let error: DestinationError =
            BridgeError::OperationFailed("connection reset".to_string()).into();
        assert!(error.is_transient());
    }
}
