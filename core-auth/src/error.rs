use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// A session checkpoint did not produce the cookies it should have.
    #[error("Session checkpoint '{stage}' is missing cookies: {}", missing.join(", "))]
    MissingCookies { stage: String, missing: Vec<String> },

    #[error("Identity provider rejected the credentials: {0}")]
    InvalidCredentials(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Authorization grant failed: {0}")]
    GrantFailed(String),

    #[error("OAuth state mismatch (expected {expected}, got {actual})")]
    StateMismatch { expected: String, actual: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Invalid OAuth client secrets: {0}")]
    InvalidClientSecrets(String),

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// The supplied credentials themselves are bad; retrying will not help.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials(_)
                | AuthError::TokenRefreshFailed(_)
                | AuthError::GrantFailed(_)
                | AuthError::StateMismatch { .. }
        )
    }

    /// The session negotiation did not reach an authenticated state.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, AuthError::MissingCookies { .. })
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
