use quill_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    InvalidToken,

    #[error("kdf failure: {0}")]
    Kdf(String),
}

/// Everything collapses to Unauthorized at the boundary except KDF
/// breakage, which is an internal failure, not a credential problem.
impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired | AuthError::InvalidToken => CoreError::Unauthorized,
            AuthError::Kdf(detail) => CoreError::UpstreamTransient(detail),
        }
    }
}
