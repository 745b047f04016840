use thiserror::Error;

/// Failures of a claim store backend.
///
/// Everything except [`StoreError::InvalidUrl`] means the backend could not answer, which is
/// different from a key having been claimed already.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configured address could not be parsed into a backend.
    #[error("invalid claim store url: {0}")]
    InvalidUrl(#[source] redis::RedisError),

    /// No connection to the backend could be established.
    #[error("claim store connection failed: {0}")]
    Connect(#[source] redis::RedisError),

    /// The backend answered with an error or the transport broke mid command.
    #[error("claim store command failed: {0}")]
    Command(#[source] redis::RedisError),

    /// The backend did not answer within the configured budget.
    #[error("claim store timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl StoreError {
    /// True when the backend is unreachable or misbehaving, as opposed to misconfigured.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, StoreError::InvalidUrl(_))
    }
}

/// Errors from issuing or verifying one-time tokens.
///
/// A rejected token is not an error: verification returns `Ok(false)` for it.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing key is not configured")]
    MissingSigningKey,

    #[error("token lifetime must be at least one second")]
    InvalidTtl,

    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TokenError {
    /// Deployment problems rather than bad input or an unavailable backend.
    pub fn is_configuration(&self) -> bool {
        match self {
            TokenError::MissingSigningKey => true,
            TokenError::Store(err) => !err.is_unavailable(),
            _ => false,
        }
    }
}
