use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Geometry or steering table rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("client id {client_id} out of range ({clients} clients configured)")]
    InvalidClientId { client_id: usize, clients: usize },
    /// Reached only if address decomposition or LRU bookkeeping is broken.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

pub(crate) fn invalid_config(msg: impl Into<String>) -> CacheError {
    CacheError::InvalidConfiguration(msg.into())
}
