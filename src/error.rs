use thiserror::Error;

/// Error taxonomy for the guard.
///
/// Storage errors are absorbed at the engine boundary: a `Decode` on load is
/// treated as an absent record and a `Backend` failure on save is reported
/// without aborting the decision already computed.
#[derive(Error, Debug)]
pub enum GuardError {
    /// A stored payload could not be parsed into a client record
    #[error("failed to decode client record: {0}")]
    Decode(#[from] serde_json::Error),

    /// The storage backend is unreachable or an I/O operation failed
    #[error("storage backend unavailable: {0}")]
    Backend(String),

    /// Invalid policy parameters or patterns, rejected at construction
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type GuardResult<T> = Result<T, GuardError>;

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::Backend(err.to_string())
    }
}

impl From<redis::RedisError> for GuardError {
    fn from(err: redis::RedisError) -> Self {
        GuardError::Backend(err.to_string())
    }
}
