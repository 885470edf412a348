/// Errors produced by the rawdata transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RawdataError {
    /// The client, producer, or consumer has been closed.
    #[error("rawdata stream is closed")]
    Closed,

    /// No provider is registered under the configured name.
    #[error("unknown rawdata provider: {0}")]
    UnknownProvider(String),

    /// Failure surfaced by the backend; passed through unchanged.
    #[error("rawdata backend failure: {0}")]
    Backend(String),
}

/// Convenience alias used throughout the rawdata crate.
pub type Result<T> = std::result::Result<T, RawdataError>;
