use reap_crypto::CryptoError;
use reap_rawdata::RawdataError;

/// Errors produced by content-store operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The store, stream, producer, or consumer has been closed.
    #[error("content stream is closed")]
    ClosedStream,

    /// A thread waiting to acquire a topic lock observed a panicked holder.
    /// The lock was not acquired.
    #[error("interrupted while acquiring the lock for topic {topic}")]
    LockInterrupted { topic: String },

    /// `unlock` called by a thread that does not hold the topic lock.
    #[error("lock for topic {topic} is not held by the calling thread")]
    LockNotHeld { topic: String },

    /// Failure from the rawdata backend; passed through unchanged.
    #[error("rawdata backend error: {0}")]
    Backend(#[from] RawdataError),

    /// Key derivation or payload sealing failure.
    #[error("encryption error: {0}")]
    Crypto(#[from] CryptoError),

    /// Manifest JSON could not be produced.
    #[error("manifest serialization failed: {0}")]
    Serialization(String),

    /// Invalid or incomplete construction-time configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout the content crate.
pub type Result<T> = std::result::Result<T, ContentError>;
