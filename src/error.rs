//! Error types for rs2-observe
//!
//! Every failure the library itself can originate is a [`StreamError`].
//! Streams are generic over their error type; operations that need to
//! originate one of these require `E: From<StreamError>`.
//!
//! Uncaught errors are not wrapped. When an error notification reaches an
//! observer without an error callback, or a subscription that is already
//! closed, the original `E` is logged at `warn` and returned as `Err` to
//! whoever pushed it.

/// Main error type for observable stream operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A required argument is missing or has the wrong shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// `from` received a value none of its conversion paths accept
    #[error("{0} is not observable")]
    NotObservable(String),
    /// `reduce` completed without a seed and without seeing a value
    #[error("Cannot reduce an empty sequence")]
    EmptySequence,
    /// The producer went away without ever terminating the subscription
    #[error("Operation cancelled")]
    Cancelled,
    /// A bounded bridge buffer could not accept another notification
    #[error("Buffer overflow")]
    BufferOverflow,
    /// Custom error with message
    #[error("Stream error: {0}")]
    Custom(String),
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::InvalidArgument(err.to_string())
    }
}

/// Result type for rs2-observe operations
pub type StreamResult<T> = Result<T, StreamError>;
