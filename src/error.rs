//! Error handling for the streamwarden engine

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
///
/// The taxonomy follows the engine's propagation policy: `Unreachable`
/// terminates a session, `DecodeFailure` is local to one frame or window,
/// `ModelUnavailable` disables one modality for the session's lifetime,
/// and mid-stream I/O errors trigger the reconnect path.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Stream address is not live (terminal for the session)
    #[error("Stream unreachable: {0}")]
    Unreachable(String),

    /// A single packet/frame/window failed to decode (logged and skipped)
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// A detection or transcription model failed to load or respond
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Mid-stream read failure (triggers reconnect with delay)
    #[error("Transient IO error: {0}")]
    TransientIo(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stream address resolution error
    #[error("Resolve error: {0}")]
    Resolve(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
