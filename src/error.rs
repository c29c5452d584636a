//! Error types for dictation sessions.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Fatal session errors surfaced to the caller.
///
/// Non-fatal conditions (malformed transcript messages, backend-reported
/// errors, a single failed frame transmission) are logged and never surface
/// here.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Microphone could not be acquired (no device, or access refused).
    /// The caller should instruct the user to enable microphone access.
    #[error("microphone unavailable or permission denied: {0}")]
    PermissionDenied(String),

    /// The streaming transcription connection could not be opened.
    #[error("transcription stream connection failed: {0}")]
    Connection(String),

    /// A session is already connecting or streaming on this control.
    #[error("a dictation session is already active")]
    AlreadyActive,
}
