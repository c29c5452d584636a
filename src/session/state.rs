use serde::{Deserialize, Serialize};

/// Session lifecycle state.
///
/// `Idle -> Connecting -> Streaming -> Closed`. Permission denial or a
/// connection failure short-circuits `Connecting -> Closed`. Nothing
/// leaves `Closed`; a later `start()` begins a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No session has run yet
    Idle,
    /// Acquiring the microphone and opening the stream
    Connecting,
    /// Audio flowing out, fragments flowing in
    Streaming,
    /// Session ended; all resources released
    Closed,
}

impl SessionState {
    /// Whether a session currently holds resources. The host should
    /// disable submit actions while this is true.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Streaming)
    }
}
