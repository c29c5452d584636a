use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Statistics about a dictation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictationStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// When the most recent session started
    pub started_at: Option<DateTime<Utc>>,

    /// Total duration of the most recent session in seconds
    pub duration_secs: f64,

    /// Number of audio frames transmitted
    pub frames_sent: usize,

    /// Number of transcript fragments received
    pub fragments_received: usize,

    /// Length of the confirmed transcript in characters
    pub confirmed_chars: usize,
}
