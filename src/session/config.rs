use serde::{Deserialize, Serialize};

/// Configuration for a dictation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Streaming transcription endpoint (ws/wss URL)
    pub endpoint: String,

    /// Sample rate for captured audio (the backend expects 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Duration of each transmitted audio block in milliseconds
    pub frame_duration_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("dictation-{}", uuid::Uuid::new_v4()),
            endpoint: "ws://localhost:9000/stream".to_string(),
            sample_rate: 16000, // Backend expects 16kHz
            channels: 1,        // Mono
            frame_duration_ms: 100,
        }
    }
}
