//! Dictation session management
//!
//! This module provides the `DictationSession` abstraction that manages:
//! - Microphone capture and PCM encoding
//! - The streaming transcription connection
//! - Incremental transcript reconciliation and live text callbacks
//! - Deterministic resource release on stop, remote close, and errors

mod config;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use session::{CaptureBuilder, DictationSession};
pub use state::SessionState;
pub use stats::DictationStats;
