pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod transcript;

pub use audio::{
    AudioCapture, AudioCaptureConfig, AudioCaptureFactory, AudioFrame, CaptureSource,
    MicrophoneCapture, ScriptedCapture,
};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use session::{CaptureBuilder, DictationSession, DictationStats, SessionConfig, SessionState};
pub use stream::{
    AudioSink, FragmentSource, StreamEvent, TranscriptMessage, TranscriptionConnector,
    WebSocketConnector,
};
pub use transcript::TranscriptReconciler;
