pub mod backend;
pub mod blocks;
pub mod capture;
pub mod pcm;
pub mod script;

pub use backend::{AudioCapture, AudioCaptureConfig, AudioCaptureFactory, AudioFrame, CaptureSource};
pub use blocks::FrameBlocker;
pub use capture::MicrophoneCapture;
pub use script::ScriptedCapture;
