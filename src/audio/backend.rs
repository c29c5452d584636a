use anyhow::Result;
use tokio::sync::mpsc;

/// One block of mono PCM samples captured from an audio source
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct AudioCaptureConfig {
    /// Target sample rate (input is decimated if the device rate is higher)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Duration of each emitted block in milliseconds
    pub frame_duration_ms: u64,
    /// Request echo cancellation from the device where supported
    pub echo_cancellation: bool,
    /// Request noise suppression from the device where supported
    pub noise_suppression: bool,
}

impl Default for AudioCaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz, what the transcription backend expects
            channels: 1,        // Mono
            frame_duration_ms: 100,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

impl AudioCaptureConfig {
    /// Number of samples in one emitted block at the target rate
    pub fn frame_samples(&self) -> usize {
        ((self.sample_rate as u64 * self.frame_duration_ms) / 1000).max(1) as usize
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input device (all platforms)
/// - Scripted: replay a fixed list of frames (tests, offline demos)
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames in capture
    /// order. Frames are dropped, not queued, when the consumer lags.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Default microphone input
    Microphone,
    /// Replay the given frames (for tests and offline demos)
    Scripted(Vec<AudioFrame>),
}

/// Audio capture factory
pub struct AudioCaptureFactory;

impl AudioCaptureFactory {
    /// Create a capture backend for the given source
    pub fn create(source: CaptureSource, config: AudioCaptureConfig) -> Box<dyn AudioCapture> {
        match source {
            CaptureSource::Microphone => {
                Box::new(super::capture::MicrophoneCapture::new(config))
            }
            CaptureSource::Scripted(frames) => Box::new(super::script::ScriptedCapture::new(frames)),
        }
    }
}
