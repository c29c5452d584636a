//! Assembles resampled mono samples into fixed-duration PCM blocks.

use tokio::sync::mpsc;
use tracing::debug;

use super::backend::AudioFrame;
use super::pcm;

/// Accumulates mono float samples and emits `AudioFrame` blocks of a fixed
/// sample count through a bounded channel.
///
/// When the consumer lags and the channel is full, a completed block is
/// dropped rather than queued; capture never buffers unboundedly.
pub struct FrameBlocker {
    frame_samples: usize,
    sample_rate: u32,
    channels: u16,
    pending: Vec<f32>,
    samples_emitted: u64,
}

impl FrameBlocker {
    pub fn new(frame_samples: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            frame_samples,
            sample_rate,
            channels,
            pending: Vec::with_capacity(frame_samples * 2),
            samples_emitted: 0,
        }
    }

    /// Append samples and emit every block they complete. Leftover samples
    /// stay pending until the next call.
    pub fn push(&mut self, mut samples: Vec<f32>, tx: &mpsc::Sender<AudioFrame>) {
        self.pending.append(&mut samples);

        while self.pending.len() >= self.frame_samples {
            let block: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            let frame = AudioFrame {
                samples: pcm::f32_to_i16(&block),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: self.samples_emitted * 1000 / self.sample_rate as u64,
            };
            self.samples_emitted += self.frame_samples as u64;

            if tx.try_send(frame).is_err() {
                debug!("dropping audio frame, consumer is behind");
            }
        }
    }
}
