//! Scripted audio capture: replays a fixed list of frames.
//!
//! Used by tests and offline demos in place of a real microphone. The frame
//! channel stays open after the script is exhausted, mimicking a microphone
//! that has gone quiet, until `stop()` releases it.

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use super::backend::{AudioCapture, AudioFrame};

pub struct ScriptedCapture {
    frames: Vec<AudioFrame>,
    // Keeps the channel open between script end and stop().
    hold: Option<mpsc::Sender<AudioFrame>>,
    capturing: bool,
}

impl ScriptedCapture {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            hold: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for ScriptedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            return Err(anyhow!("scripted capture already running"));
        }

        let (tx, rx) = mpsc::channel(self.frames.len().max(1) + 1);
        for frame in self.frames.drain(..) {
            tx.send(frame)
                .await
                .map_err(|_| anyhow!("scripted frame receiver dropped"))?;
        }

        self.hold = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.hold = None;
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
