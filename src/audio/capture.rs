//! Microphone capture via cpal.
//!
//! The cpal stream is not `Send`, so it lives on a dedicated thread that is
//! controlled through a channel. Captured samples are mixed to mono,
//! decimated to the target rate, converted to i16 PCM and emitted as
//! fixed-size blocks in capture order.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{AudioCapture, AudioCaptureConfig, AudioFrame};
use super::blocks::FrameBlocker;
use super::pcm;

/// Channel capacity for outgoing frames. When the consumer lags, newer
/// frames are dropped rather than queued.
const FRAME_CHANNEL_CAPACITY: usize = 4;

enum StreamControl {
    Stop(oneshot::Sender<()>),
}

/// Microphone capture backend built on cpal.
pub struct MicrophoneCapture {
    config: AudioCaptureConfig,
    control: Option<std::sync::mpsc::Sender<StreamControl>>,
    thread: Option<thread::JoinHandle<()>>,
    capturing: Arc<AtomicBool>,
}

impl MicrophoneCapture {
    pub fn new(config: AudioCaptureConfig) -> Self {
        Self {
            config,
            control: None,
            thread: None,
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(anyhow!("microphone capture already running"));
        }

        info!(
            sample_rate = self.config.sample_rate,
            channels = self.config.channels,
            echo_cancellation = self.config.echo_cancellation,
            noise_suppression = self.config.noise_suppression,
            "starting microphone capture"
        );

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (setup_tx, setup_rx) = oneshot::channel::<Result<()>>();
        let (control_tx, control_rx) = std::sync::mpsc::channel();

        let config = self.config.clone();
        let capturing = Arc::clone(&self.capturing);

        let handle = thread::spawn(move || {
            run_stream_thread(config, frame_tx, setup_tx, control_rx, capturing);
        });

        match setup_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = tokio::task::spawn_blocking(move || handle.join()).await;
                return Err(e);
            }
            Err(_) => {
                let _ = tokio::task::spawn_blocking(move || handle.join()).await;
                return Err(anyhow!("capture thread exited before setup completed"));
            }
        }

        self.capturing.store(true, Ordering::SeqCst);
        self.control = Some(control_tx);
        self.thread = Some(handle);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing.swap(false, Ordering::SeqCst) && self.control.is_none() {
            return Ok(());
        }

        if let Some(control) = self.control.take() {
            let (ack_tx, ack_rx) = oneshot::channel();
            if control.send(StreamControl::Stop(ack_tx)).is_ok() {
                let _ = ack_rx.await;
            }
        }

        if let Some(handle) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }

        info!("microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if let Some(control) = self.control.take() {
            let (ack_tx, _ack_rx) = oneshot::channel();
            let _ = control.send(StreamControl::Stop(ack_tx));
        }
    }
}

fn run_stream_thread(
    config: AudioCaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    setup_tx: oneshot::Sender<Result<()>>,
    control_rx: std::sync::mpsc::Receiver<StreamControl>,
    capturing: Arc<AtomicBool>,
) {
    let stream = match open_input_stream(&config, frame_tx, capturing) {
        Ok(stream) => {
            let _ = setup_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = setup_tx.send(Err(e));
            return;
        }
    };

    // Park until asked to stop; the stream keeps delivering callbacks.
    if let Ok(StreamControl::Stop(ack)) = control_rx.recv() {
        stream.pause().ok();
        drop(stream);
        ack.send(()).ok();
        debug!("microphone stream released");
    }
}

fn open_input_stream(
    config: &AudioCaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    capturing: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;

    let supported = device
        .default_input_config()
        .context("failed to query input device config")?;

    let input_channels = supported.channels();
    let input_rate = supported.sample_rate().0;
    let stream_config: cpal::StreamConfig = supported.config();

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    debug!(device = %device_name, input_rate, input_channels, "opening input stream");

    let target_rate = config.sample_rate;

    // Block assembler owned by the data callback.
    let mut blocker = FrameBlocker::new(config.frame_samples(), target_rate, config.channels);

    let mut on_samples = move |samples: Vec<f32>| {
        let mono = pcm::mix_to_mono(&samples, input_channels);
        let resampled = pcm::decimate(mono, input_rate, target_rate);
        blocker.push(resampled, &frame_tx);
    };

    let error_callback = move |err: cpal::StreamError| {
        error!("audio stream error: {}", err);
        if matches!(err, cpal::StreamError::DeviceNotAvailable) {
            warn!("audio device disconnected");
            capturing.store(false, Ordering::SeqCst);
        }
    };

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &_| on_samples(data.to_vec()),
                error_callback,
                None,
            )
            .context("failed to build input stream")?,
        cpal::SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &_| {
                    let as_f32: Vec<f32> =
                        data.iter().map(|&s| s as f32 / -(i16::MIN as f32)).collect();
                    on_samples(as_f32);
                },
                error_callback,
                None,
            )
            .context("failed to build input stream")?,
        other => {
            return Err(anyhow!("unsupported sample format: {}", other));
        }
    };

    stream.play().context("failed to start input stream")?;

    Ok(stream)
}
