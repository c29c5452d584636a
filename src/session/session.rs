use super::config::SessionConfig;
use super::state::SessionState;
use super::stats::DictationStats;
use crate::audio::{pcm, AudioCapture, AudioCaptureConfig, AudioCaptureFactory, CaptureSource};
use crate::error::{SessionError, SessionResult};
use crate::stream::{AudioSink, StreamEvent, TranscriptionConnector, WebSocketConnector};
use crate::transcript::TranscriptReconciler;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Builds a fresh capture backend for each session.
pub type CaptureBuilder =
    Box<dyn Fn(AudioCaptureConfig) -> Box<dyn AudioCapture> + Send + Sync>;

/// A dictation session that turns microphone audio into live text.
///
/// One instance manages at most one active capture session at a time. Each
/// `start()` acquires a fresh capture backend and a fresh transcription
/// stream; they are exclusively owned by that session and fully released on
/// `stop()`, on remote close, and on transport errors.
pub struct DictationSession {
    /// Session configuration
    config: SessionConfig,

    /// Opens transcription streams
    connector: Arc<dyn TranscriptionConnector>,

    /// Creates the capture backend for each session
    capture_builder: CaptureBuilder,

    /// State shared with the send/receive tasks
    inner: Arc<SessionInner>,

    /// Handle for the audio sending task
    send_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the fragment receiving task
    recv_task: Mutex<Option<JoinHandle<()>>>,
}

struct SessionInner {
    state: StdMutex<SessionState>,

    /// Set by `stop()`; checked between the suspension points of `start()`
    /// and by both tasks.
    stop_requested: AtomicBool,

    reconciler: StdMutex<TranscriptReconciler>,

    /// Write half of the transcription stream, present while streaming
    sink: Mutex<Option<Box<dyn AudioSink>>>,

    /// Capture backend, present while streaming
    capture: Mutex<Option<Box<dyn AudioCapture>>>,

    frames_sent: AtomicUsize,
    fragments_received: AtomicUsize,
    started_at: StdMutex<Option<chrono::DateTime<Utc>>>,
    ended_at: StdMutex<Option<chrono::DateTime<Utc>>>,
}

impl SessionInner {
    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Release every session resource and transition to `Closed`.
    ///
    /// Idempotent: resources are held in `Option`s and taken exactly once.
    /// A failing release step is logged and never prevents later steps.
    async fn teardown(&self) {
        self.reconciler.lock().unwrap().flush();

        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                warn!("failed to close transcription stream: {}", e);
            }
        }

        if let Some(mut capture) = self.capture.lock().await.take() {
            if let Err(e) = capture.stop().await {
                warn!("failed to stop audio capture: {}", e);
            }
        }

        let mut ended_at = self.ended_at.lock().unwrap();
        if ended_at.is_none() {
            *ended_at = Some(Utc::now());
        }
        drop(ended_at);

        self.set_state(SessionState::Closed);
    }
}

impl DictationSession {
    /// Create a session using the default microphone and WebSocket transport
    pub fn new(config: SessionConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(WebSocketConnector),
            Box::new(|cfg| AudioCaptureFactory::create(CaptureSource::Microphone, cfg)),
        )
    }

    /// Create a session with explicit transport and capture implementations
    pub fn with_parts(
        config: SessionConfig,
        connector: Arc<dyn TranscriptionConnector>,
        capture_builder: CaptureBuilder,
    ) -> Self {
        Self {
            config,
            connector,
            capture_builder,
            inner: Arc::new(SessionInner {
                state: StdMutex::new(SessionState::Idle),
                stop_requested: AtomicBool::new(false),
                reconciler: StdMutex::new(TranscriptReconciler::new()),
                sink: Mutex::new(None),
                capture: Mutex::new(None),
                frames_sent: AtomicUsize::new(0),
                fragments_received: AtomicUsize::new(0),
                started_at: StdMutex::new(None),
                ended_at: StdMutex::new(None),
            }),
            send_task: Mutex::new(None),
            recv_task: Mutex::new(None),
        }
    }

    /// Start capturing and streaming.
    ///
    /// `on_text` receives the live display text (confirmed transcript plus
    /// the pending fragment) after every reconciled update. `on_error`
    /// receives backend-reported errors and the unexpected-close
    /// notification.
    ///
    /// Fails with `AlreadyActive` if a session is connecting or streaming,
    /// `PermissionDenied` if the microphone cannot be acquired, and
    /// `Connection` if the stream cannot be opened. A `stop()` that lands
    /// while `start()` is still pending results in full cleanup and an
    /// `Ok` return.
    pub async fn start(
        &self,
        on_text: impl Fn(String) + Send + Sync + 'static,
        on_error: impl Fn(String) + Send + Sync + 'static,
    ) -> SessionResult<()> {
        {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                SessionState::Idle | SessionState::Closed => {
                    *state = SessionState::Connecting;
                    self.inner.stop_requested.store(false, Ordering::SeqCst);
                }
                SessionState::Connecting | SessionState::Streaming => {
                    return Err(SessionError::AlreadyActive);
                }
            }
        }

        info!("starting dictation session: {}", self.config.session_id);

        self.inner.frames_sent.store(0, Ordering::SeqCst);
        self.inner.fragments_received.store(0, Ordering::SeqCst);
        *self.inner.started_at.lock().unwrap() = Some(Utc::now());
        *self.inner.ended_at.lock().unwrap() = None;

        // Acquire the microphone
        let capture_config = AudioCaptureConfig {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            frame_duration_ms: self.config.frame_duration_ms,
            ..AudioCaptureConfig::default()
        };

        let mut capture = (self.capture_builder)(capture_config);
        let audio_rx = match capture.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.inner.teardown().await;
                return Err(SessionError::PermissionDenied(e.to_string()));
            }
        };
        *self.inner.capture.lock().await = Some(capture);

        if self.inner.stop_requested.load(Ordering::SeqCst) {
            debug!("stop requested while acquiring microphone");
            self.inner.teardown().await;
            return Ok(());
        }

        // Open the transcription stream
        let (sink, mut events) = match self.connector.connect(&self.config.endpoint).await {
            Ok(pair) => pair,
            Err(e) => {
                self.inner.teardown().await;
                return Err(SessionError::Connection(e.to_string()));
            }
        };
        *self.inner.sink.lock().await = Some(sink);

        if self.inner.stop_requested.load(Ordering::SeqCst) {
            debug!("stop requested while connecting");
            self.inner.teardown().await;
            return Ok(());
        }

        self.inner.set_state(SessionState::Streaming);
        info!("dictation session streaming: {}", self.config.session_id);

        // Audio sending task: frames go out in capture order, one in flight
        // at a time. A failed transmission is not retried; remaining frames
        // are dropped silently until the session stops.
        let inner = Arc::clone(&self.inner);
        let send_task = tokio::spawn(async move {
            let mut audio_rx = audio_rx;
            let mut link_down = false;

            while let Some(frame) = audio_rx.recv().await {
                if inner.stop_requested.load(Ordering::SeqCst) {
                    break;
                }
                if link_down {
                    continue;
                }

                let bytes = pcm::to_le_bytes(&frame.samples);
                let mut guard = inner.sink.lock().await;
                match guard.as_mut() {
                    Some(sink) => {
                        if let Err(e) = sink.send(bytes).await {
                            warn!("frame transmission failed, dropping audio: {}", e);
                            link_down = true;
                        } else {
                            inner.frames_sent.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    None => link_down = true,
                }
            }

            debug!("audio sending task finished");
        });

        // Fragment receiving task: fragments are reconciled in arrival order.
        let inner = Arc::clone(&self.inner);
        let on_text = Arc::new(on_text);
        let on_error = Arc::new(on_error);
        let recv_task = tokio::spawn(async move {
            while let Some(event) = events.next_event().await {
                match event {
                    StreamEvent::Fragment(text) => {
                        if inner.stop_requested.load(Ordering::SeqCst) {
                            break;
                        }
                        inner.fragments_received.fetch_add(1, Ordering::SeqCst);
                        let live = inner.reconciler.lock().unwrap().apply(&text);
                        on_text(live);
                    }
                    StreamEvent::BackendError(message) => {
                        warn!("transcription backend reported error: {}", message);
                        on_error(message);
                    }
                    StreamEvent::Closed => break,
                }
            }

            // Remote close or transport error while still streaming: tear
            // down here so the microphone is not left open.
            if !inner.stop_requested.swap(true, Ordering::SeqCst) {
                warn!("transcription stream closed unexpectedly");
                inner.teardown().await;
                on_error("transcription stream closed".to_string());
            }

            debug!("fragment receiving task finished");
        });

        *self.send_task.lock().await = Some(send_task);
        *self.recv_task.lock().await = Some(recv_task);

        Ok(())
    }

    /// Stop the session and release every resource.
    ///
    /// Idempotent and safe to call in any state, including while `start()`
    /// is still pending. The pending fragment is finalized into the
    /// confirmed transcript before resources are released.
    pub async fn stop(&self) {
        if self.inner.state() == SessionState::Idle {
            debug!("stop called before any session started");
            return;
        }
        if self.inner.stop_requested.swap(true, Ordering::SeqCst)
            && self.inner.state() == SessionState::Closed
        {
            debug!("stop called on a stopped session");
            return;
        }

        info!("stopping dictation session: {}", self.config.session_id);

        // Cancel the sending task first so a frame stuck on a hung
        // connection cannot block the release steps below.
        if let Some(task) = self.send_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }

        self.inner.teardown().await;

        // The receiving task may be blocked on a half-open stream.
        if let Some(task) = self.recv_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }

        info!("dictation session stopped: {}", self.config.session_id);
    }

    /// Re-baseline the transcript from text the user edited by hand.
    ///
    /// Ignored while a session is active; the next session then reconciles
    /// fresh from the edited text.
    pub fn rebaseline(&self, text: &str) {
        if self.state().is_active() {
            debug!("ignoring rebaseline while session is active");
            return;
        }
        self.inner.reconciler.lock().unwrap().rebaseline(text);
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Whether a session is connecting or streaming
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Transcript text locked in so far
    pub fn confirmed_text(&self) -> String {
        self.inner.reconciler.lock().unwrap().confirmed().to_string()
    }

    /// Confirmed transcript plus the pending fragment
    pub fn live_text(&self) -> String {
        self.inner.reconciler.lock().unwrap().live()
    }

    /// Current session statistics
    pub fn stats(&self) -> DictationStats {
        let started_at = *self.inner.started_at.lock().unwrap();
        let ended_at = *self.inner.ended_at.lock().unwrap();
        // Once the session has closed the duration stops advancing
        let duration_secs = started_at
            .map(|t| {
                let end = ended_at.unwrap_or_else(Utc::now);
                end.signed_duration_since(t).num_milliseconds() as f64 / 1000.0
            })
            .unwrap_or(0.0);

        DictationStats {
            state: self.state(),
            started_at,
            duration_secs,
            frames_sent: self.inner.frames_sent.load(Ordering::SeqCst),
            fragments_received: self.inner.fragments_received.load(Ordering::SeqCst),
            confirmed_chars: self
                .inner
                .reconciler
                .lock()
                .unwrap()
                .confirmed()
                .chars()
                .count(),
        }
    }
}
