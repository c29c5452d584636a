// Integration tests for the dictation session lifecycle
//
// The transcription transport is replaced by an in-process mock and the
// microphone by a scripted capture, so these tests exercise the real
// session state machine: start/stop, reconciliation, remote close, and
// resource release.

use anyhow::{anyhow, Result};
use memoria_dictation::audio::pcm;
use memoria_dictation::{
    AudioCapture, AudioFrame, AudioSink, DictationSession, FragmentSource, ScriptedCapture,
    SessionConfig, SessionError, SessionState, StreamEvent, TranscriptionConnector,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Observable state of the mock transcription link.
#[derive(Default)]
struct MockLink {
    connected: AtomicBool,
    closed: AtomicBool,
    frames: Mutex<Vec<Vec<u8>>>,
    event_tx: Mutex<Option<mpsc::UnboundedSender<StreamEvent>>>,
}

impl MockLink {
    fn push_fragment(&self, text: &str) {
        self.event_tx
            .lock()
            .unwrap()
            .as_ref()
            .expect("link not connected")
            .send(StreamEvent::Fragment(text.to_string()))
            .unwrap();
    }

    fn push_backend_error(&self, message: &str) {
        self.event_tx
            .lock()
            .unwrap()
            .as_ref()
            .expect("link not connected")
            .send(StreamEvent::BackendError(message.to_string()))
            .unwrap();
    }

    /// Simulate the remote side closing the stream.
    fn drop_remote(&self) {
        self.event_tx.lock().unwrap().take();
    }
}

struct MockConnector {
    link: Arc<MockLink>,
    connect_delay: Option<Duration>,
    fail_connect: bool,
}

impl MockConnector {
    fn new(link: Arc<MockLink>) -> Self {
        Self {
            link,
            connect_delay: None,
            fail_connect: false,
        }
    }
}

#[async_trait::async_trait]
impl TranscriptionConnector for MockConnector {
    async fn connect(&self, _url: &str) -> Result<(Box<dyn AudioSink>, Box<dyn FragmentSource>)> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect {
            return Err(anyhow!("connection refused"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.link.event_tx.lock().unwrap() = Some(tx);
        self.link.connected.store(true, Ordering::SeqCst);

        Ok((
            Box::new(MockSink {
                link: Arc::clone(&self.link),
            }),
            Box::new(MockSource { rx, done: false }),
        ))
    }
}

struct MockSink {
    link: Arc<MockLink>,
}

#[async_trait::async_trait]
impl AudioSink for MockSink {
    async fn send(&mut self, pcm: Vec<u8>) -> Result<()> {
        self.link.frames.lock().unwrap().push(pcm);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.link.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockSource {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    done: bool,
}

#[async_trait::async_trait]
impl FragmentSource for MockSource {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.done {
            return None;
        }
        match self.rx.recv().await {
            Some(StreamEvent::Closed) | None => {
                self.done = true;
                Some(StreamEvent::Closed)
            }
            Some(event) => Some(event),
        }
    }
}

/// Scripted capture that records whether it was released.
struct ProbeCapture {
    inner: ScriptedCapture,
    stopped: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl AudioCapture for ProbeCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        self.inner.start().await
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.inner.stop().await
    }

    fn is_capturing(&self) -> bool {
        self.inner.is_capturing()
    }

    fn name(&self) -> &str {
        "probe"
    }
}

/// Capture whose device can never be acquired.
struct DeniedCapture;

#[async_trait::async_trait]
impl AudioCapture for DeniedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        Err(anyhow!("access to the input device was denied"))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "denied"
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_frames() -> Vec<AudioFrame> {
    vec![
        AudioFrame {
            samples: vec![1, 2, 3, 4],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        },
        AudioFrame {
            samples: vec![-1, -2, -3, -4],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 100,
        },
    ]
}

struct TestSession {
    session: Arc<DictationSession>,
    link: Arc<MockLink>,
    capture_stopped: Arc<AtomicBool>,
    texts: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl TestSession {
    fn build(configure: impl FnOnce(&mut MockConnector), frames: Vec<AudioFrame>) -> Self {
        let link = Arc::new(MockLink::default());
        let mut connector = MockConnector::new(Arc::clone(&link));
        configure(&mut connector);

        let capture_stopped = Arc::new(AtomicBool::new(false));
        let stopped = Arc::clone(&capture_stopped);
        let frames = Mutex::new(Some(frames));

        let session = DictationSession::with_parts(
            SessionConfig::default(),
            Arc::new(connector),
            Box::new(move |_cfg| {
                Box::new(ProbeCapture {
                    // One capture per start(); restart tests supply their own
                    inner: ScriptedCapture::new(
                        frames.lock().unwrap().take().unwrap_or_default(),
                    ),
                    stopped: Arc::clone(&stopped),
                })
            }),
        );

        Self {
            session: Arc::new(session),
            link,
            capture_stopped,
            texts: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn start(&self) -> Result<(), SessionError> {
        let texts = Arc::clone(&self.texts);
        let errors = Arc::clone(&self.errors);
        self.session
            .start(
                move |text| texts.lock().unwrap().push(text),
                move |message| errors.lock().unwrap().push(message),
            )
            .await
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streams_frames_and_reconciles_fragments() {
    let t = TestSession::build(|_| {}, test_frames());

    t.start().await.unwrap();
    assert_eq!(t.session.state(), SessionState::Streaming);
    settle().await;

    // Frames arrive as 16-bit LE PCM in capture order
    {
        let frames = t.link.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], pcm::to_le_bytes(&[1, 2, 3, 4]));
        assert_eq!(frames[1], pcm::to_le_bytes(&[-1, -2, -3, -4]));
    }

    t.link.push_fragment("hello");
    t.link.push_fragment("hello world");
    t.link.push_fragment("bye");
    settle().await;

    {
        let texts = t.texts.lock().unwrap();
        assert_eq!(
            *texts,
            vec!["hello", "hello world", "hello world bye"],
            "continuations refine, boundaries commit"
        );
    }
    assert_eq!(t.session.confirmed_text(), "hello world");

    t.session.stop().await;

    assert_eq!(t.session.state(), SessionState::Closed);
    assert_eq!(t.session.confirmed_text(), "hello world bye");
    assert!(t.link.closed.load(Ordering::SeqCst), "stream closed");
    assert!(t.capture_stopped.load(Ordering::SeqCst), "microphone released");

    let stats = t.session.stats();
    assert_eq!(stats.frames_sent, 2);
    assert_eq!(stats.fragments_received, 3);
}

#[tokio::test]
async fn second_start_is_rejected_while_active() {
    let t = TestSession::build(|_| {}, Vec::new());

    t.start().await.unwrap();
    let err = t.start().await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadyActive));

    t.session.stop().await;
}

#[tokio::test]
async fn stop_is_idempotent() {
    let t = TestSession::build(|_| {}, Vec::new());

    t.start().await.unwrap();
    t.session.stop().await;
    let confirmed = t.session.confirmed_text();

    t.session.stop().await;

    assert_eq!(t.session.state(), SessionState::Closed);
    assert_eq!(t.session.confirmed_text(), confirmed);
}

#[tokio::test]
async fn stop_without_start_is_a_noop() {
    let t = TestSession::build(|_| {}, Vec::new());
    t.session.stop().await;
    assert_eq!(t.session.state(), SessionState::Idle);
}

#[tokio::test]
async fn stop_finalizes_the_pending_utterance() {
    let t = TestSession::build(|_| {}, Vec::new());

    t.start().await.unwrap();
    t.link.push_fragment("안");
    t.link.push_fragment("안녕");
    t.link.push_fragment("안녕하세요");
    settle().await;

    // Still mid-utterance: nothing committed yet
    assert_eq!(t.session.confirmed_text(), "");
    assert_eq!(t.session.live_text(), "안녕하세요");

    t.session.stop().await;

    assert_eq!(t.session.confirmed_text(), "안녕하세요");
}

#[tokio::test]
async fn permission_denied_never_opens_a_connection() {
    let link = Arc::new(MockLink::default());
    let connector = MockConnector::new(Arc::clone(&link));

    let session = DictationSession::with_parts(
        SessionConfig::default(),
        Arc::new(connector),
        Box::new(|_cfg| Box::new(DeniedCapture)),
    );

    let err = session.start(|_| {}, |_| {}).await.unwrap_err();

    assert!(matches!(err, SessionError::PermissionDenied(_)));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(
        !link.connected.load(Ordering::SeqCst),
        "no connection was ever opened"
    );
}

#[tokio::test]
async fn connect_failure_releases_the_microphone() {
    let t = TestSession::build(|c| c.fail_connect = true, test_frames());

    let err = t.start().await.unwrap_err();

    assert!(matches!(err, SessionError::Connection(_)));
    assert_eq!(t.session.state(), SessionState::Closed);
    assert!(t.capture_stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn remote_close_tears_the_session_down() {
    let t = TestSession::build(|_| {}, test_frames());

    t.start().await.unwrap();
    t.link.push_fragment("hello");
    settle().await;

    t.link.drop_remote();
    settle().await;

    assert_eq!(t.session.state(), SessionState::Closed);
    assert!(t.capture_stopped.load(Ordering::SeqCst), "microphone released");

    let texts_after_close = t.texts.lock().unwrap().len();
    assert_eq!(texts_after_close, 1, "no further text updates after close");
    assert!(
        t.errors
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.contains("closed")),
        "caller notified of the unexpected close"
    );

    // stop() after remote close stays a no-op
    t.session.stop().await;
    assert_eq!(t.session.state(), SessionState::Closed);
}

#[tokio::test]
async fn backend_errors_are_surfaced_without_closing() {
    let t = TestSession::build(|_| {}, Vec::new());

    t.start().await.unwrap();
    t.link.push_backend_error("language not supported");
    t.link.push_fragment("still alive");
    settle().await;

    assert_eq!(t.session.state(), SessionState::Streaming);
    assert_eq!(
        *t.errors.lock().unwrap(),
        vec!["language not supported".to_string()]
    );
    assert_eq!(*t.texts.lock().unwrap(), vec!["still alive".to_string()]);

    t.session.stop().await;
}

#[tokio::test]
async fn stop_during_pending_connect_still_cleans_up() {
    let t = TestSession::build(
        |c| c.connect_delay = Some(Duration::from_millis(300)),
        test_frames(),
    );

    let session = Arc::clone(&t.session);
    let texts = Arc::clone(&t.texts);
    let starter = tokio::spawn(async move {
        session
            .start(move |text| texts.lock().unwrap().push(text), |_| {})
            .await
    });

    // Stop while connect is still pending
    tokio::time::sleep(Duration::from_millis(50)).await;
    t.session.stop().await;

    let result = starter.await.unwrap();
    assert!(result.is_ok(), "cancelled start resolves cleanly");

    assert_eq!(t.session.state(), SessionState::Closed);
    assert!(
        t.capture_stopped.load(Ordering::SeqCst),
        "microphone released once the pending connect resolved"
    );
    assert!(t.texts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stats_duration_stops_advancing_after_stop() {
    let t = TestSession::build(|_| {}, Vec::new());

    t.start().await.unwrap();
    settle().await;
    t.session.stop().await;

    let frozen = t.session.stats().duration_secs;
    assert!(frozen >= 0.0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        t.session.stats().duration_secs,
        frozen,
        "a closed session reports the duration it ran, not wall time since start"
    );
}

#[tokio::test]
async fn rebaseline_applies_when_idle_and_feeds_the_next_session() {
    let t = TestSession::build(|_| {}, Vec::new());

    t.session.rebaseline("typed by hand");
    assert_eq!(t.session.confirmed_text(), "typed by hand");

    t.start().await.unwrap();

    // Ignored while active
    t.session.rebaseline("should not apply");
    assert_eq!(t.session.confirmed_text(), "typed by hand");

    t.link.push_fragment("and dictated");
    settle().await;
    assert_eq!(t.session.live_text(), "typed by hand and dictated");

    t.session.stop().await;
    assert_eq!(t.session.confirmed_text(), "typed by hand and dictated");
}
