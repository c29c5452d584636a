use anyhow::Result;

/// Event delivered by a transcription stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A transcript fragment, possibly a revision of the previous one
    Fragment(String),
    /// The backend reported an error but the stream stays open
    BackendError(String),
    /// The stream closed (remote close or transport error)
    Closed,
}

/// Write half of a transcription stream.
#[async_trait::async_trait]
pub trait AudioSink: Send {
    /// Transmit one block of 16-bit little-endian PCM as a binary frame
    async fn send(&mut self, pcm: Vec<u8>) -> Result<()>;

    /// Close the stream
    async fn close(&mut self) -> Result<()>;
}

/// Read half of a transcription stream.
#[async_trait::async_trait]
pub trait FragmentSource: Send {
    /// Next event from the stream, or `None` once closed.
    ///
    /// Malformed inbound messages are logged and skipped here; they never
    /// terminate the stream.
    async fn next_event(&mut self) -> Option<StreamEvent>;
}

/// Opens transcription streams.
#[async_trait::async_trait]
pub trait TranscriptionConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(Box<dyn AudioSink>, Box<dyn FragmentSource>)>;
}
