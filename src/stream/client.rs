use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::TranscriptMessage;
use super::transport::{AudioSink, FragmentSource, StreamEvent, TranscriptionConnector};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the transcription backend over WebSocket.
pub struct WebSocketConnector;

#[async_trait::async_trait]
impl TranscriptionConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<(Box<dyn AudioSink>, Box<dyn FragmentSource>)> {
        info!("connecting to transcription stream at {}", url);

        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .context("failed to open transcription stream")?;

        info!("transcription stream connected");

        let (write, read) = ws.split();

        Ok((
            Box::new(WsAudioSink { sink: write }),
            Box::new(WsFragmentSource {
                stream: read,
                closed: false,
            }),
        ))
    }
}

struct WsAudioSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait::async_trait]
impl AudioSink for WsAudioSink {
    async fn send(&mut self, pcm: Vec<u8>) -> Result<()> {
        self.sink
            .send(Message::Binary(pcm))
            .await
            .context("failed to transmit audio frame")?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink
            .close()
            .await
            .context("failed to close transcription stream")?;
        Ok(())
    }
}

struct WsFragmentSource {
    stream: SplitStream<WsStream>,
    closed: bool,
}

#[async_trait::async_trait]
impl FragmentSource for WsFragmentSource {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.closed {
            return None;
        }

        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(raw)) => match serde_json::from_str::<TranscriptMessage>(&raw) {
                    Ok(TranscriptMessage {
                        error: Some(error), ..
                    }) => return Some(StreamEvent::BackendError(error)),
                    Ok(TranscriptMessage {
                        text: Some(text), ..
                    }) => return Some(StreamEvent::Fragment(text)),
                    Ok(_) => {
                        warn!("transcript message carries neither text nor error, ignoring");
                    }
                    Err(e) => {
                        warn!("ignoring malformed transcript message: {}", e);
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!("transcription stream closed by remote: {:?}", frame);
                    self.closed = true;
                    return Some(StreamEvent::Closed);
                }
                // Pings and pongs are handled by the protocol layer
                Ok(_) => {}
                Err(e) => {
                    warn!("transcription stream error: {}", e);
                    self.closed = true;
                    return Some(StreamEvent::Closed);
                }
            }
        }

        self.closed = true;
        Some(StreamEvent::Closed)
    }
}
