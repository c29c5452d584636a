//! Streaming transcription transport
//!
//! Outbound: binary frames of 16-bit little-endian PCM.
//! Inbound: JSON text messages carrying either a transcript fragment or a
//! backend error description.

pub mod client;
pub mod messages;
pub mod transport;

pub use client::WebSocketConnector;
pub use messages::TranscriptMessage;
pub use transport::{AudioSink, FragmentSource, StreamEvent, TranscriptionConnector};
