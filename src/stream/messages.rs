use serde::{Deserialize, Serialize};

/// Inbound message from the transcription backend.
///
/// Each message carries either a transcript fragment or an error
/// description. Messages with neither field are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
