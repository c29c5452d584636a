use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcription: TranscriptionConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    /// Base API URL of the transcription backend (http or https)
    pub base_url: String,
    /// Path suffix of the streaming endpoint
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Duration of one captured audio block in milliseconds
    pub frame_duration_ms: u64,
}

fn default_stream_path() -> String {
    "/stream".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Streaming endpoint URL: the base API URL mapped to its ws(s) scheme
    /// with the stream path suffix appended.
    pub fn stream_url(&self) -> String {
        let base = self.transcription.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };

        format!("{}{}", ws_base, self.transcription.stream_path)
    }
}
