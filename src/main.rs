use anyhow::Result;
use clap::Parser;
use memoria_dictation::{Config, DictationSession, SessionConfig};
use std::io::Write;
use tracing::info;

/// Live dictation: microphone to transcript, printed as it arrives
#[derive(Debug, Parser)]
#[command(name = "memoria-dictation")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/memoria-dictation")]
    config: String,

    /// Override the streaming endpoint from the config file
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let endpoint = args.endpoint.unwrap_or_else(|| cfg.stream_url());

    info!("{} starting", cfg.service.name);
    info!("streaming endpoint: {}", endpoint);

    let session_config = SessionConfig {
        endpoint,
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        frame_duration_ms: cfg.audio.frame_duration_ms,
        ..SessionConfig::default()
    };

    let session = DictationSession::new(session_config);

    session
        .start(
            |text| {
                print!("\r{}", text);
                std::io::stdout().flush().ok();
            },
            |message| {
                eprintln!("\ntranscription error: {}", message);
            },
        )
        .await?;

    println!("Listening... press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    session.stop().await;

    println!("\n{}", session.confirmed_text());

    Ok(())
}
