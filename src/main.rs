use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use slide_narrator::{
    config::{Config, SpeechBackend},
    speech::build_synthesizer,
    NarrationEngine, NarratorError,
};

#[derive(Parser)]
#[command(
    name = "slide-narrator",
    version,
    about = "Turn annotated slide decks into narrated videos",
    long_about = "Slide-narrator reads speech, timing and overlay annotations from a slide deck, synthesizes the narration and renders the slides into a single video."
)]
struct Cli {
    /// Annotated deck (typst source or exported JSON)
    input: PathBuf,

    /// Output video file path (defaults to INPUT with .mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Video codec
    #[arg(long)]
    codec: Option<String>,

    /// Canvas width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Speech backend (preview, command, openai)
    #[arg(short, long)]
    backend: Option<SpeechBackend>,

    /// Print the timeline as JSON instead of encoding
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Turn a library error into the message shown on exit
fn report(error: NarratorError) -> anyhow::Error {
    if error.is_input_error() {
        anyhow::anyhow!("Invalid deck: {}", error.user_message())
    } else {
        anyhow::anyhow!(error.user_message())
    }
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(fps) = self.fps {
            config.video.fps = fps;
        }
        if let Some(dpi) = self.dpi {
            config.video.dpi = dpi;
        }
        if let Some(codec) = &self.codec {
            config.video.codec = codec.clone();
        }
        if let Some(width) = self.width {
            config.composition.canvas_width = width;
        }
        if let Some(height) = self.height {
            config.composition.canvas_height = height;
        }
        if let Some(backend) = self.backend {
            config.speech.backend = backend;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting slide-narrator v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path).map_err(report)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("creating work directory {:?}", config.work_dir))?;
    let synthesizer = build_synthesizer(&config.speech, &config.work_dir)
        .map_err(report)?;

    let engine = NarrationEngine::new(config, synthesizer);

    if cli.dry_run {
        let timeline = engine
            .plan(&cli.input)
            .await
            .map_err(report)?;
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("mp4"));

    engine
        .compose(&cli.input, &output)
        .await
        .map_err(report)?;

    Ok(())
}
