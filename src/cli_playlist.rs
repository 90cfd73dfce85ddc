//! Generates a playlist for a mood from the command line and prints it as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodlist_server::config::{self, MAX_PLAYLIST_LENGTH};
use moodlist_server::enrichment::{Enricher, Sources};
use moodlist_server::generation::PlaylistGenerator;
use moodlist_server::llm::create_provider;
use moodlist_server::upstream::{create_catalog_lookup, create_video_lookup};

#[derive(Parser, Debug)]
#[command(about = "Generate a mood playlist and print it as JSON")]
struct CliArgs {
    /// Free-text mood, e.g. "rainy sunday morning".
    pub mood: String,

    /// Number of tracks to ask for.
    #[clap(short, long)]
    pub count: Option<usize>,

    /// Look every track up on Spotify and YouTube.
    #[clap(long)]
    pub enrich: bool,

    /// Only query the catalog when enriching.
    #[clap(long, requires = "enrich")]
    pub catalog_only: bool,

    /// Path to the same TOML file the server reads.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    if let Some(count) = args.count {
        if !(1..=MAX_PLAYLIST_LENGTH).contains(&count) {
            bail!("--count must be between 1 and {}", MAX_PLAYLIST_LENGTH);
        }
    }

    let file_config = match &args.config {
        Some(path) => Some(config::FileConfig::load(path)?),
        None => None,
    };
    let app_config = config::AppConfig::resolve(&config::CliConfig::default(), file_config)?;

    let generator = PlaylistGenerator::new(
        create_provider(&app_config.llm),
        app_config.llm.completion_options(),
        app_config.playlist_length,
    );
    let playlist = generator
        .generate(&args.mood, args.count)
        .await
        .context("Playlist generation failed")?;
    info!(
        "Generated {} tracks with {}",
        playlist.playlist.len(),
        playlist.model
    );

    let output = if args.enrich {
        let enricher = Enricher::new(
            create_catalog_lookup(&app_config.spotify),
            create_video_lookup(&app_config.youtube),
            app_config.enrichment.timeout(),
            app_config.enrichment.max_concurrent,
        );
        let sources = if args.catalog_only {
            Sources::CatalogOnly
        } else {
            Sources::All
        };
        let report = enricher.enrich(playlist.playlist.clone(), sources).await;
        serde_json::json!({
            "mood": playlist.mood,
            "model": playlist.model,
            "sessionId": playlist.session_id,
            "generated": playlist.generated,
            "enrichment": report,
        })
    } else {
        serde_json::to_value(&playlist)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
