use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use albumwave::cache::FsStore;
use albumwave::catalog::SpotifyClient;
use albumwave::config::AppConfig;

#[derive(Parser)]
#[command(name = "albumwave", version, about = "Album loudness posters and audio-feature charts")]
struct Cli {
    /// Config file (YAML, or TOML by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for cached catalog responses
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for rendered images
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the mirrored-waveform poster for one album
    Waveform {
        /// Album id (overrides album_id in config)
        #[arg(long)]
        album_id: Option<String>,
    },

    /// Chart danceability and energy across the configured albums
    Features {
        /// Album ids (override albums in config)
        #[arg(long = "album-id")]
        album_ids: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    config.apply_env(|key| std::env::var(key).ok());

    // CLI > config > defaults
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir;
    }
    if cli.output_dir.is_some() {
        config.output_dir = cli.output_dir;
    }

    let store = FsStore::open(&config.data_dir()).context("Failed to open data directory")?;
    log::info!("Data: {}", store.root().display());

    match cli.command {
        Commands::Waveform { album_id } => {
            if album_id.is_some() {
                config.album_id = album_id;
            }
            let client = SpotifyClient::from_config(&config);
            let result = albumwave::pipeline::run_waveform(&config, &client, &store)?;
            println!(
                "{} by {}: {} tracks -> {}",
                result.album,
                result.artists,
                result.tracks,
                result.output.display()
            );
        }

        Commands::Features { album_ids } => {
            if !album_ids.is_empty() {
                config.albums = album_ids;
            }
            let client = SpotifyClient::from_config(&config);
            let result = albumwave::pipeline::run_features(&config, &client, &store)?;
            println!("{} albums, {} tracks charted", result.albums, result.rows);
            for path in &result.outputs {
                println!("  {}", path.display());
            }
        }
    }

    Ok(())
}
