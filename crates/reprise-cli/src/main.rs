use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use reprise_fetch::config::Config;
use reprise_fetch::download::Backend;

mod commands;
mod select;

#[derive(Debug, Parser)]
#[command(name = "reprise", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the library index (default: ~/.local/share/reprise/library.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Reconcile the library index with the music directory
    ///
    /// Recursively walks the music directory, extracts artist/title tags from
    /// every audio file, and brings the index up to date:
    ///
    /// - Files no longer on disk are removed from the index
    /// - Unchanged files (same modification time) are skipped without
    ///   re-reading their tags
    /// - New and modified files get their tags extracted; files without
    ///   usable tags fall back to filename parsing
    ///
    /// Supported formats: MP3, FLAC, M4A, OGG, Opus, WAV, WMA
    Scan {
        /// Directory to scan (default: the configured music directory)
        path: Option<PathBuf>,

        /// Re-extract tags for every file, ignoring stored fingerprints
        #[arg(long)]
        force: bool,
    },
    /// Look up tracks on Last.fm and download the ones you do not own
    Fetch {
        /// Artist name, tag (-t), or song title (-s)
        query: String,

        /// Search by tag/genre (e.g., 'rock', '80s')
        #[arg(short = 't', long, conflicts_with = "song")]
        tag: bool,

        /// Search by song title
        #[arg(short = 's', long)]
        song: bool,

        /// Number of tracks to fetch
        #[arg(short = 'n', long, default_value_t = 15)]
        number: u32,

        /// Output directory (default: <music_dir>/<artist or tag>)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Download backend
        #[arg(long, default_value = "spotdl")]
        backend: Backend,

        /// Skip interactive selection, download all tracks
        #[arg(short = 'y', long)]
        yes: bool,

        /// Show the track list without downloading
        #[arg(long)]
        dry_run: bool,

        /// Force a full rescan of the library before matching
        #[arg(long)]
        rescan: bool,

        /// Skip the library index entirely (no duplicate detection)
        #[arg(long)]
        no_index: bool,
    },
    /// Fetch Last.fm tags for every artist in the index
    Tags {
        /// Re-fetch tags even for artists already cached
        #[arg(long)]
        force: bool,
    },
    /// Generate m3u playlists from cached artist tags
    Playlist {
        /// Tag to build a playlist for (e.g., 'electronic')
        tag: Option<String>,

        /// Generate playlists for all popular tags
        #[arg(long, conflicts_with = "tag")]
        all: bool,

        /// Output directory (default: <music_dir>/Playlists)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Minimum tracks required to keep a playlist
        #[arg(long, default_value_t = 5)]
        min_songs: usize,

        /// Maximum number of playlists to generate with --all
        #[arg(long, default_value_t = 100)]
        max: usize,

        /// List available tags instead of generating anything
        #[arg(long)]
        list: bool,
    },
    /// Show the configuration, or write a starter config file
    Config {
        /// Write a commented config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.db {
        Some(db_path) => Config::load_with_db_path(db_path)?,
        None => Config::load()?,
    };

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match cli.command {
        Commands::Scan { path, force } => {
            commands::run_scan(&config, path, force)?;
        }
        Commands::Fetch {
            query,
            tag,
            song,
            number,
            output,
            backend,
            yes,
            dry_run,
            rescan,
            no_index,
        } => {
            let args = commands::FetchArgs {
                query,
                tag,
                song,
                number,
                output,
                backend,
                yes,
                dry_run,
                rescan,
                no_index,
            };
            commands::run_fetch(&config, args).await?;
        }
        Commands::Tags { force } => {
            commands::run_tags(&config, force).await?;
        }
        Commands::Playlist {
            tag,
            all,
            output,
            min_songs,
            max,
            list,
        } => {
            commands::run_playlist(&config, tag, all, output, min_songs, max, list)?;
        }
        Commands::Config { init } => {
            commands::show_config(&config, init)?;
        }
    }

    Ok(())
}
