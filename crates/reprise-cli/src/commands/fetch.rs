use anyhow::Result;
use std::path::PathBuf;

use reprise_core::matcher::{MatchEngine, MatchMode};
use reprise_core::model::CandidateTrack;
use reprise_core::normalize::Normalizer;
use reprise_core::scan::{reconcile, LoftyTagReader};
use reprise_core::schema::Database;
use reprise_core::verify::Verifier;
use reprise_fetch::config::Config;
use reprise_fetch::download::{Backend, Downloader};
use reprise_fetch::lastfm::LastFmClient;

use crate::select;

#[derive(Debug)]
pub struct FetchArgs {
    pub query: String,
    pub tag: bool,
    pub song: bool,
    pub number: u32,
    pub output: Option<PathBuf>,
    pub backend: Backend,
    pub yes: bool,
    pub dry_run: bool,
    pub rescan: bool,
    pub no_index: bool,
}

pub async fn run_fetch(config: &Config, args: FetchArgs) -> Result<()> {
    let normalizer = Normalizer::default();
    let mode = if args.song {
        MatchMode::TitleOnly
    } else {
        MatchMode::ArtistTitle
    };

    // Bring the index up to date before matching against it.
    let db = if args.no_index {
        None
    } else {
        let db = Database::open(&config.database_path)?;
        if config.music_dir.is_dir() {
            reconcile(
                &db,
                &normalizer,
                &LoftyTagReader,
                &config.music_dir,
                &config.audio_extensions,
                args.rescan,
            )?;
        }
        Some(db)
    };

    let client = LastFmClient::new(config.lastfm_api_key.clone());
    let candidates = if args.tag {
        println!(
            "Fetching top {} tracks for tag '{}' from Last.fm...",
            args.number, args.query
        );
        client.top_tracks_by_tag(&args.query, args.number).await?
    } else if args.song {
        println!("Searching Last.fm for '{}' by song title...", args.query);
        client.search_by_title(&args.query, args.number).await?
    } else {
        println!(
            "Fetching top {} tracks for artist '{}' from Last.fm...",
            args.number, args.query
        );
        client.top_tracks_by_artist(&args.query, args.number).await?
    };

    anyhow::ensure!(!candidates.is_empty(), "no tracks found for '{}'", args.query);

    let (candidates, local_count) = match &db {
        Some(db) => MatchEngine::new(&normalizer).annotate(db, candidates, mode)?,
        None => (candidates, 0),
    };

    println!(
        "\nFound {} tracks ({} already local).",
        candidates.len(),
        local_count
    );

    if args.dry_run || args.yes {
        println!();
        for (i, candidate) in candidates.iter().enumerate() {
            let marker = if candidate.is_local() { " [LOCAL]" } else { "" };
            println!(
                "  {:2}. {:<40} {}{}",
                i + 1,
                candidate.name,
                candidate_suffix(candidate, args.song),
                marker
            );
        }
        if args.dry_run {
            println!("\n(Dry run, not downloading)");
            return Ok(());
        }
    }

    let selected = if args.yes {
        candidates
    } else {
        let selected = select::select_tracks(candidates, args.song)?;
        if selected.is_empty() {
            println!("\nNo tracks selected. Exiting.");
            return Ok(());
        }
        println!("\nSelected {} tracks for download.", selected.len());
        selected
    };

    let output_dir = match args.output {
        Some(dir) => dir,
        None if args.tag => config.music_dir.join(&args.query),
        None => config.music_dir.join(&selected[0].artist),
    };
    std::fs::create_dir_all(&output_dir)?;
    println!("\nDownloading to: {}\n", output_dir.display());

    let verifier = Verifier::new(&normalizer);
    let downloader = Downloader::new(verifier, args.backend);

    let mut succeeded = 0;
    let mut failed = Vec::new();
    for (i, track) in selected.iter().enumerate() {
        println!(
            "[{}/{}] Downloading: {} - {}",
            i + 1,
            selected.len(),
            track.artist,
            track.name
        );
        if downloader.download(&track.artist, &track.name, &output_dir).await? {
            succeeded += 1;
        } else {
            failed.push(track.name.clone());
        }
    }

    println!("\nDone! {succeeded}/{} downloaded successfully.", selected.len());
    if !failed.is_empty() {
        println!("Failed: {}", failed.join(", "));
    }
    Ok(())
}

/// Per-mode trailing detail for a listed candidate. Popularity means play
/// count for artist queries and listener count for title search, and is
/// absent for tag queries.
pub fn candidate_suffix(candidate: &CandidateTrack, show_artist: bool) -> String {
    if show_artist {
        let artist: String = candidate.artist.chars().take(20).collect();
        format!("- {artist} ({})", candidate.popularity.unwrap_or(0))
    } else if let Some(popularity) = candidate.popularity {
        format!("({popularity} plays)")
    } else {
        format!("- {}", candidate.artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_suffix_per_mode() {
        let with_pop = CandidateTrack::new("One More Time", "Daft Punk", Some(1200));
        let without = CandidateTrack::new("One More Time", "Daft Punk", None);

        assert_eq!(candidate_suffix(&with_pop, false), "(1200 plays)");
        assert_eq!(candidate_suffix(&without, false), "- Daft Punk");
        assert_eq!(candidate_suffix(&with_pop, true), "- Daft Punk (1200)");
        assert_eq!(candidate_suffix(&without, true), "- Daft Punk (0)");
    }
}
