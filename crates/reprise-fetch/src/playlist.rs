//! Tag enrichment and m3u playlist generation.
//!
//! Enrichment walks the unique artists in the index and fills the artist-tag
//! cache from Last.fm, reusing cached results where an artist reduces to an
//! already-known base name. Playlist generation then groups tracks by tag
//! and writes extended m3u files with paths relative to the playlist.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use reprise_core::normalize::Normalizer;
use reprise_core::schema::Database;

use crate::error::FetchResult;
use crate::lastfm::{LastFmClient, LastFmTag};

/// Tags with no thematic value for playlists.
const TAG_BLACKLIST: &[&str] = &[
    "seen live",
    "favorites",
    "favourite",
    "favorite",
    "my music",
    "love",
    "loved",
    "amazing",
    "awesome",
    "beautiful",
    "best",
    "classic",
    "good",
    "great",
    "under 2000 listeners",
];

/// Tags with a Last.fm count below this are too weak to keep.
const MIN_TAG_COUNT: u32 = 10;

/// Matches collaboration markers so "A feat. B" reduces to "A".
static FEAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring|part\.?|with)\s+.*$")
        .expect("collaboration pattern is valid")
});

/// Strip collaboration suffixes from an artist name.
///
/// "Elton John feat. Dua Lipa" becomes "Elton John". Returns the input
/// unchanged when no marker is present.
pub fn base_artist(artist: &str) -> String {
    FEAT_RE.replace(artist, "").trim().to_string()
}

/// Drop blacklisted, weak, and self-referential tags from an API response.
pub fn filter_tags(tags: &[LastFmTag], artist_norm: &str, normalizer: &Normalizer) -> Vec<String> {
    tags.iter()
        .filter(|t| t.count >= MIN_TAG_COUNT)
        .map(|t| t.name.to_lowercase().trim().to_string())
        .filter(|name| !TAG_BLACKLIST.contains(&name.as_str()))
        .filter(|name| normalizer.canonical(name) != artist_norm)
        .collect()
}

/// Summary of one enrichment run.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichSummary {
    pub fetched: usize,
    pub inherited: usize,
    pub skipped: usize,
    pub no_tags: usize,
}

/// Fetch Last.fm tags for every artist in the index.
///
/// Artists already present in the tag cache are skipped unless `force` is
/// set. Before calling the API, an artist whose base name (collaboration
/// markers stripped) is already cached inherits those tags without a
/// request. Artists for which Last.fm has nothing are recorded with an
/// empty tag list so they are not retried on the next run.
///
/// # Errors
///
/// Returns an error on database failures. Individual API failures mark the
/// artist as attempted and continue.
pub async fn enrich_artist_tags(
    db: &Database,
    normalizer: &Normalizer,
    client: &LastFmClient,
    force: bool,
) -> FetchResult<EnrichSummary> {
    let artists = db.unique_artists()?;
    info!("enriching tags for {} unique artists", artists.len());

    let mut cached = db.all_artist_tags()?;
    let mut summary = EnrichSummary::default();

    for (artist_norm, artist) in artists {
        if !force && cached.contains_key(&artist_norm) {
            summary.skipped += 1;
            continue;
        }

        let base = base_artist(&artist);
        let base_norm = normalizer.canonical(&base);

        // Inherit from an already-cached base artist, no API call needed.
        if base_norm != artist_norm {
            if let Some(tags) = cached.get(&base_norm).filter(|t| !t.is_empty()).cloned() {
                debug!("{artist}: inherited {} tags from '{base}'", tags.len());
                db.set_artist_tags(&artist_norm, &artist, &tags)?;
                cached.insert(artist_norm, tags);
                summary.inherited += 1;
                continue;
            }
        }

        // Look up the base name first; retry with the full name if empty.
        let mut tags = fetch_filtered(client, normalizer, &base, &artist_norm).await;
        if tags.is_empty() && base != artist {
            tags = fetch_filtered(client, normalizer, &artist, &artist_norm).await;
        }

        if tags.is_empty() {
            debug!("{artist}: no tags found");
            db.set_artist_tags(&artist_norm, &artist, &[])?;
            cached.insert(artist_norm, Vec::new());
            summary.no_tags += 1;
        } else {
            debug!("{artist}: {} tags", tags.len());
            db.set_artist_tags(&artist_norm, &artist, &tags)?;
            if base_norm != artist_norm && !cached.contains_key(&base_norm) {
                db.set_artist_tags(&base_norm, &base, &tags)?;
                cached.insert(base_norm, tags.clone());
            }
            cached.insert(artist_norm, tags);
            summary.fetched += 1;
        }
    }

    info!(
        "tag enrichment done: fetched={}, inherited={}, skipped={}, no tags={}",
        summary.fetched, summary.inherited, summary.skipped, summary.no_tags
    );
    Ok(summary)
}

/// API failures here degrade to an empty list so enrichment can continue.
async fn fetch_filtered(
    client: &LastFmClient,
    normalizer: &Normalizer,
    artist: &str,
    artist_norm: &str,
) -> Vec<String> {
    match client.artist_top_tags(artist).await {
        Ok(tags) => filter_tags(&tags, artist_norm, normalizer),
        Err(e) => {
            debug!("tag lookup failed for '{artist}': {e}");
            Vec::new()
        }
    }
}

/// Number of artists carrying each tag, across the whole cache.
pub fn tag_frequencies(db: &Database) -> FetchResult<HashMap<String, usize>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for tags in db.all_artist_tags()?.values() {
        for tag in tags {
            *counts.entry(tag.to_lowercase()).or_default() += 1;
        }
    }
    Ok(counts)
}

/// Tags held by at least `min_artists` artists, most common first.
pub fn available_tags(db: &Database, min_artists: usize) -> FetchResult<Vec<(String, usize)>> {
    let mut tags: Vec<(String, usize)> = tag_frequencies(db)?
        .into_iter()
        .filter(|(_, count)| *count >= min_artists)
        .collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(tags)
}

/// Write an extended m3u playlist for every track whose artist carries
/// `tag`. Returns the number of tracks written; zero means no file was
/// created.
pub fn generate_playlist(
    db: &Database,
    tag: &str,
    output_path: &Path,
) -> FetchResult<usize> {
    let artist_norms = db.artists_with_tag(tag)?;
    if artist_norms.is_empty() {
        return Ok(0);
    }

    let mut tracks = db.tracks_by_artist_norms(&artist_norms)?;
    if tracks.is_empty() {
        return Ok(0);
    }
    tracks.sort_by(|a, b| {
        (a.artist.to_lowercase(), a.title.to_lowercase())
            .cmp(&(b.artist.to_lowercase(), b.title.to_lowercase()))
    });

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut body = String::from("#EXTM3U\n");
    body.push_str(&format!("# Playlist: {tag}\n"));
    body.push_str("# Generated by reprise\n");
    body.push_str(&format!("# {} tracks\n\n", tracks.len()));

    let playlist_dir = output_path.parent().unwrap_or_else(|| Path::new("."));
    for track in &tracks {
        let entry_path = relative_to(&track.path, playlist_dir);
        body.push_str(&format!("#EXTINF:-1,{} - {}\n", track.artist, track.title));
        body.push_str(&format!("{}\n", entry_path.display()));
    }

    std::fs::write(output_path, body)?;
    Ok(tracks.len())
}

/// Generate playlists for the most common tags.
///
/// Tags producing fewer than `min_songs` tracks are dropped, at most
/// `max_playlists` files are written. Returns (tag, track count) pairs for
/// the playlists that were kept.
pub fn generate_all(
    db: &Database,
    output_dir: &Path,
    min_songs: usize,
    max_playlists: usize,
) -> FetchResult<Vec<(String, usize)>> {
    std::fs::create_dir_all(output_dir)?;

    let mut popular = tag_frequencies(db)?.into_iter().collect::<Vec<_>>();
    popular.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut results = Vec::new();
    for (tag, _freq) in popular {
        if results.len() >= max_playlists {
            break;
        }
        // Single-character tags are too generic to be worth a file.
        if tag.chars().count() < 2 {
            continue;
        }

        let safe_name = tag.replace(['/', '\\'], "-");
        let output_path = output_dir.join(format!("{safe_name}.m3u"));

        let count = generate_playlist(db, &tag, &output_path)?;
        if count >= min_songs {
            info!("playlist '{tag}': {count} tracks");
            results.push((tag, count));
        } else if output_path.exists() {
            std::fs::remove_file(&output_path)?;
        }
    }

    info!("generated {} playlists in {}", results.len(), output_dir.display());
    Ok(results)
}

/// Express `path` relative to `dir` where possible, falling back to the
/// path as stored. Only handles the common case of the playlist directory
/// being an ancestor of the track.
fn relative_to(path: &Path, dir: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(dir) {
        return stripped.to_path_buf();
    }
    // One level up: playlists commonly live in <music_dir>/Playlists.
    if let Some(parent) = dir.parent() {
        if let Ok(stripped) = path.strip_prefix(parent) {
            return Path::new("..").join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_core::model::IndexedTrack;
    use tempfile::TempDir;

    fn tag(name: &str, count: u32) -> LastFmTag {
        LastFmTag {
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn test_base_artist_strips_collaborations() {
        assert_eq!(base_artist("Elton John feat. Dua Lipa"), "Elton John");
        assert_eq!(base_artist("Caetano Veloso part. Gilberto Gil"), "Caetano Veloso");
        assert_eq!(base_artist("Run the Jewels ft. Zack de la Rocha"), "Run the Jewels");
        assert_eq!(base_artist("Daft Punk"), "Daft Punk");
    }

    #[test]
    fn test_filter_tags_drops_blacklist_weak_and_self() {
        let normalizer = Normalizer::default();
        let tags = vec![
            tag("electronic", 100),
            tag("Seen Live", 90),
            tag("french house", 40),
            tag("obscure", 3),
            tag("Daft Punk", 80),
        ];
        let kept = filter_tags(&tags, "daft punk", &normalizer);
        assert_eq!(kept, vec!["electronic", "french house"]);
    }

    #[test]
    fn test_relative_to_strips_common_ancestor() {
        let track = Path::new("/music/Artist/song.mp3");
        assert_eq!(
            relative_to(track, Path::new("/music")),
            PathBuf::from("Artist/song.mp3")
        );
        assert_eq!(
            relative_to(track, Path::new("/music/Playlists")),
            PathBuf::from("../Artist/song.mp3")
        );
        assert_eq!(
            relative_to(track, Path::new("/elsewhere/deep")),
            PathBuf::from("/music/Artist/song.mp3")
        );
    }

    #[test]
    fn test_generate_playlist_writes_m3u() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let normalizer = Normalizer::default();

        for (artist, title, file) in [
            ("Daft Punk", "One More Time", "one_more_time.mp3"),
            ("Daft Punk", "Aerodynamic", "aerodynamic.mp3"),
            ("Adele", "Hello", "hello.mp3"),
        ] {
            let track = IndexedTrack::new(
                dir.path().join("library").join(file),
                artist.to_string(),
                title.to_string(),
                chrono::Utc::now(),
                &normalizer,
            );
            db.upsert_track(&track).unwrap();
        }
        db.set_artist_tags("daft punk", "Daft Punk", &["electronic".to_string()])
            .unwrap();
        db.set_artist_tags("adele", "Adele", &["pop".to_string()])
            .unwrap();

        let playlist = dir.path().join("Playlists").join("electronic.m3u");
        let count = generate_playlist(&db, "electronic", &playlist).unwrap();
        assert_eq!(count, 2);

        let body = std::fs::read_to_string(&playlist).unwrap();
        assert!(body.starts_with("#EXTM3U"));
        assert!(body.contains("#EXTINF:-1,Daft Punk - Aerodynamic"));
        assert!(body.contains("../library/aerodynamic.mp3"));
        // Sorted by artist then title: Aerodynamic before One More Time.
        let aero = body.find("Aerodynamic").unwrap();
        let omt = body.find("One More Time").unwrap();
        assert!(aero < omt);
    }

    #[test]
    fn test_generate_playlist_unknown_tag_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let playlist = dir.path().join("nope.m3u");
        assert_eq!(generate_playlist(&db, "vaporwave", &playlist).unwrap(), 0);
        assert!(!playlist.exists());
    }

    #[test]
    fn test_tag_frequencies_counts_artists() {
        let db = Database::open_in_memory().unwrap();
        db.set_artist_tags("a", "A", &["rock".to_string(), "pop".to_string()])
            .unwrap();
        db.set_artist_tags("b", "B", &["Rock".to_string()])
            .unwrap();
        let freq = tag_frequencies(&db).unwrap();
        assert_eq!(freq.get("rock"), Some(&2));
        assert_eq!(freq.get("pop"), Some(&1));

        let available = available_tags(&db, 2).unwrap();
        assert_eq!(available, vec![("rock".to_string(), 2)]);
    }
}
