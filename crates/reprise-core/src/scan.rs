//! Library reconciliation: keep the index in sync with the filesystem.
//!
//! A pass enumerates audio files under the music root, prunes index rows for
//! files that vanished, and re-extracts metadata for files that are new or
//! whose modification time advanced past the stored fingerprint. The whole
//! pass commits as a single transaction, so readers never observe a
//! half-reconciled index.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use lofty::file::TaggedFileExt;
use lofty::prelude::ItemKey;
use lofty::tag::Accessor;
use walkdir::WalkDir;

use crate::error::Result;
use crate::filename;
use crate::model::IndexedTrack;
use crate::normalize::Normalizer;
use crate::schema::Database;

/// Extensions scanned by default, lowercase, without the dot.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "ogg", "opus", "wav", "wma"];

/// Reads embedded (artist, title) tags from an audio file.
///
/// Implementations must fail silently: unreadable or foreign formats yield
/// `(None, None)`, which the scanner treats as "no tags", not an error.
pub trait TagReader {
    fn read_tags(&self, path: &Path) -> (Option<String>, Option<String>);
}

/// Default tag reader backed by lofty.
#[derive(Debug, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> (Option<String>, Option<String>) {
        let Ok(tagged_file) = lofty::read_from_path(path) else {
            return (None, None);
        };
        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return (None, None);
        };

        let artist = tag
            .artist()
            .map(|s| s.to_string())
            .or_else(|| tag.get_string(&ItemKey::AlbumArtist).map(|s| s.to_string()))
            .filter(|s| !s.is_empty());
        let title = tag.title().map(|s| s.to_string()).filter(|s| !s.is_empty());
        (artist, title)
    }
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Total indexed rows after the pass.
    pub total: u64,
    /// Rows inserted or updated during the pass.
    pub changed: u64,
    /// Rows deleted because the file is gone.
    pub removed: u64,
}

/// Reconcile the index with the filesystem under `root`.
///
/// With `force` set, every present file is re-extracted regardless of its
/// stored fingerprint. The pass is idempotent: a second run with no
/// filesystem changes reports the same total and performs zero extractions.
pub fn reconcile(
    db: &Database,
    normalizer: &Normalizer,
    tags: &dyn TagReader,
    root: &Path,
    extensions: &[String],
    force: bool,
) -> Result<ScanSummary> {
    let files = enumerate_audio_files(root, extensions);
    let present: HashSet<String> = files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();

    let tx = db.transaction()?;

    let indexed_paths = db.all_paths()?;
    let missing: HashSet<String> = indexed_paths.difference(&present).cloned().collect();
    let removed = db.delete_paths(&missing)? as u64;

    let fingerprints = db.indexed_mtimes()?;

    let mut changed = 0u64;
    for path in &files {
        // A file deleted between enumeration and stat is an ordinary
        // "missing" case; it gets pruned on the next pass.
        let Ok(meta) = std::fs::metadata(path) else {
            continue;
        };
        let Ok(modified) = meta.modified() else {
            continue;
        };
        let mtime: DateTime<Utc> = modified.into();

        let key = path.to_string_lossy();
        if !force && fingerprints.get(key.as_ref()).is_some_and(|stored| *stored >= mtime) {
            continue;
        }

        let (artist, title) = extract_metadata(tags, path);
        db.upsert_track(&IndexedTrack::new(path.clone(), artist, title, mtime, normalizer))?;
        changed += 1;
    }

    let total = db.track_count()?;
    tx.commit()?;

    log::info!("Library scan: {total} tracks ({changed} new/updated, {removed} removed)");
    Ok(ScanSummary {
        total,
        changed,
        removed,
    })
}

/// Recursively enumerate files under `root` whose extension matches one of
/// `extensions` (case-insensitively).
fn enumerate_audio_files(root: &Path, extensions: &[String]) -> Vec<std::path::PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
        })
        .collect()
}

/// Tag extraction with the filename fallback chain.
///
/// Tags win when present. A missing title falls back to stem parsing; a
/// still-missing artist falls back to the parent directory name.
fn extract_metadata(tags: &dyn TagReader, path: &Path) -> (String, String) {
    let (tag_artist, tag_title) = tags.read_tags(path);
    let mut artist = tag_artist.unwrap_or_default();
    let mut title = tag_title.unwrap_or_default();

    if title.is_empty() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parsed = filename::parse_stem(&stem);
        if artist.is_empty() {
            if let Some(parsed_artist) = parsed.artist {
                artist = parsed_artist;
            }
        }
        title = parsed.title;
    }

    if artist.is_empty() {
        artist = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    (artist, title)
}
