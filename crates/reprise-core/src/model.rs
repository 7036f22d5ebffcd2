//! Data model for the library index and the matching engine.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::normalize::Normalizer;

/// One row per known local audio file.
///
/// `artist_norm` and `title_norm` are a cache of the canonical forms, never
/// an independent source of truth: they are recomputed whenever the display
/// strings are written. The store is keyed by `path`, so renaming a file on
/// disk produces a delete plus an insert, not an update.
#[derive(Debug, Clone)]
pub struct IndexedTrack {
    /// Absolute filesystem path; primary key.
    pub path: PathBuf,
    /// Display artist as read from tags or inferred from the filename.
    pub artist: String,
    /// Display title as read from tags or inferred from the filename.
    pub title: String,
    /// Canonical form of `artist`; derived.
    pub artist_norm: String,
    /// Canonical form of `title`; derived.
    pub title_norm: String,
    /// Source file's last-modification timestamp. A change-detection
    /// fingerprint only, not a semantic attribute.
    pub modified_at: DateTime<Utc>,
}

impl IndexedTrack {
    /// Build a track row, computing the normalized fields from the display
    /// strings. This is the only way rows are constructed, which keeps the
    /// `*_norm == normalize(*)` invariant intact.
    pub fn new(
        path: impl Into<PathBuf>,
        artist: impl Into<String>,
        title: impl Into<String>,
        modified_at: DateTime<Utc>,
        normalizer: &Normalizer,
    ) -> Self {
        let artist = artist.into();
        let title = title.into();
        let artist_norm = normalizer.canonical(&artist);
        let title_norm = normalizer.canonical(&title);
        Self {
            path: path.into(),
            artist,
            title,
            artist_norm,
            title_norm,
            modified_at,
        }
    }
}

/// Best qualifying index row for a candidate, with its similarity score.
///
/// Only the highest-scoring record is ever retained; this is a best-match
/// result, not an entry in a top-k list.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub path: PathBuf,
    pub artist: String,
    pub title: String,
    /// Weighted similarity in `[0.0, 1.0]`.
    pub score: f64,
}

/// One result from a remote track lookup; held only for the duration of a
/// single run.
#[derive(Debug, Clone)]
pub struct CandidateTrack {
    pub name: String,
    pub artist: String,
    /// Ranking signal whose meaning depends on the query mode that produced
    /// it: play count for artist queries, absent for tag queries, listener
    /// count for title search. Not comparable across modes.
    pub popularity: Option<u64>,
    /// Result of matching this candidate against the library index. `None`
    /// until computed; set at most once per run.
    pub local_match: Option<MatchResult>,
}

impl CandidateTrack {
    pub fn new(name: impl Into<String>, artist: impl Into<String>, popularity: Option<u64>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            popularity,
            local_match: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.local_match.is_some()
    }
}

/// Convenience for displaying a path without lossy surprises in logs.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_track_computes_normalized_fields() {
        let n = Normalizer::default();
        let track = IndexedTrack::new(
            "/music/Daft Punk/One More Time (Radio Edit).mp3",
            "Daft Punk",
            "One More Time (Radio Edit)",
            Utc::now(),
            &n,
        );
        assert_eq!(track.artist_norm, "daft punk");
        assert_eq!(track.title_norm, "one more time");
    }

    #[test]
    fn test_candidate_starts_unmatched() {
        let c = CandidateTrack::new("Aerodynamic", "Daft Punk", Some(1_000));
        assert!(!c.is_local());
        assert_eq!(c.popularity, Some(1_000));
    }
}
