//! Fuzzy matching of candidate tracks against the library index.
//!
//! A linear scan with a per-row similarity cost keeps well within
//! interactive latency for personal libraries (thousands of tracks), so no
//! secondary index structure is needed.

use crate::error::Result;
use crate::model::{CandidateTrack, IndexedTrack, MatchResult};
use crate::normalize::Normalizer;
use crate::schema::Database;
use crate::similarity::similarity;

/// Gating and scoring policy, selected by how confidently the candidate's
/// artist field can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Both artist and title must clear the gate before the weighted score
    /// is considered. Used for artist and tag queries.
    ArtistTitle,
    /// Title similarity alone, at an elevated gate, because the candidate's
    /// artist field cannot be assumed comparable to what the user meant.
    /// Used for title-search queries.
    TitleOnly,
}

/// Thresholds and weights for index matching.
///
/// The gate on *both* fields in artist+title mode is the precision guard: it
/// prevents a very strong title match paired with a wildly different artist
/// from slipping through the weighted sum.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Minimum artist similarity in artist+title mode.
    pub artist_gate: f64,
    /// Minimum title similarity in artist+title mode.
    pub title_gate: f64,
    /// Minimum title similarity in title-only mode (elevated, since no
    /// artist corroboration exists).
    pub title_only_gate: f64,
    /// Artist weight in the combined artist+title score.
    pub artist_weight: f64,
    /// Title weight in the combined artist+title score.
    pub title_weight: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            artist_gate: 0.70,
            title_gate: 0.70,
            title_only_gate: 0.80,
            artist_weight: 0.3,
            title_weight: 0.7,
        }
    }
}

/// Scans the library index for the best match above a mode-specific
/// threshold.
#[derive(Debug)]
pub struct MatchEngine<'a> {
    normalizer: &'a Normalizer,
    config: MatchConfig,
}

impl<'a> MatchEngine<'a> {
    pub fn new(normalizer: &'a Normalizer) -> Self {
        Self::with_config(normalizer, MatchConfig::default())
    }

    pub fn with_config(normalizer: &'a Normalizer, config: MatchConfig) -> Self {
        Self { normalizer, config }
    }

    /// Best qualifying index row for `(artist, title)`, or `None` when no
    /// row survives the gates. "No match" is an expected outcome, not an
    /// error.
    pub fn find_best_match(
        &self,
        db: &Database,
        artist: &str,
        title: &str,
        mode: MatchMode,
    ) -> Result<Option<MatchResult>> {
        let rows = db.all_tracks()?;
        Ok(self.best_against(&rows, artist, title, mode))
    }

    /// Annotate a batch of candidates against the index, returning a new
    /// annotated collection plus the number of candidates that matched.
    ///
    /// Candidates are expected to arrive unannotated; `local_match` is set
    /// at most once per run.
    pub fn annotate(
        &self,
        db: &Database,
        candidates: Vec<CandidateTrack>,
        mode: MatchMode,
    ) -> Result<(Vec<CandidateTrack>, usize)> {
        let rows = db.all_tracks()?;
        let mut matched = 0;
        let annotated = candidates
            .into_iter()
            .map(|mut candidate| {
                let found = self.best_against(&rows, &candidate.artist, &candidate.name, mode);
                if found.is_some() {
                    matched += 1;
                }
                candidate.local_match = found;
                candidate
            })
            .collect();
        Ok((annotated, matched))
    }

    fn best_against(
        &self,
        rows: &[IndexedTrack],
        artist: &str,
        title: &str,
        mode: MatchMode,
    ) -> Option<MatchResult> {
        let title_norm = self.normalizer.canonical(title);
        match mode {
            MatchMode::ArtistTitle => {
                let artist_norm = self.normalizer.canonical(artist);
                self.best_artist_title(rows, &artist_norm, &title_norm)
            }
            MatchMode::TitleOnly => self.best_title_only(rows, &title_norm),
        }
    }

    fn best_artist_title(
        &self,
        rows: &[IndexedTrack],
        artist_norm: &str,
        title_norm: &str,
    ) -> Option<MatchResult> {
        let mut best: Option<MatchResult> = None;
        let mut best_score = 0.0;

        for row in rows {
            let artist_sim = similarity(artist_norm, &row.artist_norm);
            if artist_sim < self.config.artist_gate {
                continue;
            }
            let title_sim = similarity(title_norm, &row.title_norm);
            if title_sim < self.config.title_gate {
                continue;
            }

            let score =
                artist_sim * self.config.artist_weight + title_sim * self.config.title_weight;
            // Strict comparison: ties keep the first-encountered row.
            if score > best_score {
                best_score = score;
                best = Some(MatchResult {
                    path: row.path.clone(),
                    artist: row.artist.clone(),
                    title: row.title.clone(),
                    score,
                });
            }
        }

        best
    }

    fn best_title_only(&self, rows: &[IndexedTrack], title_norm: &str) -> Option<MatchResult> {
        let mut best: Option<MatchResult> = None;
        let mut best_score = 0.0;

        for row in rows {
            let title_sim = similarity(title_norm, &row.title_norm);
            if title_sim < self.config.title_only_gate {
                continue;
            }
            if title_sim > best_score {
                best_score = title_sim;
                best = Some(MatchResult {
                    path: row.path.clone(),
                    artist: row.artist.clone(),
                    title: row.title.clone(),
                    score: title_sim,
                });
            }
        }

        best
    }
}
