//! Post-download match verification.
//!
//! Before a download backend's resolution is accepted, the resolved
//! (artist, title) pair is compared against what was actually requested.
//! Downloading the wrong song is worse than failing to download at all, so
//! a rejection must send the caller to a *different* resolution backend,
//! never back to the same source.

use crate::normalize::Normalizer;
use crate::similarity::similarity;

/// Acceptance thresholds for resolution verification.
///
/// These are looser than the index-matching gates: a resolution only has to
/// be plausibly the same song, not a library duplicate.
#[derive(Debug, Clone, Copy)]
pub struct VerifyConfig {
    /// Minimum artist similarity for the two-sided acceptance rule.
    pub artist_threshold: f64,
    /// Minimum title similarity for the two-sided acceptance rule.
    pub title_threshold: f64,
    /// An excellent title match alone is accepted at this threshold,
    /// covering cross-service artist-name spelling divergence.
    pub title_override: f64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            artist_threshold: 0.5,
            title_threshold: 0.5,
            title_override: 0.8,
        }
    }
}

/// Verification outcome: the decision plus both similarity scores, so the
/// caller can log the mismatch before falling back.
#[derive(Debug, Clone, Copy)]
pub struct Verdict {
    pub accepted: bool,
    pub artist_sim: f64,
    pub title_sim: f64,
}

/// Decides whether an externally-resolved (artist, title) pair is an
/// acceptable answer for a requested pair.
#[derive(Debug)]
pub struct Verifier<'a> {
    normalizer: &'a Normalizer,
    config: VerifyConfig,
}

impl<'a> Verifier<'a> {
    pub fn new(normalizer: &'a Normalizer) -> Self {
        Self::with_config(normalizer, VerifyConfig::default())
    }

    pub fn with_config(normalizer: &'a Normalizer, config: VerifyConfig) -> Self {
        Self { normalizer, config }
    }

    /// Compare a requested pair against a resolved pair.
    ///
    /// Accepts when both similarities clear their thresholds, or when the
    /// title alone is an excellent match. Rejection is a first-class
    /// outcome, not an error.
    pub fn verify(
        &self,
        req_artist: &str,
        req_title: &str,
        got_artist: &str,
        got_title: &str,
    ) -> Verdict {
        let artist_sim = similarity(
            &self.normalizer.canonical(req_artist),
            &self.normalizer.canonical(got_artist),
        );
        let title_sim = similarity(
            &self.normalizer.canonical(req_title),
            &self.normalizer.canonical(got_title),
        );

        let accepted = (artist_sim >= self.config.artist_threshold
            && title_sim >= self.config.title_threshold)
            || title_sim >= self.config.title_override;

        Verdict {
            accepted,
            artist_sim,
            title_sim,
        }
    }
}
