//! Filename-derived metadata for files without usable tags.
//!
//! When tag extraction yields nothing, artist and title are inferred from the
//! file name. The heuristics are an explicit ordered list of strategies, each
//! a pure function over the de-prefixed stem; the first one that succeeds
//! wins. This is best-effort and never fails: a malformed name degrades to
//! "the whole stem is the title".

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading track-number prefix: digits followed by space/dot/dash/underscore
/// separators, e.g. "07 - ", "12. ", "03_".
static TRACK_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[\s.\-_]+").expect("track prefix pattern is valid"));

/// "Artist - Title" with a spaced hyphen, en-dash, or em-dash.
static ARTIST_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+[-\u{2013}\u{2014}]\s+(.+)$").expect("artist-title pattern is valid")
});

/// Outcome of one parsing strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub artist: Option<String>,
    pub title: String,
}

type Strategy = fn(&str) -> Option<ParsedName>;

/// Strategies in priority order. `title_only` always succeeds, so the chain
/// as a whole cannot fail.
const STRATEGIES: &[Strategy] = &[split_artist_title, title_only];

/// Parse a file stem (extension already removed) into artist and title.
///
/// Strips a leading track-number prefix first, then applies the strategy
/// chain. The caller decides whether to trust the artist half; files whose
/// tags already name an artist keep it.
pub fn parse_stem(stem: &str) -> ParsedName {
    let stem = TRACK_PREFIX_RE.replace(stem, "");
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&stem))
        .unwrap_or_else(|| ParsedName {
            artist: None,
            title: stem.trim().to_string(),
        })
}

fn split_artist_title(stem: &str) -> Option<ParsedName> {
    let caps = ARTIST_TITLE_RE.captures(stem)?;
    Some(ParsedName {
        artist: Some(caps[1].trim().to_string()),
        title: caps[2].trim().to_string(),
    })
}

fn title_only(stem: &str) -> Option<ParsedName> {
    Some(ParsedName {
        artist: None,
        title: stem.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_title_split() {
        let parsed = parse_stem("Daft Punk - One More Time");
        assert_eq!(parsed.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(parsed.title, "One More Time");
    }

    #[test]
    fn test_track_prefix_stripped_before_split() {
        let parsed = parse_stem("07 - Daft Punk - One More Time");
        assert_eq!(parsed.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(parsed.title, "One More Time");
    }

    #[test]
    fn test_prefix_separators() {
        assert_eq!(parse_stem("12. Aerodynamic").title, "Aerodynamic");
        assert_eq!(parse_stem("03_Aerodynamic").title, "Aerodynamic");
        assert_eq!(parse_stem("5 Aerodynamic").title, "Aerodynamic");
    }

    #[test]
    fn test_en_dash_separator() {
        let parsed = parse_stem("Sigur Rós – Hoppípolla");
        assert_eq!(parsed.artist.as_deref(), Some("Sigur Rós"));
        assert_eq!(parsed.title, "Hoppípolla");
    }

    #[test]
    fn test_unspaced_dash_is_not_a_separator() {
        // "Self-Titled" style names must not be split.
        let parsed = parse_stem("Twenty-One");
        assert_eq!(parsed.artist, None);
        assert_eq!(parsed.title, "Twenty-One");
    }

    #[test]
    fn test_plain_stem_falls_through_to_title() {
        let parsed = parse_stem("Aerodynamic");
        assert_eq!(parsed.artist, None);
        assert_eq!(parsed.title, "Aerodynamic");
    }

    #[test]
    fn test_split_strategy_alone() {
        assert!(split_artist_title("no separator here").is_none());
        let parsed = split_artist_title("A - B").unwrap();
        assert_eq!(parsed.artist.as_deref(), Some("A"));
        assert_eq!(parsed.title, "B");
    }
}
