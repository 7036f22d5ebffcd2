//! Canonicalization of artist and title strings.
//!
//! Raw tag metadata is full of rendition markers ("(Radio Edit)",
//! "- Remastered 2009"), accents, and punctuation that defeat naive string
//! comparison. The normalizer reduces a display string to a canonical form:
//! lower-case, variant markers stripped, accents folded to base letters,
//! punctuation collapsed to single spaces. The output is deterministic and
//! idempotent, so normalized fields can be cached in the index and compared
//! directly.

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

/// Keyword lists driving variant-marker stripping.
///
/// The defaults are intentionally small and language-mixed (English +
/// Portuguese), reflecting real-world tag conventions. Changing either list
/// changes which strings compare as equal, so the defaults must stay exactly
/// as documented to preserve matching behavior against existing libraries.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// A parenthesized or bracketed segment is dropped when its content
    /// contains one of these keywords (case-insensitive substring match) or
    /// a 4-digit year. Segments without a keyword are kept.
    pub bracket_keywords: Vec<String>,
    /// A trailing dash-delimited suffix is dropped when it begins with one
    /// of these keywords.
    pub suffix_keywords: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            bracket_keywords: [
                "radio", "edit", "remaster", "live", "version", "remix", "acoustic", "feat",
                "ft", "bonus", "extended", "single", "album", "original", "official", "video",
                "audio", "hd", "hq",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            suffix_keywords: ["remaster", "live", "acoustic", "remix", "ao vivo", "remasterizado"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Converts raw metadata strings to canonical comparison form.
#[derive(Debug)]
pub struct Normalizer {
    bracket_re: Regex,
    suffix_re: Regex,
}

impl Normalizer {
    /// Build a normalizer from the given keyword configuration.
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        let bracket_alts = alternation(&config.bracket_keywords);
        let suffix_alts = alternation(&config.suffix_keywords);

        // A 4-digit year counts as a variant marker alongside the keywords.
        let bracket_re = Regex::new(&format!(
            r"(?i)\s*[(\[][^)\]]*(?:{bracket_alts}|\d{{4}})[^)\]]*[)\]]"
        ))?;
        // The dash may be a hyphen, en-dash, or em-dash.
        let suffix_re = Regex::new(&format!(r"(?i)\s*[-\u{{2013}}\u{{2014}}]\s*(?:{suffix_alts}).*$"))?;

        Ok(Self { bracket_re, suffix_re })
    }

    /// Reduce `text` to canonical form.
    ///
    /// Empty input yields empty output. The transform is idempotent:
    /// `canonical(canonical(x)) == canonical(x)` for all `x`.
    pub fn canonical(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let text = text.to_lowercase();
        let text = self.bracket_re.replace_all(&text, "");
        let text = self.suffix_re.replace(&text, "");

        // Decompose accents and drop the combining marks (é -> e, ã -> a).
        let text: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();

        // Everything that is not alphanumeric or whitespace becomes a space.
        let text: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default()).expect("default normalizer patterns are valid")
    }
}

fn alternation(keywords: &[String]) -> String {
    if keywords.is_empty() {
        // A branch that can never match, so an empty keyword list disables
        // the corresponding strip pass instead of matching everything.
        return r"\b\B".to_string();
    }
    keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_trims() {
        let n = Normalizer::default();
        assert_eq!(n.canonical("  One More Time  "), "one more time");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let n = Normalizer::default();
        assert_eq!(n.canonical(""), "");
    }

    #[test]
    fn test_strips_variant_brackets() {
        let n = Normalizer::default();
        assert_eq!(n.canonical("Song (Radio Edit)"), n.canonical("Song"));
        assert_eq!(n.canonical("Song [Live]"), n.canonical("Song"));
        assert_eq!(n.canonical("Song (2009 Remaster)"), n.canonical("Song"));
        assert_eq!(n.canonical("Song (1999)"), n.canonical("Song"));
    }

    #[test]
    fn test_keeps_non_variant_brackets() {
        let n = Normalizer::default();
        // "Deluxe" is not a recognized keyword, so the segment stays.
        assert_ne!(n.canonical("Song (Deluxe)"), n.canonical("Song"));
        assert_eq!(n.canonical("Song (Deluxe)"), "song deluxe");
    }

    #[test]
    fn test_strips_dash_suffix() {
        let n = Normalizer::default();
        assert_eq!(n.canonical("Song - Remastered 2009"), "song");
        assert_eq!(n.canonical("Song – Live at Wembley"), "song");
        assert_eq!(n.canonical("Canção - Ao Vivo"), "cancao");
    }

    #[test]
    fn test_keeps_non_variant_dash_suffix() {
        let n = Normalizer::default();
        assert_eq!(n.canonical("Run - Boy - Run"), "run boy run");
    }

    #[test]
    fn test_strips_accents() {
        let n = Normalizer::default();
        assert_eq!(n.canonical("Café"), n.canonical("Cafe"));
        assert_eq!(n.canonical("Beyoncé"), "beyonce");
        assert_eq!(n.canonical("Motörhead"), "motorhead");
    }

    #[test]
    fn test_collapses_punctuation() {
        let n = Normalizer::default();
        assert_eq!(n.canonical("AC/DC"), "ac dc");
        assert_eq!(n.canonical("Guns N' Roses"), "guns n roses");
        assert_eq!(n.canonical("don't---stop"), "don t stop");
    }

    #[test]
    fn test_idempotent() {
        let n = Normalizer::default();
        for s in [
            "Song (Radio Edit)",
            "Café del Mar – Remix",
            "  AC/DC — Live  ",
            "Beyoncé [Official Video]",
            "plain title",
            "",
        ] {
            let once = n.canonical(s);
            assert_eq!(n.canonical(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_custom_keyword_list() {
        let config = NormalizerConfig {
            bracket_keywords: vec!["deluxe".to_string()],
            suffix_keywords: vec![],
        };
        let n = Normalizer::new(&config).unwrap();
        assert_eq!(n.canonical("Song (Deluxe)"), "song");
        // "radio" is no longer a keyword under this config.
        assert_eq!(n.canonical("Song (Radio Edit)"), "song radio edit");
    }
}
