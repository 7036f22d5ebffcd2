//! Sequence similarity between canonical strings.
//!
//! The scorer is the classic longest-common-subsequence ratio: twice the
//! number of matching characters divided by the combined length of both
//! inputs. Every threshold in [`crate::matcher`] and [`crate::verify`] is
//! calibrated against this metric's output distribution, so it must not be
//! swapped for an edit-distance or token-set measure.

/// Similarity ratio between two strings, in `[0.0, 1.0]`.
///
/// Equal strings (including two empty strings) score 1.0. Strings with no
/// common subsequence score 0.0. Inputs are expected to already be in
/// canonical form (see [`crate::normalize::Normalizer`]); the scorer itself
/// does no case folding.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    2.0 * lcs_length(&a, &b) as f64 / (a.len() + b.len()) as f64
}

/// Length of the longest common subsequence, computed with a two-row
/// dynamic-programming table (O(n*m) time, O(m) space).
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_one() {
        assert_eq!(similarity("one more time", "one more time"), 1.0);
        assert_eq!(similarity("a", "a"), 1.0);
    }

    #[test]
    fn test_empty_pair_scores_one() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_empty_against_nonempty_scores_zero() {
        assert_eq!(similarity("", "song"), 0.0);
        assert_eq!(similarity("song", ""), 0.0);
    }

    #[test]
    fn test_disjoint_strings_score_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_known_ratio() {
        // lcs("night", "nig") = 3, ratio = 2*3 / (5+3) = 0.75
        let sim = similarity("night", "nig");
        assert!((sim - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric() {
        let ab = similarity("daft punk", "daft pun");
        let ba = similarity("daft pun", "daft punk");
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_subsequence_not_substring() {
        // "ace" is a subsequence of "abcde" even though not contiguous.
        let sim = similarity("abcde", "ace");
        assert!((sim - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_range_bounds() {
        for (a, b) in [
            ("the beatles", "beatles the"),
            ("hello", "world"),
            ("x", "xxxxxxxx"),
        ] {
            let sim = similarity(a, b);
            assert!((0.0..=1.0).contains(&sim), "{a} vs {b} -> {sim}");
        }
    }
}
