//! Lexical similarity scoring for spoken attempts.
//!
//! Both strings are lowercased, compared with a character-level Levenshtein
//! distance and normalized by the longer length:
//!
//! `similarity = 1 - distance / max(len(target), len(attempt))`
//!
//! Tiers are fixed: above 0.70 is a success, above 0.50 a partial match,
//! anything else asks for a retry. Tier boundaries are decided on the exact
//! rational `distance / max_len` so that a similarity of exactly 0.70 or 0.50
//! never flips because of floating point rounding.

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ─── TIER ──────────────────────────────────────────────────────────────────────
//

/// Coarse feedback classification derived from a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// similarity > 0.70
    Success,
    /// 0.50 < similarity <= 0.70
    Partial,
    /// similarity <= 0.50
    Retry,
}

impl Tier {
    /// Classifies an edit distance against the longer of the two lengths.
    ///
    /// `max_len == 0` (both strings empty) is a perfect match.
    #[must_use]
    pub fn classify(distance: usize, max_len: usize) -> Self {
        if max_len == 0 {
            return Tier::Success;
        }
        // 1 - d/m > 0.7  <=>  10d < 3m
        if distance.saturating_mul(10) < max_len.saturating_mul(3) {
            Tier::Success
        // 1 - d/m > 0.5  <=>  2d < m
        } else if distance.saturating_mul(2) < max_len {
            Tier::Partial
        } else {
            Tier::Retry
        }
    }

    /// Fixed score shown to the user for this tier.
    #[must_use]
    pub fn display_score(self) -> u8 {
        match self {
            Tier::Success => 100,
            Tier::Partial => 70,
            Tier::Retry => 30,
        }
    }

    /// Encouraging message shown alongside the score.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Tier::Success => "Excellent! That sounded great.",
            Tier::Partial => "Good try! You're getting close.",
            Tier::Retry => "Let's try that again. Listen carefully and repeat.",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Success => "success",
            Tier::Partial => "partial",
            Tier::Retry => "retry",
        };
        f.write_str(label)
    }
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Result of comparing an attempt with its target utterance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub similarity: f64,
    pub tier: Tier,
}

impl Score {
    #[must_use]
    pub fn feedback(&self) -> Feedback {
        Feedback {
            tier: self.tier,
            message: self.tier.message().to_owned(),
            score: self.tier.display_score(),
            similarity: self.similarity,
        }
    }
}

/// Feedback attached to a session after an attempt has been scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub tier: Tier,
    pub message: String,
    /// Fixed display score (100, 70 or 30).
    pub score: u8,
    pub similarity: f64,
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Levenshtein distance over Unicode scalar values.
///
/// Insertions, deletions and substitutions each cost 1. Keeps two rows of the
/// usual `(n + 1) x (m + 1)` table.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Scores a spoken `attempt` against the `target` utterance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score(target: &str, attempt: &str) -> Score {
    let target = target.to_lowercase();
    let attempt = attempt.to_lowercase();

    let max_len = target.chars().count().max(attempt.chars().count());
    let distance = levenshtein(&target, &attempt);

    let similarity = if max_len == 0 {
        1.0
    } else {
        1.0 - distance as f64 / max_len as f64
    };

    Score {
        similarity,
        tier: Tier::classify(distance, max_len),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_matches_textbook_cases() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn similarity_is_symmetric() {
        assert_eq!(score("cat", "bat").similarity, score("bat", "cat").similarity);
        assert_eq!(
            score("Peter Piper", "peter pipes").similarity,
            score("peter pipes", "Peter Piper").similarity
        );
    }

    #[test]
    fn identical_strings_are_a_success() {
        for s in ["Park", "She sells seashells by the seashore.", "a"] {
            let result = score(s, s);
            assert!((result.similarity - 1.0).abs() < f64::EPSILON);
            assert_eq!(result.tier, Tier::Success);
        }
    }

    #[test]
    fn comparison_ignores_case() {
        let result = score("Park", "park");
        assert!((result.similarity - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.tier, Tier::Success);
    }

    #[test]
    fn empty_strings_are_a_perfect_match() {
        let result = score("", "");
        assert!((result.similarity - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.tier, Tier::Success);
    }

    #[test]
    fn exactly_seventy_percent_is_partial() {
        // distance 3 over 10 characters
        let result = score("abcdefghij", "abcdefgxyz");
        assert!((result.similarity - 0.7).abs() < 1e-9);
        assert_eq!(result.tier, Tier::Partial);

        // distance 2 over 10 characters
        let above = score("abcdefghij", "abcdefghyz");
        assert!((above.similarity - 0.8).abs() < 1e-9);
        assert_eq!(above.tier, Tier::Success);
    }

    #[test]
    fn exactly_fifty_percent_is_retry() {
        let result = score("abcd", "abxy");
        assert!((result.similarity - 0.5).abs() < 1e-9);
        assert_eq!(result.tier, Tier::Retry);

        let above = score("abcdefghij", "abcdefwxyz");
        assert!((above.similarity - 0.6).abs() < 1e-9);
        assert_eq!(above.tier, Tier::Partial);
    }

    #[test]
    fn unrelated_attempt_is_retry() {
        assert_eq!(score("Hospital", "banana").tier, Tier::Retry);
        assert_eq!(score("Park", "").tier, Tier::Retry);
    }

    #[test]
    fn feedback_uses_fixed_display_scores() {
        assert_eq!(score("Park", "park").feedback().score, 100);
        assert_eq!(score("abcdefghij", "abcdefgxyz").feedback().score, 70);
        assert_eq!(score("abcd", "wxyz").feedback().score, 30);
        assert_eq!(
            score("abcd", "wxyz").feedback().message,
            Tier::Retry.message()
        );
    }

    #[test]
    fn distance_counts_characters_not_bytes() {
        assert_eq!(levenshtein("café", "cafe"), 1);
        let result = score("Café", "café");
        assert_eq!(result.tier, Tier::Success);
    }
}
