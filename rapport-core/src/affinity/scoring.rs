//! Rule-based interaction scoring — message text → [`InteractionType`].
//!
//! A deterministic keyword heuristic used when no richer sentiment signal is
//! available. It only has to be good enough to nudge affinity in the right
//! direction; the point deltas it feeds are small and saturating.

use std::sync::LazyLock;

use regex::Regex;

use super::InteractionType;

const POSITIVE_WORDS: &[&str] = &[
    "thanks", "thank", "appreciate", "grateful", "great", "good", "nice", "glad", "happy",
    "helpful", "like", "enjoy", "fun", "cool", "awesome", "kind", "sweet", "welcome",
];

const STRONG_POSITIVE_WORDS: &[&str] = &[
    "love", "adore", "amazing", "wonderful", "fantastic", "best", "incredible", "brilliant",
    "perfect",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "annoying", "annoyed", "boring", "wrong", "useless", "disappointed", "rude",
    "dislike", "ugh", "whatever", "meh", "irritating",
];

const STRONG_NEGATIVE_WORDS: &[&str] = &[
    "hate", "stupid", "idiot", "terrible", "awful", "pathetic", "worst", "disgusting",
    "shut",
];

const INTENSIFIERS: &[&str] = &["so", "very", "really", "truly", "absolutely", "extremely"];

const NEGATORS: &str =
    r"don't|dont|do not|doesn't|does not|didn't|did not|isn't|is not|wasn't|was not|not|never|no longer";

/// A negator followed (within one filler word) by praise: "don't like",
/// "not really helpful", "never enjoy".
static NEGATED_PRAISE: LazyLock<Regex> = LazyLock::new(|| {
    let praise = POSITIVE_WORDS
        .iter()
        .chain(STRONG_POSITIVE_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"\b(?:{NEGATORS})\s+(?:(?:really|even|very|that|so|at all)\s+)?(?P<word>{praise})\b"
    ))
    .expect("negation pattern compiles")
});

/// Classify a user message into an [`InteractionType`].
#[must_use]
pub fn score_interaction(message: &str) -> InteractionType {
    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    let count = |list: &[&str]| words.iter().filter(|w| list.contains(w)).count();
    let (mut negated, mut negated_strong) = (0, 0);
    for caps in NEGATED_PRAISE.captures_iter(&lowered) {
        match caps.name("word") {
            Some(w) if STRONG_POSITIVE_WORDS.contains(&w.as_str()) => negated_strong += 1,
            Some(_) => negated += 1,
            None => {}
        }
    }

    // Negated praise counts against the message, never as a strong hit.
    let positive = count(POSITIVE_WORDS).saturating_sub(negated);
    let strong_positive = count(STRONG_POSITIVE_WORDS).saturating_sub(negated_strong);
    let negative = count(NEGATIVE_WORDS) + negated + negated_strong;
    let strong_negative = count(STRONG_NEGATIVE_WORDS);
    let intensified = count(INTENSIFIERS) > 0 || message.contains("!!");

    let pos_score = positive + 2 * strong_positive;
    let neg_score = negative + 2 * strong_negative;

    match pos_score.cmp(&neg_score) {
        std::cmp::Ordering::Greater => {
            if strong_positive > 0 || (intensified && positive > 0) || pos_score - neg_score >= 3 {
                InteractionType::VeryPositive
            } else {
                InteractionType::Positive
            }
        }
        std::cmp::Ordering::Less => {
            if strong_negative > 0 || (intensified && negative > 0) || neg_score - pos_score >= 3 {
                InteractionType::VeryNegative
            } else {
                InteractionType::Negative
            }
        }
        std::cmp::Ordering::Equal => InteractionType::Neutral,
    }
}
