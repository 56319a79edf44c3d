//! Keyword heuristics that spot memorable moments in an exchange.

use crate::affinity::{InteractionType, score_interaction};

use super::{EpisodeType, Sentiment};

/// Longest summary kept, in characters.
const MAX_SUMMARY_CHARS: usize = 280;

const CUES: &[(EpisodeType, &[&str])] = &[
    (
        EpisodeType::EmotionalMoment,
        &[
            "passed away", "died", "funeral", "i'm scared", "i am scared", "panic attack",
            "depressed", "heartbroken", "crying", "i cried", "so lonely", "grieving",
        ],
    ),
    (
        EpisodeType::Confession,
        &[
            "never told anyone", "confess", "my secret", "don't tell anyone", "to be honest with you",
            "i've been hiding", "i have been hiding", "ashamed",
        ],
    ),
    (
        EpisodeType::Milestone,
        &[
            "got married", "engaged", "graduated", "new job", "moved to", "first day",
            "anniversary", "pregnant", "had a baby", "retired", "birthday",
        ],
    ),
    (
        EpisodeType::Achievement,
        &[
            "i did it", "i passed", "got promoted", "promotion", "i won", "finished my",
            "accepted into", "got accepted", "proud of myself",
        ],
    ),
    (
        EpisodeType::Bonding,
        &[
            "thank you so much", "you mean a lot", "you're the best", "you are the best",
            "glad i have you", "you always understand", "love talking to you", "you're my friend",
        ],
    ),
    (
        EpisodeType::Conflict,
        &[
            "you don't understand", "you never listen", "i'm angry at you", "that hurt",
            "you're wrong", "stop it", "leave me alone", "i'm upset with you",
        ],
    ),
];

/// A moment recognised in an exchange, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedEpisode {
    /// Kind of moment.
    pub episode_type: EpisodeType,
    /// Emotional colour of the exchange.
    pub sentiment: Sentiment,
    /// Short headline.
    pub title: String,
    /// Condensed exchange.
    pub summary: String,
    /// Cues that matched, for tagging.
    pub cues: Vec<String>,
}

/// Recognises memorable moments with keyword cues.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpisodeDetector;

impl EpisodeDetector {
    /// Inspect an exchange.
    ///
    /// Returns `None` for routine small talk. When cues of several types
    /// match, the type with the highest base importance wins.
    #[must_use]
    pub fn detect<S: AsRef<str>>(&self, messages: &[S]) -> Option<DetectedEpisode> {
        let text = messages
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        let lower = text.to_lowercase();

        let mut best: Option<(EpisodeType, Vec<String>)> = None;
        for (episode_type, cues) in CUES {
            let hits: Vec<String> = cues
                .iter()
                .filter(|cue| lower.contains(**cue))
                .map(|cue| (*cue).to_string())
                .collect();
            if hits.is_empty() {
                continue;
            }
            let better = best
                .as_ref()
                .is_none_or(|(t, _)| episode_type.base_importance() > t.base_importance());
            if better {
                best = Some((*episode_type, hits));
            }
        }

        let (episode_type, cues) = best?;
        let sentiment = match score_interaction(&text) {
            InteractionType::VeryPositive => Sentiment::VeryPositive,
            InteractionType::Positive => Sentiment::Positive,
            InteractionType::Neutral => Sentiment::Neutral,
            InteractionType::Negative => Sentiment::Negative,
            InteractionType::VeryNegative => Sentiment::VeryNegative,
        };
        Some(DetectedEpisode {
            episode_type,
            sentiment: adjust_for_type(episode_type, sentiment),
            title: title_for(episode_type, &cues),
            summary: summarize(&text),
            cues,
        })
    }
}

// Grief and conflict read as neutral to the affinity scorer when the user is
// polite about them.
fn adjust_for_type(episode_type: EpisodeType, sentiment: Sentiment) -> Sentiment {
    match (episode_type, sentiment) {
        (EpisodeType::EmotionalMoment | EpisodeType::Conflict, Sentiment::Neutral | Sentiment::Positive) => {
            Sentiment::Negative
        }
        (EpisodeType::Achievement | EpisodeType::Bonding, Sentiment::Neutral) => Sentiment::Positive,
        _ => sentiment,
    }
}

fn title_for(episode_type: EpisodeType, cues: &[String]) -> String {
    let label = match episode_type {
        EpisodeType::EmotionalMoment => "Shared something painful",
        EpisodeType::Confession => "Opened up",
        EpisodeType::Milestone => "Life milestone",
        EpisodeType::Achievement => "Celebrated an achievement",
        EpisodeType::Bonding => "A warm moment",
        EpisodeType::Conflict => "A disagreement",
        EpisodeType::Routine | EpisodeType::Other => "A conversation",
    };
    match cues.first() {
        Some(cue) => format!("{label}: {cue}"),
        None => label.to_string(),
    }
}

fn summarize(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_SUMMARY_CHARS {
        return flat;
    }
    let mut out: String = flat.chars().take(MAX_SUMMARY_CHARS - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_talk_is_not_memorable() {
        let detector = EpisodeDetector;
        assert!(detector.detect(&["how's the weather?", "sunny today"]).is_none());
        assert!(detector.detect::<&str>(&[]).is_none());
    }

    #[test]
    fn grief_is_an_emotional_moment() {
        let detected = EpisodeDetector
            .detect(&["My grandmother passed away last night."])
            .expect("memorable");
        assert_eq!(detected.episode_type, EpisodeType::EmotionalMoment);
        assert!(matches!(
            detected.sentiment,
            Sentiment::Negative | Sentiment::VeryNegative
        ));
        assert!(detected.title.contains("passed away"));
    }

    #[test]
    fn highest_base_importance_wins() {
        // Milestone (7.0) and confession (7.5) cues together.
        let detected = EpisodeDetector
            .detect(&["I never told anyone, but I got engaged."])
            .expect("memorable");
        assert_eq!(detected.episode_type, EpisodeType::Confession);
    }

    #[test]
    fn achievements_lean_positive() {
        let detected = EpisodeDetector
            .detect(&["I passed my driving test today"])
            .expect("memorable");
        assert_eq!(detected.episode_type, EpisodeType::Achievement);
        assert_ne!(detected.sentiment, Sentiment::Negative);
        assert_ne!(detected.sentiment, Sentiment::VeryNegative);
    }

    #[test]
    fn long_exchanges_are_truncated() {
        let long = format!("I got promoted! {}", "word ".repeat(200));
        let detected = EpisodeDetector.detect(&[long]).expect("memorable");
        assert_eq!(detected.summary.chars().count(), MAX_SUMMARY_CHARS);
    }
}
