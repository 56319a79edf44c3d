//! Episodes — "Moments we shared".
//!
//! An episode is a memorable conversational moment (a confession, a
//! milestone, a conflict) with an importance score in `[0, 10]` and a
//! temporal decay factor in `(0, 1]`. Ranking always uses
//! `importance × temporal_decay`; the stored importance never changes.

pub mod classifier;
pub mod decay;
pub mod detector;
pub mod manager;

pub use classifier::{classify_episode, get_top_n_episodes};
pub use decay::temporal_decay;
pub use detector::{DetectedEpisode, EpisodeDetector};
pub use manager::{EpisodicManager, calculate_importance, should_store_episode};

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{RapportError, Result};
use crate::types::{MemoryId, Timestamp, days_between};

/// Upper bound of the importance scale.
pub const MAX_IMPORTANCE: f64 = 10.0;

// ---------------------------------------------------------------------------
// EpisodeType / Sentiment
// ---------------------------------------------------------------------------

/// What kind of moment an episode records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EpisodeType {
    /// Strong feelings shared.
    EmotionalMoment,
    /// Something the user has not told anyone.
    Confession,
    /// A relationship or life milestone.
    Milestone,
    /// Something the user accomplished.
    Achievement,
    /// Warmth or gratitude between user and companion.
    Bonding,
    /// Disagreement or hurt.
    Conflict,
    /// Everyday exchange.
    Routine,
    /// Anything else.
    Other,
}

impl EpisodeType {
    /// Every type, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::EmotionalMoment,
        Self::Confession,
        Self::Milestone,
        Self::Achievement,
        Self::Bonding,
        Self::Conflict,
        Self::Routine,
        Self::Other,
    ];

    /// Importance before the sentiment multiplier.
    #[must_use]
    pub fn base_importance(self) -> f64 {
        match self {
            Self::EmotionalMoment => 8.0,
            Self::Confession => 7.5,
            Self::Milestone | Self::Achievement => 7.0,
            Self::Bonding => 6.5,
            Self::Conflict => 6.0,
            Self::Routine => 2.0,
            Self::Other => 5.0,
        }
    }

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmotionalMoment => "emotional_moment",
            Self::Confession => "confession",
            Self::Milestone => "milestone",
            Self::Achievement => "achievement",
            Self::Bonding => "bonding",
            Self::Conflict => "conflict",
            Self::Routine => "routine",
            Self::Other => "other",
        }
    }

    /// Lenient lookup: unknown names map to [`EpisodeType::Other`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for EpisodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EpisodeType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<EpisodeType> for String {
    fn from(t: EpisodeType) -> Self {
        t.as_str().to_string()
    }
}

/// Emotional colour of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    /// Grief, anger, fear.
    VeryNegative,
    /// Sadness, frustration.
    Negative,
    /// No clear colour.
    Neutral,
    /// Contentment.
    Positive,
    /// Joy, excitement.
    VeryPositive,
}

impl Sentiment {
    /// Every sentiment, from most negative to most positive.
    pub const ALL: [Self; 5] = [
        Self::VeryNegative,
        Self::Negative,
        Self::Neutral,
        Self::Positive,
        Self::VeryPositive,
    ];

    /// Factor applied to the base importance. Strong negative moments weigh most.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::VeryNegative => 1.3,
            Self::VeryPositive => 1.2,
            Self::Positive | Self::Negative => 1.1,
            Self::Neutral => 1.0,
        }
    }

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryNegative => "very_negative",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
            Self::VeryPositive => "very_positive",
        }
    }

    /// Lenient lookup: unknown names map to [`Sentiment::Neutral`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == normalized)
            .unwrap_or(Self::Neutral)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Sentiment {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Sentiment> for String {
    fn from(s: Sentiment) -> Self {
        s.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

/// A recorded memorable moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EpisodeRecord")]
pub struct Episode {
    /// Unique identifier.
    pub id: MemoryId,
    /// Whose moment this is.
    pub user_id: String,
    /// Conversation session the moment happened in.
    pub session_id: Option<String>,
    /// Kind of moment.
    pub episode_type: EpisodeType,
    /// Short headline.
    pub title: String,
    /// What happened.
    pub summary: String,
    /// Emotional colour.
    pub sentiment: Sentiment,
    /// Importance at creation, in `[0, 10]`. Never rewritten by decay.
    importance: f64,
    /// Current decay factor in `(0, 1]`.
    temporal_decay: f64,
    /// Messages that made up the exchange.
    pub context_messages: Vec<String>,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// When the moment happened.
    pub timestamp: Timestamp,
}

/// Unvalidated wire form of [`Episode`].
#[derive(Debug, Deserialize)]
struct EpisodeRecord {
    #[serde(default)]
    id: MemoryId,
    user_id: String,
    #[serde(default)]
    session_id: Option<String>,
    episode_type: EpisodeType,
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default = "neutral")]
    sentiment: Sentiment,
    importance: f64,
    #[serde(default = "fresh")]
    temporal_decay: f64,
    #[serde(default)]
    context_messages: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "Utc::now")]
    timestamp: Timestamp,
}

fn neutral() -> Sentiment {
    Sentiment::Neutral
}
fn fresh() -> f64 {
    1.0
}

impl TryFrom<EpisodeRecord> for Episode {
    type Error = RapportError;

    fn try_from(record: EpisodeRecord) -> Result<Self> {
        let mut episode = Self::new(
            record.user_id,
            record.episode_type,
            record.title,
            record.summary,
            record.sentiment,
            record.importance,
        )?
        .with_decay(record.temporal_decay)?;
        episode.id = record.id;
        episode.session_id = record.session_id;
        episode.context_messages = record.context_messages;
        episode.tags = record.tags;
        episode.timestamp = record.timestamp;
        Ok(episode)
    }
}

fn check_importance(importance: f64) -> Result<()> {
    if (0.0..=MAX_IMPORTANCE).contains(&importance) {
        Ok(())
    } else {
        Err(RapportError::validation(
            "importance",
            format!("{importance} is outside [0, {MAX_IMPORTANCE}]"),
        ))
    }
}

fn check_decay(decay: f64) -> Result<()> {
    if decay > 0.0 && decay <= 1.0 {
        Ok(())
    } else {
        Err(RapportError::validation(
            "temporal_decay",
            format!("{decay} is outside (0, 1]"),
        ))
    }
}

impl Episode {
    /// Create a fresh episode (decay 1.0, timestamp now).
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if `importance` is outside `[0, 10]`
    /// or `user_id` is empty.
    pub fn new(
        user_id: impl Into<String>,
        episode_type: EpisodeType,
        title: impl Into<String>,
        summary: impl Into<String>,
        sentiment: Sentiment,
        importance: f64,
    ) -> Result<Self> {
        check_importance(importance)?;
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(RapportError::validation("user_id", "must not be empty"));
        }
        Ok(Self {
            id: MemoryId::new(),
            user_id,
            session_id: None,
            episode_type,
            title: title.into(),
            summary: summary.into(),
            sentiment,
            importance,
            temporal_decay: 1.0,
            context_messages: Vec::new(),
            tags: Vec::new(),
            timestamp: Utc::now(),
        })
    }

    /// Set an explicit decay factor.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if `decay` is outside `(0, 1]`.
    pub fn with_decay(mut self, decay: f64) -> Result<Self> {
        check_decay(decay)?;
        self.temporal_decay = decay;
        Ok(self)
    }

    /// Attach the session the moment happened in.
    #[must_use]
    pub fn with_session(mut self, session_id: Option<&str>) -> Self {
        self.session_id = session_id.map(str::to_string);
        self
    }

    /// Attach the exchange's messages.
    #[must_use]
    pub fn with_context(mut self, messages: Vec<String>) -> Self {
        self.context_messages = messages;
        self
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Override the creation time.
    #[must_use]
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Importance at creation.
    #[must_use]
    pub fn importance(&self) -> f64 {
        self.importance
    }

    /// Current decay factor.
    #[must_use]
    pub fn temporal_decay(&self) -> f64 {
        self.temporal_decay
    }

    /// `importance × temporal_decay`, the value used for ranking.
    #[must_use]
    pub fn get_current_importance(&self) -> f64 {
        self.importance * self.temporal_decay
    }

    /// Recompute the decay factor for `days_passed` at the default rate.
    /// Negative values count as zero.
    pub fn update_decay(&mut self, days_passed: f64) {
        self.update_decay_with_rate(days_passed, decay::DEFAULT_DECAY_RATE);
    }

    /// Recompute the decay factor for `days_passed` at `rate`.
    pub fn update_decay_with_rate(&mut self, days_passed: f64, rate: f64) {
        self.temporal_decay = temporal_decay(days_passed, rate);
    }

    /// Recompute the decay factor from the episode's age at `now`.
    pub fn decay_from(&mut self, now: Timestamp, rate: f64) {
        self.update_decay_with_rate(days_between(self.timestamp, now), rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(importance: f64) -> Result<Episode> {
        Episode::new(
            "u1",
            EpisodeType::Confession,
            "Told me a secret",
            "",
            Sentiment::Negative,
            importance,
        )
    }

    #[test]
    fn importance_is_validated() {
        assert!(episode(10.5).is_err());
        assert!(episode(-0.1).is_err());
        assert!(episode(f64::NAN).is_err());
        assert!(episode(0.0).is_ok());
        assert!(episode(10.0).is_ok());
    }

    #[test]
    fn decay_is_validated() {
        let e = episode(5.0).expect("valid");
        assert!(e.clone().with_decay(0.0).is_err());
        assert!(e.clone().with_decay(1.01).is_err());
        assert!(e.with_decay(0.5).is_ok());
    }

    #[test]
    fn lenient_names() {
        assert_eq!(EpisodeType::from_name("Emotional Moment"), EpisodeType::EmotionalMoment);
        assert_eq!(EpisodeType::from_name("birthday_party"), EpisodeType::Other);
        assert_eq!(Sentiment::from_name("VERY_POSITIVE"), Sentiment::VeryPositive);
        assert_eq!(Sentiment::from_name("melancholy"), Sentiment::Neutral);
    }

    #[test]
    fn decay_never_rewrites_importance() {
        let mut e = episode(8.0).expect("valid");
        e.update_decay(30.0);
        assert!((e.importance() - 8.0).abs() < f64::EPSILON);
        assert!(e.get_current_importance() < 8.0);
        assert!(e.get_current_importance() > 0.0);
    }

    #[test]
    fn negative_days_count_as_zero() {
        let mut e = episode(8.0).expect("valid");
        e.update_decay(-5.0);
        assert!((e.temporal_decay() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decay_from_uses_age() {
        let now = Utc::now();
        let mut e = episode(8.0)
            .expect("valid")
            .at(now - chrono::Duration::days(10));
        e.decay_from(now, 0.1);
        let expected = 1.0 / (1.0 + 0.1 * 11.0_f64.ln());
        assert!((e.temporal_decay() - expected).abs() < 1e-6);
    }

    #[test]
    fn deserialization_is_validated() {
        let bad = r#"{"user_id":"u1","episode_type":"milestone","title":"t","importance":11}"#;
        assert!(serde_json::from_str::<Episode>(bad).is_err());
        let bad = r#"{"user_id":"u1","episode_type":"milestone","title":"t","importance":5,"temporal_decay":0}"#;
        assert!(serde_json::from_str::<Episode>(bad).is_err());
        let ok = r#"{"user_id":"u1","episode_type":"anniversary","sentiment":"happy","title":"t","importance":5}"#;
        let e: Episode = serde_json::from_str(ok).expect("valid");
        assert_eq!(e.episode_type, EpisodeType::Other);
        assert_eq!(e.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn serialization_round_trips_private_fields() {
        let mut e = episode(6.0).expect("valid");
        e.update_decay(3.0);
        let json = serde_json::to_string(&e).expect("serialize");
        let back: Episode = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, e);
    }
}
