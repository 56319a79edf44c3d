//! Episode creation, importance scoring and the storage gate.

use tracing::debug;

use super::decay::DEFAULT_DECAY_RATE;
use super::detector::EpisodeDetector;
use super::{Episode, EpisodeType, MAX_IMPORTANCE, Sentiment};
use crate::config::{EpisodeConfig, FeatureFlags};
use crate::error::Result;
use crate::types::Timestamp;

/// Default importance below which an episode is not stored.
pub const DEFAULT_STORAGE_THRESHOLD: f64 = 5.0;

/// Importance with the default tunables: base × sentiment multiplier, plus
/// 0.5 when the exchange had more than three messages, clamped to `[0, 10]`.
#[must_use]
pub fn calculate_importance(
    episode_type: EpisodeType,
    sentiment: Sentiment,
    message_count: usize,
) -> f64 {
    EpisodicManager::default().calculate_importance(episode_type, sentiment, message_count)
}

/// Whether an episode of this importance is worth storing.
#[must_use]
pub fn should_store_episode(importance: f64, threshold: f64) -> bool {
    importance >= threshold
}

/// Creates and scores episodes.
#[derive(Debug, Clone)]
pub struct EpisodicManager {
    storage_threshold: f64,
    decay_rate: f64,
    long_exchange_messages: usize,
    long_exchange_bonus: f64,
    detector: EpisodeDetector,
}

impl Default for EpisodicManager {
    fn default() -> Self {
        Self::from_config(&EpisodeConfig::default())
    }
}

impl EpisodicManager {
    /// Manager configured from the `[episodes]` section.
    #[must_use]
    pub fn from_config(config: &EpisodeConfig) -> Self {
        Self {
            storage_threshold: config.storage_threshold,
            decay_rate: if config.decay_rate.is_finite() {
                config.decay_rate.max(0.0)
            } else {
                DEFAULT_DECAY_RATE
            },
            long_exchange_messages: config.long_exchange_messages,
            long_exchange_bonus: config.long_exchange_bonus,
            detector: EpisodeDetector,
        }
    }

    /// Importance below which episodes are dropped.
    #[must_use]
    pub fn storage_threshold(&self) -> f64 {
        self.storage_threshold
    }

    /// Score a moment on `[0, 10]`.
    #[must_use]
    pub fn calculate_importance(
        &self,
        episode_type: EpisodeType,
        sentiment: Sentiment,
        message_count: usize,
    ) -> f64 {
        let mut importance = episode_type.base_importance() * sentiment.multiplier();
        if message_count > self.long_exchange_messages {
            importance += self.long_exchange_bonus;
        }
        if importance.is_nan() {
            return 0.0;
        }
        importance.clamp(0.0, MAX_IMPORTANCE)
    }

    /// Whether `importance` clears this manager's threshold.
    #[must_use]
    pub fn should_store_episode(&self, importance: f64) -> bool {
        should_store_episode(importance, self.storage_threshold)
    }

    /// Build a scored episode.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if `user_id` is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn create_episode(
        &self,
        user_id: &str,
        episode_type: EpisodeType,
        title: &str,
        summary: &str,
        sentiment: Sentiment,
        session_id: Option<&str>,
        context_messages: Vec<String>,
        tags: Vec<String>,
    ) -> Result<Episode> {
        let importance = self.calculate_importance(episode_type, sentiment, context_messages.len());
        Ok(
            Episode::new(user_id, episode_type, title, summary, sentiment, importance)?
                .with_session(session_id)
                .with_context(context_messages)
                .with_tags(tags),
        )
    }

    /// Recompute an episode's decay for `days_passed` at the configured rate.
    pub fn update_decay(&self, episode: &mut Episode, days_passed: f64) {
        episode.update_decay_with_rate(days_passed, self.decay_rate);
    }

    /// Recompute an episode's decay from its age at `now`.
    pub fn refresh_decay(&self, episode: &mut Episode, now: Timestamp) {
        episode.decay_from(now, self.decay_rate);
    }

    /// Detect, score and gate an exchange in one step.
    ///
    /// Returns `Ok(None)` when episodic memory is disabled, nothing memorable
    /// happened, or the moment scored below the storage threshold.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if `user_id` is empty.
    pub fn process_exchange<S: AsRef<str>>(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        messages: &[S],
        features: &FeatureFlags,
    ) -> Result<Option<Episode>> {
        if !features.episodic_memory {
            return Ok(None);
        }
        let Some(detected) = self.detector.detect(messages) else {
            return Ok(None);
        };

        let importance =
            self.calculate_importance(detected.episode_type, detected.sentiment, messages.len());
        if !self.should_store_episode(importance) {
            debug!(
                user_id,
                episode_type = %detected.episode_type,
                importance,
                threshold = self.storage_threshold,
                "Episode below storage threshold"
            );
            return Ok(None);
        }

        let context = messages.iter().map(|m| m.as_ref().to_string()).collect();
        let episode = self.create_episode(
            user_id,
            detected.episode_type,
            &detected.title,
            &detected.summary,
            detected.sentiment,
            session_id,
            context,
            detected.cues,
        )?;
        debug!(
            user_id,
            episode_type = %episode.episode_type,
            importance = episode.importance(),
            "Recorded episode"
        );
        Ok(Some(episode))
    }
}
