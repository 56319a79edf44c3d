//! Episode importance classification and ranking.

use ordered_float::OrderedFloat;

use super::Episode;
use crate::types::{ClassificationResult, ImportanceLevel, ItemType};

/// Map an episode's current importance onto the shared five-tier scale.
///
/// Confidence is the episode's current temporal decay: fresher memories are
/// classified with more certainty.
#[must_use]
pub fn classify_episode(episode: &Episode) -> ClassificationResult {
    let current = episode.get_current_importance();
    let importance_level = match current {
        c if c >= 9.0 => ImportanceLevel::Critical,
        c if c >= 7.0 => ImportanceLevel::High,
        c if c >= 4.0 => ImportanceLevel::Medium,
        c if c >= 2.0 => ImportanceLevel::Low,
        _ => ImportanceLevel::Trivial,
    };
    ClassificationResult {
        item_type: ItemType::Episode,
        primary_category: episode.episode_type.as_str().to_string(),
        importance_level,
        confidence: episode.temporal_decay(),
    }
}

/// The `n` most important episodes by current importance, most recent first
/// on ties.
#[must_use]
pub fn get_top_n_episodes(episodes: &[Episode], n: usize) -> Vec<&Episode> {
    let mut ranked: Vec<&Episode> = episodes.iter().collect();
    ranked.sort_by(|a, b| {
        OrderedFloat(b.get_current_importance())
            .cmp(&OrderedFloat(a.get_current_importance()))
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    ranked.truncate(n);
    ranked
}
