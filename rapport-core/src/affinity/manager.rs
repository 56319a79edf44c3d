//! Affinity state machine — points in, relationship level out.
//!
//! Every update is a pure function of the previous [`AffinityState`]: a new
//! state is returned alongside an audit [`RelationshipEvent`]. Callers that
//! persist the result must guarantee a single writer per
//! (user, personality) pair.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AffinityState, InteractionType, LevelTable, MAX_POINTS, MIN_POINTS, RelationshipEvent};
use crate::config::AffinityConfig;
use crate::error::Result;

/// Result of applying one interaction to an [`AffinityState`].
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityUpdate {
    /// The replacement state.
    pub state: AffinityState,
    /// Audit record of the interaction.
    pub event: RelationshipEvent,
    /// Present when the interaction moved the relationship to another level.
    pub level_change: Option<LevelChange>,
}

/// A transition between relationship levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    /// Level before the interaction.
    pub from: String,
    /// Level after the interaction.
    pub to: String,
    /// Whether `to` sits later in the table than `from`.
    pub promoted: bool,
}

/// Where a relationship sits inside its current level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level name.
    pub current_level: String,
    /// Current point total.
    pub points: i32,
    /// Position within the current level's range (0.0 to 1.0).
    pub progress_in_level: f64,
    /// Points still needed to reach the next level (0 at the top tier).
    pub points_to_next_level: i32,
    /// The next level, if any.
    pub next_level: Option<String>,
}

impl LevelTable {
    /// Progress of `state` within its current level.
    ///
    /// Returns `None` when the state's level is not in this table.
    #[must_use]
    pub fn progress(&self, state: &AffinityState) -> Option<LevelProgress> {
        let band = self.get(&state.current_level)?;
        let range = band.range;
        let progress_in_level = if range.span() == 0 {
            1.0
        } else {
            (f64::from(state.affinity_points - range.min()) / f64::from(range.span()))
                .clamp(0.0, 1.0)
        };
        let next = self.next_after(&band.name);
        let points_to_next_level = next
            .map(|n| (n.range.min() - state.affinity_points).max(0))
            .unwrap_or(0);

        Some(LevelProgress {
            current_level: band.name.clone(),
            points: state.affinity_points,
            progress_in_level,
            points_to_next_level,
            next_level: next.map(|n| n.name.clone()),
        })
    }
}

/// Drives relationship state transitions against a level table.
#[derive(Debug, Clone)]
pub struct AffinityManager {
    table: LevelTable,
    long_message_threshold: usize,
    long_message_bonus: i32,
}

impl Default for AffinityManager {
    fn default() -> Self {
        Self::new(LevelTable::default())
    }
}

impl AffinityManager {
    /// Manager over `table` with the default long-message bonus (+1 above 100 chars).
    #[must_use]
    pub fn new(table: LevelTable) -> Self {
        let defaults = AffinityConfig::default();
        Self {
            table,
            long_message_threshold: defaults.long_message_threshold,
            long_message_bonus: defaults.long_message_bonus,
        }
    }

    /// Manager configured from the `[affinity]` section.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if the custom level table is malformed.
    pub fn from_config(config: &AffinityConfig) -> Result<Self> {
        Ok(Self {
            table: config.level_table()?,
            long_message_threshold: config.long_message_threshold,
            long_message_bonus: config.long_message_bonus,
        })
    }

    /// The level table this manager uses.
    #[must_use]
    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    /// State for a first contact: zero points, lowest level.
    #[must_use]
    pub fn initial_state(
        &self,
        user_id: impl Into<String>,
        personality_name: impl Into<String>,
    ) -> AffinityState {
        AffinityState::new(
            user_id,
            personality_name,
            self.table.determine_level(MIN_POINTS).name.clone(),
        )
    }

    /// Level name for a point total.
    #[must_use]
    pub fn determine_level(&self, points: i32) -> &str {
        &self.table.determine_level(points).name
    }

    /// Point delta for an interaction, including the long-message bonus.
    ///
    /// The bonus only applies when the base delta is non-negative.
    #[must_use]
    pub fn calculate_points_delta(
        &self,
        interaction_type: InteractionType,
        message_length: Option<usize>,
    ) -> i32 {
        let base = interaction_type.base_delta();
        let long = message_length.is_some_and(|len| len > self.long_message_threshold);
        if base >= 0 && long {
            base + self.long_message_bonus
        } else {
            base
        }
    }

    /// Apply a raw point delta.
    #[must_use]
    pub fn update(&self, state: &AffinityState, points_delta: i32) -> AffinityUpdate {
        self.apply(
            state,
            points_delta,
            InteractionType::from_delta(points_delta),
            "points adjustment",
        )
    }

    /// Classify-and-apply: compute the delta for `interaction_type` and apply it.
    #[must_use]
    pub fn record_interaction(
        &self,
        state: &AffinityState,
        interaction_type: InteractionType,
        message_length: Option<usize>,
        reason: impl Into<String>,
    ) -> AffinityUpdate {
        let delta = self.calculate_points_delta(interaction_type, message_length);
        self.apply(state, delta, interaction_type, reason)
    }

    /// Progress of `state` within its level; `None` if the level is unknown.
    #[must_use]
    pub fn get_level_progress(&self, state: &AffinityState) -> Option<LevelProgress> {
        self.table.progress(state)
    }

    fn apply(
        &self,
        state: &AffinityState,
        points_delta: i32,
        interaction_type: InteractionType,
        reason: impl Into<String>,
    ) -> AffinityUpdate {
        let now = Utc::now();
        let new_points = state
            .affinity_points
            .saturating_add(points_delta)
            .clamp(MIN_POINTS, MAX_POINTS);
        let new_level = self.table.determine_level(new_points).name.clone();

        let mut next = state.clone();
        next.affinity_points = new_points;
        next.total_messages += 1;
        match points_delta {
            d if d > 0 => next.positive_interactions += 1,
            d if d < 0 => next.negative_interactions += 1,
            _ => next.neutral_interactions += 1,
        }
        next.last_interaction = now;

        let level_change = (new_level != state.current_level).then(|| {
            let before = self.table.position(&state.current_level);
            let after = self.table.position(&new_level);
            let promoted = match (before, after) {
                (Some(b), Some(a)) => a > b,
                _ => new_points > state.affinity_points,
            };
            LevelChange {
                from: state.current_level.clone(),
                to: new_level.clone(),
                promoted,
            }
        });
        next.current_level = new_level;

        if let Some(change) = &level_change {
            info!(
                user_id = %state.user_id,
                personality = %state.personality_name,
                from = %change.from,
                to = %change.to,
                points = new_points,
                "Relationship level changed"
            );
        } else {
            debug!(
                user_id = %state.user_id,
                personality = %state.personality_name,
                delta = points_delta,
                points = new_points,
                "Affinity updated"
            );
        }

        let event = RelationshipEvent {
            user_id: state.user_id.clone(),
            personality_name: state.personality_name.clone(),
            interaction_type,
            points_delta,
            reason: reason.into(),
            points_after: new_points,
            level_after: next.current_level.clone(),
            timestamp: now,
        };

        AffinityUpdate {
            state: next,
            event,
            level_change,
        }
    }
}
