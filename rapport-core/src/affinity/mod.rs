//! Affinity — the relationship state between one user and one personality.
//!
//! Interaction points accumulate in `[0, 100]` and are bucketed into named
//! relationship levels by a [`LevelTable`]. The [`AffinityManager`] drives the
//! state machine; this module holds the value types it moves between.

pub mod manager;
pub mod scoring;

pub use manager::{AffinityManager, AffinityUpdate, LevelChange, LevelProgress};
pub use scoring::score_interaction;

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{RapportError, Result};
use crate::types::Timestamp;

/// Lowest possible affinity point total.
pub const MIN_POINTS: i32 = 0;
/// Highest possible affinity point total.
pub const MAX_POINTS: i32 = 100;

// ---------------------------------------------------------------------------
// AffinityRange
// ---------------------------------------------------------------------------

/// Inclusive point interval owned by one relationship level.
///
/// Serialized as a two-element array `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i32, i32)", into = "(i32, i32)")]
pub struct AffinityRange {
    min_points: i32,
    max_points: i32,
}

impl AffinityRange {
    /// Create a range, rejecting bounds outside `[0, 100]` or `min > max`.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` for any malformed bound.
    pub fn new(min_points: i32, max_points: i32) -> Result<Self> {
        if min_points < MIN_POINTS {
            return Err(RapportError::validation(
                "affinity_range",
                format!("min {min_points} is below {MIN_POINTS}"),
            ));
        }
        if max_points > MAX_POINTS {
            return Err(RapportError::validation(
                "affinity_range",
                format!("max {max_points} is above {MAX_POINTS}"),
            ));
        }
        if min_points > max_points {
            return Err(RapportError::validation(
                "affinity_range",
                format!("min {min_points} is greater than max {max_points}"),
            ));
        }
        Ok(Self {
            min_points,
            max_points,
        })
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub fn min(self) -> i32 {
        self.min_points
    }

    /// Upper bound (inclusive).
    #[must_use]
    pub fn max(self) -> i32 {
        self.max_points
    }

    /// Whether `points` falls inside this range.
    #[must_use]
    pub fn contains(self, points: i32) -> bool {
        self.min_points <= points && points <= self.max_points
    }

    /// Width of the range in points.
    #[must_use]
    pub fn span(self) -> i32 {
        self.max_points - self.min_points
    }
}

impl TryFrom<(i32, i32)> for AffinityRange {
    type Error = RapportError;

    fn try_from((min, max): (i32, i32)) -> Result<Self> {
        Self::new(min, max)
    }
}

impl From<AffinityRange> for (i32, i32) {
    fn from(range: AffinityRange) -> Self {
        (range.min_points, range.max_points)
    }
}

impl fmt::Display for AffinityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min_points, self.max_points)
    }
}

// ---------------------------------------------------------------------------
// Level table
// ---------------------------------------------------------------------------

/// One named relationship level and the points it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelBand {
    /// Level name (e.g. "friend").
    pub name: String,
    /// Points owned by this level.
    pub range: AffinityRange,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl LevelBand {
    fn builtin(name: &str, min: i32, max: i32, description: &str) -> Self {
        Self {
            name: name.to_string(),
            range: AffinityRange {
                min_points: min,
                max_points: max,
            },
            description: description.to_string(),
        }
    }
}

/// Ordered, non-empty list of relationship levels.
///
/// Ranges need not be contiguous. Lookups that land in a gap fall back to
/// the nearest lower level (see [`LevelTable::determine_level`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LevelBand>", into = "Vec<LevelBand>")]
pub struct LevelTable {
    bands: Vec<LevelBand>,
}

impl LevelTable {
    /// Build a table, rejecting an empty list or duplicate level names.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if the table is unusable.
    pub fn new(bands: Vec<LevelBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(RapportError::validation(
                "relationship_levels",
                "level table must contain at least one level",
            ));
        }
        for (i, band) in bands.iter().enumerate() {
            if band.name.trim().is_empty() {
                return Err(RapportError::validation(
                    "relationship_levels",
                    format!("level #{i} has an empty name"),
                ));
            }
            if bands[..i].iter().any(|other| other.name == band.name) {
                return Err(RapportError::validation(
                    "relationship_levels",
                    format!("duplicate level name '{}'", band.name),
                ));
            }
        }
        Ok(Self { bands })
    }

    /// Levels in table order.
    #[must_use]
    pub fn bands(&self) -> &[LevelBand] {
        &self.bands
    }

    /// Number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Look up a level by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LevelBand> {
        self.bands.iter().find(|band| band.name == name)
    }

    /// First level (in table order) whose range contains `points`.
    #[must_use]
    pub fn band_containing(&self, points: i32) -> Option<&LevelBand> {
        self.bands.iter().find(|band| band.range.contains(points))
    }

    /// Resolve the level for `points`.
    ///
    /// Containing level first; otherwise the level whose range ends closest
    /// below `points`; otherwise (points below every level) the lowest level.
    #[must_use]
    pub fn determine_level(&self, points: i32) -> &LevelBand {
        if let Some(band) = self.band_containing(points) {
            return band;
        }
        let nearest_lower = self
            .bands
            .iter()
            .filter(|band| band.range.max() < points)
            .max_by_key(|band| band.range.max());
        nearest_lower.unwrap_or_else(|| self.lowest())
    }

    /// The level with the smallest lower bound (first one on ties).
    #[must_use]
    pub fn lowest(&self) -> &LevelBand {
        let mut lowest = &self.bands[0];
        for band in &self.bands[1..] {
            if band.range.min() < lowest.range.min() {
                lowest = band;
            }
        }
        lowest
    }

    /// The level following `name` in table order.
    #[must_use]
    pub fn next_after(&self, name: &str) -> Option<&LevelBand> {
        let idx = self.position(name)?;
        self.bands.get(idx + 1)
    }

    /// Index of `name` in table order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.bands.iter().position(|band| band.name == name)
    }

    /// Build a table from a personality's hierarchical configuration so the
    /// manager and the compiler agree on level boundaries.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if the list is empty or has duplicate names.
    pub fn from_relationship_levels(
        levels: &[crate::personality::RelationshipLevelConfig],
    ) -> Result<Self> {
        Self::new(
            levels
                .iter()
                .map(|level| LevelBand {
                    name: level.name.clone(),
                    range: level.affinity_range,
                    description: level.description.clone(),
                })
                .collect(),
        )
    }
}

impl Default for LevelTable {
    /// Five contiguous tiers covering `[0, 100]`.
    fn default() -> Self {
        Self {
            bands: vec![
                LevelBand::builtin("stranger", 0, 20, "Just met; polite and reserved"),
                LevelBand::builtin("acquaintance", 21, 40, "Familiar; friendly but measured"),
                LevelBand::builtin("friend", 41, 60, "Comfortable; open and warm"),
                LevelBand::builtin("close_friend", 61, 80, "Trusted; candid and supportive"),
                LevelBand::builtin("soulmate", 81, 100, "Deep bond; intimate and devoted"),
            ],
        }
    }
}

impl TryFrom<Vec<LevelBand>> for LevelTable {
    type Error = RapportError;

    fn try_from(bands: Vec<LevelBand>) -> Result<Self> {
        Self::new(bands)
    }
}

impl From<LevelTable> for Vec<LevelBand> {
    fn from(table: LevelTable) -> Self {
        table.bands
    }
}

// ---------------------------------------------------------------------------
// Interaction classification
// ---------------------------------------------------------------------------

/// Qualitative label for one interaction, used to derive its point delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// Strong warmth, gratitude or affection.
    VeryPositive,
    /// Friendly.
    Positive,
    /// Ordinary exchange.
    Neutral,
    /// Irritated or dismissive.
    Negative,
    /// Hostile or insulting.
    VeryNegative,
}

impl InteractionType {
    /// Base point delta before any length bonus.
    #[must_use]
    pub fn base_delta(self) -> i32 {
        match self {
            Self::VeryPositive => 5,
            Self::Positive => 2,
            Self::Neutral => 1,
            Self::Negative => -2,
            Self::VeryNegative => -5,
        }
    }

    /// Best label for a raw delta that did not come from a classified interaction.
    #[must_use]
    pub fn from_delta(delta: i32) -> Self {
        match delta {
            d if d >= 5 => Self::VeryPositive,
            d if d > 0 => Self::Positive,
            0 => Self::Neutral,
            d if d > -5 => Self::Negative,
            _ => Self::VeryNegative,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryPositive => "very_positive",
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::VeryNegative => "very_negative",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AffinityState
// ---------------------------------------------------------------------------

/// Relationship state for one (user, personality) pair.
///
/// Created on first contact and replaced (never mutated in place) by
/// [`AffinityManager::update`]. Deserialization goes through the same
/// validation as [`AffinityState::with_points`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AffinityStateRecord")]
pub struct AffinityState {
    /// Who the relationship is with.
    pub user_id: String,
    /// Which personality holds the relationship.
    pub personality_name: String,
    /// Accumulated points in `[0, 100]`.
    pub affinity_points: i32,
    /// Name of the current relationship level.
    pub current_level: String,
    /// Total interactions recorded.
    pub total_messages: u64,
    /// Interactions with a positive delta.
    pub positive_interactions: u64,
    /// Interactions with a negative delta.
    pub negative_interactions: u64,
    /// Interactions with a zero delta.
    pub neutral_interactions: u64,
    /// When the relationship started.
    pub created_at: Timestamp,
    /// When the last interaction was recorded.
    pub last_interaction: Timestamp,
}

/// Unvalidated wire form of [`AffinityState`].
#[derive(Debug, Clone, Deserialize)]
struct AffinityStateRecord {
    user_id: String,
    personality_name: String,
    affinity_points: i32,
    current_level: String,
    #[serde(default)]
    total_messages: u64,
    #[serde(default)]
    positive_interactions: u64,
    #[serde(default)]
    negative_interactions: u64,
    #[serde(default)]
    neutral_interactions: u64,
    #[serde(default = "Utc::now")]
    created_at: Timestamp,
    #[serde(default = "Utc::now")]
    last_interaction: Timestamp,
}

impl TryFrom<AffinityStateRecord> for AffinityState {
    type Error = RapportError;

    fn try_from(record: AffinityStateRecord) -> Result<Self> {
        let mut state = Self::with_points(
            record.user_id,
            record.personality_name,
            record.affinity_points,
            record.current_level,
        )?;
        state.total_messages = record.total_messages;
        state.positive_interactions = record.positive_interactions;
        state.negative_interactions = record.negative_interactions;
        state.neutral_interactions = record.neutral_interactions;
        state.created_at = record.created_at;
        state.last_interaction = record.last_interaction;
        Ok(state)
    }
}

impl AffinityState {
    /// Fresh state at zero points on the given level.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        personality_name: impl Into<String>,
        initial_level: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            personality_name: personality_name.into(),
            affinity_points: MIN_POINTS,
            current_level: initial_level.into(),
            total_messages: 0,
            positive_interactions: 0,
            negative_interactions: 0,
            neutral_interactions: 0,
            created_at: now,
            last_interaction: now,
        }
    }

    /// State with an explicit point total and level, e.g. when restoring.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if `points` is outside `[0, 100]`,
    /// an identifier is empty or the level name is empty.
    pub fn with_points(
        user_id: impl Into<String>,
        personality_name: impl Into<String>,
        points: i32,
        level: impl Into<String>,
    ) -> Result<Self> {
        if !(MIN_POINTS..=MAX_POINTS).contains(&points) {
            return Err(RapportError::validation(
                "affinity_points",
                format!("{points} is outside [{MIN_POINTS}, {MAX_POINTS}]"),
            ));
        }
        let state = Self::new(user_id, personality_name, level);
        if state.user_id.is_empty() {
            return Err(RapportError::validation("user_id", "must not be empty"));
        }
        if state.personality_name.is_empty() {
            return Err(RapportError::validation("personality_name", "must not be empty"));
        }
        if state.current_level.is_empty() {
            return Err(RapportError::validation("current_level", "must not be empty"));
        }
        Ok(Self {
            affinity_points: points,
            ..state
        })
    }

    /// Share of recorded interactions that were positive (0.0 when none).
    #[must_use]
    pub fn positivity_ratio(&self) -> f64 {
        if self.total_messages == 0 {
            0.0
        } else {
            self.positive_interactions as f64 / self.total_messages as f64
        }
    }
}

// ---------------------------------------------------------------------------
// RelationshipEvent
// ---------------------------------------------------------------------------

/// Immutable audit record of one interaction's effect on a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEvent {
    /// Who the relationship is with.
    pub user_id: String,
    /// Which personality holds the relationship.
    pub personality_name: String,
    /// How the interaction was classified.
    pub interaction_type: InteractionType,
    /// Requested point change (before clamping).
    pub points_delta: i32,
    /// Why the points changed.
    pub reason: String,
    /// Point total after the interaction.
    pub points_after: i32,
    /// Level after the interaction.
    pub level_after: String,
    /// When the interaction happened.
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_malformed_bounds() {
        assert!(AffinityRange::new(10, 5).is_err());
        assert!(AffinityRange::new(-1, 5).is_err());
        assert!(AffinityRange::new(0, 101).is_err());
        assert!(AffinityRange::new(30, 30).is_ok());
    }

    #[test]
    fn range_contains_is_inclusive() {
        let range = AffinityRange::new(41, 60).expect("valid");
        assert!(range.contains(41));
        assert!(range.contains(60));
        assert!(!range.contains(40));
        assert!(!range.contains(61));
    }

    #[test]
    fn range_deserializes_from_array_with_validation() {
        let ok: AffinityRange = serde_json::from_str("[21, 40]").expect("valid range");
        assert_eq!((ok.min(), ok.max()), (21, 40));
        assert!(serde_json::from_str::<AffinityRange>("[40, 21]").is_err());
        assert_eq!(serde_json::to_string(&ok).expect("serializes"), "[21,40]");
    }

    #[test]
    fn default_table_levels() {
        let table = LevelTable::default();
        assert_eq!(table.determine_level(10).name, "stranger");
        assert_eq!(table.determine_level(21).name, "acquaintance");
        assert_eq!(table.determine_level(50).name, "friend");
        assert_eq!(table.determine_level(95).name, "soulmate");
        assert_eq!(table.determine_level(100).name, "soulmate");
    }

    #[test]
    fn gap_falls_back_to_nearest_lower_level() {
        let table = LevelTable::new(vec![
            LevelBand {
                name: "low".into(),
                range: AffinityRange::new(10, 20).expect("valid"),
                description: String::new(),
            },
            LevelBand {
                name: "high".into(),
                range: AffinityRange::new(60, 100).expect("valid"),
                description: String::new(),
            },
        ])
        .expect("valid table");

        assert!(table.band_containing(40).is_none());
        assert_eq!(table.determine_level(40).name, "low");
        // Below every band → lowest band.
        assert_eq!(table.determine_level(3).name, "low");
        assert_eq!(table.determine_level(75).name, "high");
    }

    #[test]
    fn table_rejects_empty_and_duplicates() {
        assert!(LevelTable::new(vec![]).is_err());
        let band = LevelBand {
            name: "same".into(),
            range: AffinityRange::new(0, 100).expect("valid"),
            description: String::new(),
        };
        assert!(LevelTable::new(vec![band.clone(), band]).is_err());
    }

    #[test]
    fn state_validation_rejects_out_of_range_points() {
        assert!(AffinityState::with_points("u1", "aria", 101, "soulmate").is_err());
        assert!(AffinityState::with_points("u1", "aria", -1, "stranger").is_err());
        assert!(AffinityState::with_points("", "aria", 5, "stranger").is_err());
        let state = AffinityState::with_points("u1", "aria", 40, "acquaintance").expect("valid");
        assert_eq!(state.affinity_points, 40);
    }

    #[test]
    fn state_deserialization_is_validated() {
        let json = r#"{"user_id":"u1","personality_name":"aria","affinity_points":250,"current_level":"soulmate"}"#;
        assert!(serde_json::from_str::<AffinityState>(json).is_err());

        let json = r#"{"user_id":"u1","personality_name":"aria","affinity_points":25,"current_level":"acquaintance","total_messages":4}"#;
        let state: AffinityState = serde_json::from_str(json).expect("valid state");
        assert_eq!(state.total_messages, 4);
    }

    #[test]
    fn interaction_deltas() {
        assert_eq!(InteractionType::VeryPositive.base_delta(), 5);
        assert_eq!(InteractionType::Neutral.base_delta(), 1);
        assert_eq!(InteractionType::VeryNegative.base_delta(), -5);
        assert_eq!(InteractionType::from_delta(0), InteractionType::Neutral);
        assert_eq!(InteractionType::from_delta(-3), InteractionType::Negative);
    }
}
