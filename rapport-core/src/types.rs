//! Core type definitions shared across the rapport subsystems.
//!
//! All types are serializable so they can cross the storage boundary as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a stored memory item (fact or episode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random memory ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Wall-clock timestamp used for facts, episodes and relationship events.
pub type Timestamp = DateTime<Utc>;

/// Fractional days elapsed from `earlier` to `later`, never negative.
#[must_use]
pub fn days_between(earlier: Timestamp, later: Timestamp) -> f64 {
    const SECONDS_PER_DAY: f64 = 86_400.0;
    let seconds = (later - earlier).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Which kind of memory item a [`ClassificationResult`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A categorized fact.
    Fact,
    /// A memorable conversational moment.
    Episode,
}

/// Five-tier importance scale shared by facts and episodes.
///
/// Variants are ordered from least to most important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceLevel {
    /// Not worth surfacing.
    Trivial,
    /// Background detail.
    Low,
    /// Worth remembering.
    Medium,
    /// Shapes future conversations.
    High,
    /// Must never be forgotten.
    Critical,
}

impl ImportanceLevel {
    /// The next tier up, saturating at [`ImportanceLevel::Critical`].
    #[must_use]
    pub fn promoted(self) -> Self {
        match self {
            Self::Trivial => Self::Low,
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trivial => "trivial",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ImportanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived, non-persisted view of how important a memory item is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Fact or episode.
    pub item_type: ItemType,
    /// Fact category or episode type name.
    pub primary_category: String,
    /// Tier on the shared five-level scale.
    pub importance_level: ImportanceLevel,
    /// How certain the classification is (0.0 to 1.0).
    pub confidence: f64,
}
