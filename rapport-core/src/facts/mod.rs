//! Facts — "What I know about you".
//!
//! Discrete, categorized, confidence-scored pieces of information learned
//! from user messages. A fact is identified by `(user_id, category, key)`;
//! a later fact with the same identity replaces the earlier one regardless
//! of confidence.

pub mod classifier;
pub mod extractor;
pub mod prompt;
pub mod rules;

pub use classifier::{FactClassifier, get_facts_by_category};
pub use extractor::{FactCandidate, FactExtractor, filter_by_confidence};

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{RapportError, Result};
use crate::types::{MemoryId, Timestamp};

// ---------------------------------------------------------------------------
// FactCategory
// ---------------------------------------------------------------------------

/// What a fact is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FactCategory {
    /// Name, age, birthday — core identity.
    PersonalInfo,
    /// Likes and dislikes.
    Preference,
    /// People and pets in the user's life.
    Relationship,
    /// Occupation and employer.
    Work,
    /// Where the user lives or comes from.
    Location,
    /// Pastimes.
    Hobby,
    /// Plans and aspirations.
    Goal,
    /// Health-related information.
    Health,
    /// Anything else.
    Other,
}

impl FactCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::PersonalInfo,
        Self::Preference,
        Self::Relationship,
        Self::Work,
        Self::Location,
        Self::Hobby,
        Self::Goal,
        Self::Health,
        Self::Other,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PersonalInfo => "personal_info",
            Self::Preference => "preference",
            Self::Relationship => "relationship",
            Self::Work => "work",
            Self::Location => "location",
            Self::Hobby => "hobby",
            Self::Goal => "goal",
            Self::Health => "health",
            Self::Other => "other",
        }
    }

    /// Strict lookup: `None` for names outside [`FactCategory::ALL`].
    #[must_use]
    pub fn parse_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|c| c.as_str() == normalized)
    }

    /// Lenient lookup: unknown names map to [`FactCategory::Other`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::parse_name(name).unwrap_or(Self::Other)
    }
}

impl fmt::Display for FactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FactCategory {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<FactCategory> for String {
    fn from(category: FactCategory) -> Self {
        category.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Fact
// ---------------------------------------------------------------------------

/// A single learned fact about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FactRecord")]
pub struct Fact {
    /// Unique identifier.
    pub id: MemoryId,
    /// Who the fact is about.
    pub user_id: String,
    /// What kind of fact this is.
    pub category: FactCategory,
    /// Identity within the category (e.g. "name", "likes_jazz").
    pub key: String,
    /// The fact's value in natural language.
    pub value: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Message the fact was extracted from.
    pub source_message_id: Option<String>,
    /// When the fact was learned.
    pub created_at: Timestamp,
}

/// Unvalidated wire form of [`Fact`].
#[derive(Debug, Deserialize)]
struct FactRecord {
    #[serde(default)]
    id: MemoryId,
    user_id: String,
    category: FactCategory,
    key: String,
    value: String,
    confidence: f64,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    source_message_id: Option<String>,
    #[serde(default = "Utc::now")]
    created_at: Timestamp,
}

impl TryFrom<FactRecord> for Fact {
    type Error = RapportError;

    fn try_from(record: FactRecord) -> Result<Self> {
        let mut fact = Self::new(
            record.user_id,
            record.category,
            record.key,
            record.value,
            record.confidence,
        )?;
        fact.id = record.id;
        fact.tags = record.tags;
        fact.source_message_id = record.source_message_id;
        fact.created_at = record.created_at;
        Ok(fact)
    }
}

impl Fact {
    /// Create a fact.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if `confidence` is outside `[0, 1]`
    /// or `user_id`/`key` is empty.
    pub fn new(
        user_id: impl Into<String>,
        category: FactCategory,
        key: impl Into<String>,
        value: impl Into<String>,
        confidence: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RapportError::validation(
                "confidence",
                format!("{confidence} is outside [0, 1]"),
            ));
        }
        let fact = Self {
            id: MemoryId::new(),
            user_id: user_id.into(),
            category,
            key: key.into(),
            value: value.into(),
            confidence,
            tags: Vec::new(),
            source_message_id: None,
            created_at: Utc::now(),
        };
        if fact.user_id.is_empty() {
            return Err(RapportError::validation("user_id", "must not be empty"));
        }
        if fact.key.trim().is_empty() {
            return Err(RapportError::validation("key", "must not be empty"));
        }
        Ok(fact)
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Record the source message.
    #[must_use]
    pub fn with_source(mut self, message_id: Option<&str>) -> Self {
        self.source_message_id = message_id.map(str::to_string);
        self
    }

    /// The `(user_id, category, key)` identity used for overwrite.
    #[must_use]
    pub fn identity(&self) -> FactKey {
        FactKey {
            user_id: self.user_id.clone(),
            category: self.category,
            key: self.key.clone(),
        }
    }
}

/// Identity of a fact: last write wins per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    /// Who the fact is about.
    pub user_id: String,
    /// Fact category.
    pub category: FactCategory,
    /// Key within the category.
    pub key: String,
}

// ---------------------------------------------------------------------------
// FactSet
// ---------------------------------------------------------------------------

/// In-memory collection of facts with last-write-wins semantics.
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    facts: HashMap<FactKey, Fact>,
}

impl FactSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the replaced fact.
    pub fn upsert(&mut self, fact: Fact) -> Option<Fact> {
        self.facts.insert(fact.identity(), fact)
    }

    /// Look up a fact by identity.
    #[must_use]
    pub fn get(&self, user_id: &str, category: FactCategory, key: &str) -> Option<&Fact> {
        self.facts.get(&FactKey {
            user_id: user_id.to_string(),
            category,
            key: key.to_string(),
        })
    }

    /// All facts for `user_id`, optionally limited to one category, ordered by
    /// category then key.
    #[must_use]
    pub fn for_user(&self, user_id: &str, category: Option<FactCategory>) -> Vec<&Fact> {
        let mut out: Vec<&Fact> = self
            .facts
            .values()
            .filter(|f| f.user_id == user_id)
            .filter(|f| category.is_none_or(|c| f.category == c))
            .collect();
        out.sort_by(|a, b| (a.category, &a.key).cmp(&(b.category, &b.key)));
        out
    }

    /// Number of stored facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
