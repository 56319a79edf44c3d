//! Extension parser — the optional `hierarchical_config` and `mood_config`
//! sections of a personality document.
//!
//! ```text
//! hierarchical_config: { enabled, relationship_levels: [ {name, affinity_range: [min, max], description, modifiers} ] }
//! mood_config:         { enabled, moods: [ {name, description, modifiers} ] }
//! ```
//!
//! A section that is absent, has `enabled: false` (or no `enabled` key), or
//! lists no entries is treated as disabled. A personality with neither
//! section enabled is "v1.0-only".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::modifiers::LevelModifiers;
use crate::affinity::AffinityRange;
use crate::error::{RapportError, Result};

/// Top-level key of the relationship-level section.
pub const HIERARCHICAL_KEY: &str = "hierarchical_config";
/// Top-level key of the mood section.
pub const MOOD_KEY: &str = "mood_config";

/// Modifiers attached to one relationship level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipLevelConfig {
    /// Level name (e.g. "friend").
    pub name: String,
    /// Points owned by this level.
    pub affinity_range: AffinityRange,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Adjustments applied while the relationship is at this level.
    #[serde(default)]
    pub modifiers: LevelModifiers,
}

/// Modifiers attached to one named mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoodConfig {
    /// Mood name (e.g. "playful").
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Adjustments applied while the mood is active.
    #[serde(default)]
    pub modifiers: LevelModifiers,
}

/// Parsed extension sections. `None` means absent or disabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalityExtensions {
    /// Relationship levels in document order.
    pub hierarchical: Option<Vec<RelationshipLevelConfig>>,
    /// Configured moods in document order.
    pub moods: Option<Vec<MoodConfig>>,
}

impl PersonalityExtensions {
    /// True iff both extension sections are absent or disabled.
    #[must_use]
    pub fn is_v1_0_only(&self) -> bool {
        self.hierarchical.is_none() && self.moods.is_none()
    }

    /// First level (in document order) whose range contains `points`.
    #[must_use]
    pub fn level_for_points(&self, points: i32) -> Option<&RelationshipLevelConfig> {
        self.hierarchical
            .as_deref()?
            .iter()
            .find(|level| level.affinity_range.contains(points))
    }

    /// A configured mood by name.
    #[must_use]
    pub fn mood(&self, name: &str) -> Option<&MoodConfig> {
        self.moods.as_deref()?.iter().find(|mood| mood.name == name)
    }

    /// Names of all configured moods, in document order.
    #[must_use]
    pub fn mood_names(&self) -> Vec<&str> {
        self.moods
            .as_deref()
            .map(|moods| moods.iter().map(|m| m.name.as_str()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct HierarchicalSection {
    #[serde(default)]
    relationship_levels: Vec<RelationshipLevelConfig>,
}

#[derive(Debug, Deserialize)]
struct MoodSection {
    #[serde(default)]
    moods: Vec<MoodConfig>,
}

/// Parse the extension sections out of a raw personality document.
///
/// Deterministic and side-effect free.
///
/// # Errors
/// Returns `RapportError::Validation` if the document is not an object or an
/// enabled section is malformed (bad range, unknown modifier key, oversized
/// delta, empty name).
pub fn parse(raw_document: &Value) -> Result<PersonalityExtensions> {
    let object = raw_document.as_object().ok_or_else(|| {
        RapportError::validation("personality", "document must be a JSON object")
    })?;
    parse_sections(object)
}

/// Parse the extension sections out of a document's top-level map.
///
/// # Errors
/// Same as [`parse`].
pub fn parse_sections(sections: &Map<String, Value>) -> Result<PersonalityExtensions> {
    let hierarchical = match sections.get(HIERARCHICAL_KEY) {
        None | Some(Value::Null) => None,
        Some(value) if !is_enabled(value) => None,
        Some(value) => {
            let section: HierarchicalSection = section_from(HIERARCHICAL_KEY, value)?;
            if !section.relationship_levels.is_empty() {
                for level in &section.relationship_levels {
                    validate_entry(HIERARCHICAL_KEY, &level.name, &level.modifiers)?;
                }
                Some(section.relationship_levels)
            } else {
                None
            }
        }
    };

    let moods = match sections.get(MOOD_KEY) {
        None | Some(Value::Null) => None,
        Some(value) if !is_enabled(value) => None,
        Some(value) => {
            let section: MoodSection = section_from(MOOD_KEY, value)?;
            if !section.moods.is_empty() {
                for mood in &section.moods {
                    validate_entry(MOOD_KEY, &mood.name, &mood.modifiers)?;
                }
                Some(section.moods)
            } else {
                None
            }
        }
    };

    Ok(PersonalityExtensions {
        hierarchical,
        moods,
    })
}

/// Only an explicit `enabled: true` switches a section on; a disabled section
/// is not inspected further.
fn is_enabled(section: &Value) -> bool {
    section.get("enabled").and_then(Value::as_bool).unwrap_or(false)
}

fn section_from<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| RapportError::validation(key, e.to_string()))
}

fn validate_entry(key: &str, name: &str, modifiers: &LevelModifiers) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RapportError::validation(key, "entry name must not be empty"));
    }
    modifiers
        .validate()
        .map_err(|e| RapportError::validation(format!("{key}.{name}"), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "name": "aria",
            "hierarchical_config": {
                "enabled": true,
                "relationship_levels": [
                    {
                        "name": "stranger",
                        "affinity_range": [0, 40],
                        "description": "polite",
                        "modifiers": { "advanced_parameters": { "formality": 0.2 } }
                    },
                    {
                        "name": "friend",
                        "affinity_range": [41, 100],
                        "modifiers": {
                            "advanced_parameters": { "warmth": 0.2 },
                            "system_prompt": { "prefix": "You know this user well. " }
                        }
                    }
                ]
            },
            "mood_config": {
                "enabled": true,
                "moods": [
                    { "name": "playful", "modifiers": { "advanced_parameters": { "humor": 0.3 } } },
                    { "name": "tired" }
                ]
            }
        })
    }

    #[test]
    fn parses_both_sections() {
        let ext = parse(&sample()).expect("valid document");
        assert!(!ext.is_v1_0_only());
        let levels = ext.hierarchical.as_ref().expect("levels present");
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1].affinity_range.min(), 41);
        assert_eq!(ext.mood_names(), vec!["playful", "tired"]);
        assert_eq!(ext.level_for_points(50).map(|l| l.name.as_str()), Some("friend"));
    }

    #[test]
    fn absent_sections_are_v1_0_only() {
        let ext = parse(&json!({"name": "aria"})).expect("valid");
        assert!(ext.is_v1_0_only());
        assert!(ext.mood_names().is_empty());
        assert!(ext.level_for_points(10).is_none());
    }

    #[test]
    fn disabled_sections_are_ignored() {
        let mut doc = sample();
        doc["hierarchical_config"]["enabled"] = json!(false);
        doc["mood_config"].as_object_mut().expect("object").remove("enabled");
        let ext = parse(&doc).expect("valid");
        assert!(ext.is_v1_0_only());
    }

    #[test]
    fn malformed_range_is_a_validation_error() {
        let mut doc = sample();
        doc["hierarchical_config"]["relationship_levels"][0]["affinity_range"] = json!([50, 10]);
        let err = parse(&doc).expect_err("min > max");
        assert!(err.is_validation());

        let mut doc = sample();
        doc["hierarchical_config"]["relationship_levels"][0]["affinity_range"] = json!([0, 140]);
        assert!(parse(&doc).expect_err("max > 100").is_validation());
    }

    #[test]
    fn unknown_modifier_key_is_a_validation_error() {
        let mut doc = sample();
        doc["mood_config"]["moods"][0]["modifiers"]["advanced_parameters"] = json!({"sarcasm": 0.4});
        assert!(parse(&doc).expect_err("unknown key").is_validation());
    }

    #[test]
    fn disabled_section_is_not_validated() {
        let mut doc = sample();
        doc["hierarchical_config"]["enabled"] = json!(false);
        doc["hierarchical_config"]["relationship_levels"][0]["affinity_range"] = json!([90, 10]);
        let ext = parse(&doc).expect("disabled section is skipped");
        assert!(ext.hierarchical.is_none());
        assert!(ext.moods.is_some());
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(parse(&json!([1, 2, 3])).expect_err("array").is_validation());
    }

    #[test]
    fn parsing_is_idempotent() {
        let doc = sample();
        assert_eq!(parse(&doc).expect("first"), parse(&doc).expect("second"));
    }
}
