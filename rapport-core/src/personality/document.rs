//! The base personality document.
//!
//! Tunable parameters are a fixed set of named fields rather than an open
//! map, so a typo in a parameter name is caught when the document (or a
//! modifier) is parsed. Every section this crate does not model is kept in
//! [`PersonalityDocument::extra`] so documents round-trip losslessly.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::extensions::{self, PersonalityExtensions};
use crate::error::{RapportError, Result};

/// A personality definition: identity, prompt text and style parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityDocument {
    /// Personality name (e.g. "aria").
    pub name: String,
    /// Document schema version (e.g. "1.1").
    #[serde(default)]
    pub version: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// System-prompt text handed to the conversation model.
    #[serde(default)]
    pub system_prompt: String,
    /// Numeric style parameters, each in `[0, 1]`.
    #[serde(default)]
    pub advanced_parameters: AdvancedParameters,
    /// List-valued linguistic attributes.
    #[serde(default)]
    pub linguistic_profile: LinguisticProfile,
    /// Every other top-level section, including the optional
    /// `hierarchical_config` and `mood_config` extensions.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Named numeric tunables. Each value lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedParameters {
    /// Willingness to improvise.
    pub creativity: f64,
    /// Sensitivity to the user's feelings.
    pub empathy: f64,
    /// How often jokes appear.
    pub humor: f64,
    /// Register of speech (0 casual, 1 formal).
    pub formality: f64,
    /// Reply length tendency.
    pub verbosity: f64,
    /// Tendency to ask follow-up questions.
    pub curiosity: f64,
    /// Directness of opinions.
    pub assertiveness: f64,
    /// Teasing and lightness.
    pub playfulness: f64,
    /// Tolerance for repetition and confusion.
    pub patience: f64,
    /// Affectionate tone.
    pub warmth: f64,
}

impl Default for AdvancedParameters {
    fn default() -> Self {
        Self {
            creativity: 0.5,
            empathy: 0.5,
            humor: 0.5,
            formality: 0.5,
            verbosity: 0.5,
            curiosity: 0.5,
            assertiveness: 0.5,
            playfulness: 0.5,
            patience: 0.5,
            warmth: 0.5,
        }
    }
}

impl AdvancedParameters {
    /// Name/value pairs in declaration order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, f64); 10] {
        [
            ("creativity", self.creativity),
            ("empathy", self.empathy),
            ("humor", self.humor),
            ("formality", self.formality),
            ("verbosity", self.verbosity),
            ("curiosity", self.curiosity),
            ("assertiveness", self.assertiveness),
            ("playfulness", self.playfulness),
            ("patience", self.patience),
            ("warmth", self.warmth),
        ]
    }
}

/// Linguistic style: an overall tone plus list-valued attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinguisticProfile {
    /// Overall tone (e.g. "warm", "dry").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Characteristic sentence shapes.
    pub speech_patterns: Vec<String>,
    /// Catch-phrases.
    pub common_phrases: Vec<String>,
    /// Preferred words.
    pub vocabulary: Vec<String>,
    /// Interjections ("oh!", "hmm").
    pub interjections: Vec<String>,
    /// Topics the personality gravitates to.
    pub topics_of_interest: Vec<String>,
}

impl PersonalityDocument {
    /// Minimal document with default parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0".to_string(),
            description: String::new(),
            system_prompt: system_prompt.into(),
            advanced_parameters: AdvancedParameters::default(),
            linguistic_profile: LinguisticProfile::default(),
            extra: Map::new(),
        }
    }

    /// Parse and validate a document from JSON text.
    ///
    /// # Errors
    /// Returns `RapportError::Serialization` for malformed JSON and
    /// `RapportError::Validation` for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Parse and validate a document from an untyped JSON value.
    ///
    /// # Errors
    /// Same as [`PersonalityDocument::from_json_str`].
    pub fn from_value(value: Value) -> Result<Self> {
        let document: Self = serde_json::from_value(value)?;
        document.validate()?;
        Ok(document)
    }

    /// Read, parse and validate a JSON document from disk.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`PersonalityDocument::from_json_str`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The document as an untyped JSON value.
    ///
    /// # Errors
    /// Returns `RapportError::Serialization` if a value cannot be represented in JSON
    /// (e.g. a non-finite parameter).
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Check the value constraints serde cannot express.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RapportError::validation("name", "must not be empty"));
        }
        for (name, value) in self.advanced_parameters.entries() {
            if !(0.0..=1.0).contains(&value) {
                return Err(RapportError::validation(
                    format!("advanced_parameters.{name}"),
                    format!("{value} is outside [0, 1]"),
                ));
            }
        }
        Ok(())
    }

    /// Parse this document's own extension sections.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if an extension section is malformed.
    pub fn extensions(&self) -> Result<PersonalityExtensions> {
        extensions::parse_sections(&self.extra)
    }
}
