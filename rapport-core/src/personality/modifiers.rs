//! Modifier engine — bounded, additive adjustments to a personality.
//!
//! Three kinds of adjustment, one per document area:
//!
//! | Target                 | Rule                                      |
//! |------------------------|-------------------------------------------|
//! | advanced parameters    | `clamp(base + delta, 0, 1)` per named key |
//! | linguistic list fields | `base ++ additions` (no de-duplication)   |
//! | system prompt          | `prefix + base + suffix`                  |
//!
//! Every function takes its inputs by reference and returns a new value, so
//! modifier sets can be applied in sequence without state bleed.

use serde::{Deserialize, Serialize};

use super::document::{AdvancedParameters, LinguisticProfile, PersonalityDocument};
use crate::error::{RapportError, Result};

/// Largest magnitude a single parameter delta may have.
pub const MAX_PARAMETER_DELTA: f64 = 1.0;

/// Optional delta per named advanced parameter. Absent keys are untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterModifiers {
    /// Delta for `creativity`.
    pub creativity: Option<f64>,
    /// Delta for `empathy`.
    pub empathy: Option<f64>,
    /// Delta for `humor`.
    pub humor: Option<f64>,
    /// Delta for `formality`.
    pub formality: Option<f64>,
    /// Delta for `verbosity`.
    pub verbosity: Option<f64>,
    /// Delta for `curiosity`.
    pub curiosity: Option<f64>,
    /// Delta for `assertiveness`.
    pub assertiveness: Option<f64>,
    /// Delta for `playfulness`.
    pub playfulness: Option<f64>,
    /// Delta for `patience`.
    pub patience: Option<f64>,
    /// Delta for `warmth`.
    pub warmth: Option<f64>,
}

impl ParameterModifiers {
    fn entries(&self) -> [(&'static str, Option<f64>); 10] {
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

    /// Whether no delta is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, delta)| delta.is_none())
    }

    /// Reject non-finite deltas and deltas larger than [`MAX_PARAMETER_DELTA`].
    ///
    /// # Errors
    /// Returns `RapportError::Validation` naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        for (name, delta) in self.entries() {
            if let Some(d) = delta {
                if !d.is_finite() || d.abs() > MAX_PARAMETER_DELTA {
                    return Err(RapportError::validation(
                        format!("modifiers.advanced_parameters.{name}"),
                        format!("delta {d} is outside [-{MAX_PARAMETER_DELTA}, {MAX_PARAMETER_DELTA}]"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Values appended to list-valued linguistic attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinguisticModifiers {
    /// Appended to `speech_patterns`.
    pub speech_patterns: Vec<String>,
    /// Appended to `common_phrases`.
    pub common_phrases: Vec<String>,
    /// Appended to `vocabulary`.
    pub vocabulary: Vec<String>,
    /// Appended to `interjections`.
    pub interjections: Vec<String>,
    /// Appended to `topics_of_interest`.
    pub topics_of_interest: Vec<String>,
}

impl LinguisticModifiers {
    /// Whether nothing would be appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.speech_patterns.is_empty()
            && self.common_phrases.is_empty()
            && self.vocabulary.is_empty()
            && self.interjections.is_empty()
            && self.topics_of_interest.is_empty()
    }
}

/// Text wrapped around the system prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemPromptModifiers {
    /// Prepended verbatim; empty is a no-op.
    pub prefix: String,
    /// Appended verbatim; empty is a no-op.
    pub suffix: String,
}

/// The full modifier aggregate attached to a relationship level or a mood.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelModifiers {
    /// Numeric parameter deltas.
    pub advanced_parameters: ParameterModifiers,
    /// Linguistic list additions.
    pub linguistic_profile: LinguisticModifiers,
    /// System-prompt prefix/suffix.
    pub system_prompt: SystemPromptModifiers,
}

impl LevelModifiers {
    /// Validate every part of the aggregate.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` for an out-of-range parameter delta.
    pub fn validate(&self) -> Result<()> {
        self.advanced_parameters.validate()
    }

    /// Whether applying this aggregate would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.advanced_parameters.is_empty()
            && self.linguistic_profile.is_empty()
            && self.system_prompt.prefix.is_empty()
            && self.system_prompt.suffix.is_empty()
    }
}

fn shift(base: f64, delta: Option<f64>) -> f64 {
    match delta {
        Some(d) => (base + d).clamp(0.0, 1.0),
        None => base,
    }
}

/// Apply parameter deltas, clamping each adjusted value to `[0, 1]`.
#[must_use]
pub fn apply_parameters(base: &AdvancedParameters, modifiers: &ParameterModifiers) -> AdvancedParameters {
    AdvancedParameters {
        creativity: shift(base.creativity, modifiers.creativity),
        empathy: shift(base.empathy, modifiers.empathy),
        humor: shift(base.humor, modifiers.humor),
        formality: shift(base.formality, modifiers.formality),
        verbosity: shift(base.verbosity, modifiers.verbosity),
        curiosity: shift(base.curiosity, modifiers.curiosity),
        assertiveness: shift(base.assertiveness, modifiers.assertiveness),
        playfulness: shift(base.playfulness, modifiers.playfulness),
        patience: shift(base.patience, modifiers.patience),
        warmth: shift(base.warmth, modifiers.warmth),
    }
}

fn appended(base: &[String], additions: &[String]) -> Vec<String> {
    base.iter().chain(additions).cloned().collect()
}

/// Append linguistic additions to the base lists.
#[must_use]
pub fn apply_linguistic(base: &LinguisticProfile, modifiers: &LinguisticModifiers) -> LinguisticProfile {
    LinguisticProfile {
        tone: base.tone.clone(),
        speech_patterns: appended(&base.speech_patterns, &modifiers.speech_patterns),
        common_phrases: appended(&base.common_phrases, &modifiers.common_phrases),
        vocabulary: appended(&base.vocabulary, &modifiers.vocabulary),
        interjections: appended(&base.interjections, &modifiers.interjections),
        topics_of_interest: appended(&base.topics_of_interest, &modifiers.topics_of_interest),
    }
}

/// Wrap the system prompt in the modifier's prefix and suffix.
#[must_use]
pub fn apply_system_prompt(base: &str, modifiers: &SystemPromptModifiers) -> String {
    let mut out =
        String::with_capacity(modifiers.prefix.len() + base.len() + modifiers.suffix.len());
    out.push_str(&modifiers.prefix);
    out.push_str(base);
    out.push_str(&modifiers.suffix);
    out
}

/// Apply a full modifier aggregate to a document, returning a new document.
#[must_use]
pub fn apply(modifiers: &LevelModifiers, target: &PersonalityDocument) -> PersonalityDocument {
    PersonalityDocument {
        system_prompt: apply_system_prompt(&target.system_prompt, &modifiers.system_prompt),
        advanced_parameters: apply_parameters(
            &target.advanced_parameters,
            &modifiers.advanced_parameters,
        ),
        linguistic_profile: apply_linguistic(
            &target.linguistic_profile,
            &modifiers.linguistic_profile,
        ),
        ..target.clone()
    }
}
