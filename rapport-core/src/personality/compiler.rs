//! Dynamic compiler — base personality + runtime state → effective personality.
//!
//! Order of application:
//!
//! 1. Start from an independent copy of the base document.
//! 2. If relationship levels are configured and affinity points are known,
//!    apply the modifiers of the first level whose range contains them.
//! 3. If moods are configured and the current mood names one of them, apply
//!    its modifiers on top of the level-adjusted values.
//!
//! Compilation is a pure function of its inputs.

use tracing::debug;

use super::document::PersonalityDocument;
use super::extensions::PersonalityExtensions;
use super::modifiers;
use crate::config::FeatureFlags;
use crate::error::Result;

/// Outcome of a compilation, including which modifier sets were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationReport {
    /// The effective personality for this turn.
    pub document: PersonalityDocument,
    /// Level whose modifiers were applied, if any.
    pub applied_level: Option<String>,
    /// Mood whose modifiers were applied, if any.
    pub applied_mood: Option<String>,
}

/// Compiles a base personality against runtime relationship state and mood.
#[derive(Debug, Clone, Default)]
pub struct DynamicCompiler {
    extensions: PersonalityExtensions,
}

impl DynamicCompiler {
    /// Compiler over already-parsed extensions.
    #[must_use]
    pub fn new(extensions: PersonalityExtensions) -> Self {
        Self { extensions }
    }

    /// Compiler over the extension sections embedded in `document`.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if an extension section is malformed.
    pub fn from_document(document: &PersonalityDocument) -> Result<Self> {
        Ok(Self::new(document.extensions()?))
    }

    /// The parsed extensions.
    #[must_use]
    pub fn extensions(&self) -> &PersonalityExtensions {
        &self.extensions
    }

    /// Produce the effective personality document.
    #[must_use]
    pub fn compile(
        &self,
        base: &PersonalityDocument,
        affinity_points: Option<i32>,
        current_mood: Option<&str>,
        features: &FeatureFlags,
    ) -> PersonalityDocument {
        self.compile_report(base, affinity_points, current_mood, features)
            .document
    }

    /// Like [`DynamicCompiler::compile`], also reporting which level and mood applied.
    #[must_use]
    pub fn compile_report(
        &self,
        base: &PersonalityDocument,
        affinity_points: Option<i32>,
        current_mood: Option<&str>,
        features: &FeatureFlags,
    ) -> CompilationReport {
        let mut document = base.clone();
        let mut applied_level = None;
        let mut applied_mood = None;

        if features.hierarchical_levels {
            if let Some(points) = affinity_points {
                match self.extensions.level_for_points(points) {
                    Some(level) => {
                        debug!(personality = %base.name, level = %level.name, points, "Applying level modifiers");
                        document = modifiers::apply(&level.modifiers, &document);
                        applied_level = Some(level.name.clone());
                    }
                    None if self.extensions.hierarchical.is_some() => {
                        debug!(personality = %base.name, points, "No relationship level covers these points");
                    }
                    None => {}
                }
            }
        }

        if features.moods {
            if let Some(mood_name) = current_mood {
                match self.extensions.mood(mood_name) {
                    Some(mood) => {
                        debug!(personality = %base.name, mood = %mood.name, "Applying mood modifiers");
                        document = modifiers::apply(&mood.modifiers, &document);
                        applied_mood = Some(mood.name.clone());
                    }
                    None => {
                        debug!(personality = %base.name, mood = mood_name, "Mood not configured; ignoring");
                    }
                }
            }
        }

        CompilationReport {
            document,
            applied_level,
            applied_mood,
        }
    }

    /// Name of the level whose range contains `affinity_points`.
    #[must_use]
    pub fn active_level_name(&self, affinity_points: i32) -> Option<&str> {
        self.extensions
            .level_for_points(affinity_points)
            .map(|level| level.name.as_str())
    }

    /// Names of the configured moods.
    #[must_use]
    pub fn available_mood_names(&self) -> Vec<&str> {
        self.extensions.mood_names()
    }

    /// True iff neither extension section is present and enabled.
    #[must_use]
    pub fn is_v1_0_only(&self) -> bool {
        self.extensions.is_v1_0_only()
    }
}

/// One-shot compilation without constructing a [`DynamicCompiler`].
#[must_use]
pub fn compile(
    base: &PersonalityDocument,
    extensions: &PersonalityExtensions,
    affinity_points: Option<i32>,
    current_mood: Option<&str>,
    features: &FeatureFlags,
) -> PersonalityDocument {
    DynamicCompiler::new(extensions.clone()).compile(base, affinity_points, current_mood, features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn aria() -> PersonalityDocument {
        PersonalityDocument::from_value(json!({
            "name": "aria",
            "system_prompt": "You are Aria.",
            "advanced_parameters": { "empathy": 0.9, "humor": 0.4 },
            "hierarchical_config": {
                "enabled": true,
                "relationship_levels": [
                    {
                        "name": "friend",
                        "affinity_range": [41, 60],
                        "modifiers": {
                            "advanced_parameters": { "empathy": 0.1, "humor": 0.2 },
                            "system_prompt": { "suffix": " Be warm." }
                        }
                    }
                ]
            },
            "mood_config": {
                "enabled": true,
                "moods": [
                    {
                        "name": "playful",
                        "modifiers": {
                            "advanced_parameters": { "humor": 0.3 },
                            "linguistic_profile": { "interjections": ["hehe"] }
                        }
                    }
                ]
            }
        }))
        .expect("valid document")
    }

    #[test]
    fn level_modifiers_clamp_to_one() {
        let base = aria();
        let compiler = DynamicCompiler::from_document(&base).expect("extensions parse");
        let out = compiler.compile(&base, Some(50), None, &FeatureFlags::default());
        assert!((out.advanced_parameters.empathy - 1.0).abs() < 1e-12);
        assert!(out.advanced_parameters.empathy <= 1.0);
        assert_eq!(out.system_prompt, "You are Aria. Be warm.");
    }

    #[test]
    fn mood_stacks_on_level_adjusted_values() {
        let base = aria();
        let compiler = DynamicCompiler::from_document(&base).expect("extensions parse");
        let report = compiler.compile_report(&base, Some(50), Some("playful"), &FeatureFlags::default());
        // 0.4 base + 0.2 level + 0.3 mood
        assert!((report.document.advanced_parameters.humor - 0.9).abs() < 1e-12);
        assert_eq!(report.applied_level.as_deref(), Some("friend"));
        assert_eq!(report.applied_mood.as_deref(), Some("playful"));
        assert_eq!(report.document.linguistic_profile.interjections, vec!["hehe"]);
    }

    #[test]
    fn points_outside_every_level_apply_nothing() {
        let base = aria();
        let compiler = DynamicCompiler::from_document(&base).expect("extensions parse");
        let out = compiler.compile(&base, Some(10), None, &FeatureFlags::default());
        assert_eq!(out, base);
        assert!(compiler.active_level_name(10).is_none());
        assert_eq!(compiler.active_level_name(41), Some("friend"));
    }

    #[test]
    fn unknown_mood_is_ignored() {
        let base = aria();
        let compiler = DynamicCompiler::from_document(&base).expect("extensions parse");
        let report = compiler.compile_report(&base, None, Some("grumpy"), &FeatureFlags::default());
        assert_eq!(report.document, base);
        assert!(report.applied_mood.is_none());
    }

    #[test]
    fn feature_flags_gate_each_stage() {
        let base = aria();
        let compiler = DynamicCompiler::from_document(&base).expect("extensions parse");
        let no_levels = FeatureFlags {
            hierarchical_levels: false,
            ..FeatureFlags::default()
        };
        let report = compiler.compile_report(&base, Some(50), Some("playful"), &no_levels);
        assert!(report.applied_level.is_none());
        assert!((report.document.advanced_parameters.humor - 0.7).abs() < 1e-12);

        let out = compiler.compile(&base, Some(50), Some("playful"), &FeatureFlags::NONE);
        assert_eq!(out, base);
    }

    #[test]
    fn v1_0_only_personality_compiles_to_itself() {
        let base = PersonalityDocument::new("plain", "You are plain.");
        let compiler = DynamicCompiler::from_document(&base).expect("no extensions");
        assert!(compiler.is_v1_0_only());
        assert!(compiler.available_mood_names().is_empty());
        for points in [0, 50, 100] {
            let out = compiler.compile(&base, Some(points), Some("playful"), &FeatureFlags::ALL);
            assert_eq!(out, base);
        }
    }

    #[test]
    fn base_is_never_mutated() {
        let base = aria();
        let snapshot = base.clone();
        let extensions = base.extensions().expect("parse");
        for _ in 0..3 {
            let _ = compile(&base, &extensions, Some(50), Some("playful"), &FeatureFlags::default());
        }
        assert_eq!(base, snapshot);
    }
}
