//! Personality documents and their runtime compilation.
//!
//! A static [`PersonalityDocument`] optionally carries relationship-level and
//! mood extensions. The [`DynamicCompiler`] merges the modifiers that apply
//! to the current relationship level and mood into an effective document,
//! using the pure [`modifiers`] engine.

pub mod compiler;
pub mod document;
pub mod extensions;
pub mod modifiers;

pub use compiler::{CompilationReport, DynamicCompiler, compile};
pub use document::{AdvancedParameters, LinguisticProfile, PersonalityDocument};
pub use extensions::{MoodConfig, PersonalityExtensions, RelationshipLevelConfig, parse};
pub use modifiers::{LevelModifiers, LinguisticModifiers, ParameterModifiers, SystemPromptModifiers};
