//! # Rapport Core Library
//!
//! Relationship-aware personality compilation and conversational memory for
//! chat companions.
//!
//! One static personality document becomes a different effective
//! personality per user, depending on how the relationship has developed:
//!
//! - **Personality** — "Who I am": a typed document plus optional
//!   relationship-level and mood extensions, compiled per turn
//! - **Affinity** — "How close we are": 0–100 points mapped onto named levels
//! - **Facts** — "What I know about you": categorized, confidence-scored
//! - **Episodes** — "Moments we shared": importance-scored, slowly decaying
//!
//! ## Boundaries
//!
//! Every operation in this crate is pure and synchronous. Persistence and
//! optional language-model analysis sit behind the [`Store`] and
//! [`TextAnalyzer`] traits; an in-memory [`InMemoryStore`] is included.
//! Optional subsystems are switched with an explicit [`FeatureFlags`] value
//! passed to each entry point.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod affinity;
pub mod analyzer;
pub mod config;
pub mod episodes;
pub mod error;
pub mod facts;
pub mod personality;
pub mod store;
pub mod telemetry;
pub mod types;

pub use affinity::{AffinityManager, AffinityRange, AffinityState, InteractionType, LevelTable, RelationshipEvent};
pub use analyzer::TextAnalyzer;
pub use config::{FeatureFlags, RapportConfig};
pub use episodes::{Episode, EpisodeType, EpisodicManager, Sentiment};
pub use error::{RapportError, Result};
pub use facts::{Fact, FactCategory, FactClassifier, FactExtractor};
pub use personality::{DynamicCompiler, PersonalityDocument, PersonalityExtensions};
pub use store::{InMemoryStore, Store};
pub use types::*;
