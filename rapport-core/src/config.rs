//! Configuration for the rapport system.
//!
//! Maps directly to `rapport.toml`. Every field has a serde default, so an
//! empty document yields [`RapportConfig::default`].

use serde::{Deserialize, Serialize};

use crate::affinity::{AffinityRange, LevelBand, LevelTable};
use crate::error::{RapportError, Result};
use crate::facts::FactCategory;

/// Top-level rapport configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RapportConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Which optional subsystems are switched on.
    #[serde(default)]
    pub features: FeatureFlags,
    /// Relationship level table and point scoring.
    #[serde(default)]
    pub affinity: AffinityConfig,
    /// Fact extraction and classification.
    #[serde(default)]
    pub facts: FactConfig,
    /// Episodic memory scoring and decay.
    #[serde(default)]
    pub episodes: EpisodeConfig,
    /// Text-analysis collaborator settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl RapportConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `RapportError::Config` if the TOML is invalid or a value is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| RapportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `RapportError::Config` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.facts.confidence_threshold) {
            return Err(RapportError::Config(format!(
                "facts.confidence_threshold must be within [0, 1], got {}",
                self.facts.confidence_threshold
            )));
        }
        if let Some(unknown) = self
            .facts
            .core_identity_categories
            .iter()
            .find(|name| FactCategory::parse_name(name).is_none())
        {
            return Err(RapportError::Config(format!(
                "facts.core_identity_categories: unknown category '{unknown}'"
            )));
        }
        if !(0.0..=10.0).contains(&self.episodes.storage_threshold) {
            return Err(RapportError::Config(format!(
                "episodes.storage_threshold must be within [0, 10], got {}",
                self.episodes.storage_threshold
            )));
        }
        if self.episodes.decay_rate < 0.0 || !self.episodes.decay_rate.is_finite() {
            return Err(RapportError::Config(format!(
                "episodes.decay_rate must be a non-negative number, got {}",
                self.episodes.decay_rate
            )));
        }
        if self.llm.retry.backoff_multiplier < 1.0 {
            return Err(RapportError::Config(format!(
                "llm.retry.backoff_multiplier must be >= 1.0, got {}",
                self.llm.retry.backoff_multiplier
            )));
        }
        self.affinity
            .level_table()
            .map_err(|e| RapportError::Config(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Explicit feature switches threaded through every component entry point.
///
/// There is no process-wide flag registry: callers hand the set they want to
/// the compiler, the extractor and the episodic manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Apply relationship-level modifiers during compilation.
    #[serde(default = "default_true")]
    pub hierarchical_levels: bool,
    /// Apply mood modifiers during compilation.
    #[serde(default = "default_true")]
    pub moods: bool,
    /// Delegate fact extraction to the text-analysis collaborator.
    #[serde(default)]
    pub llm_fact_extraction: bool,
    /// Run deterministic pattern rules when delegation is off or fails.
    #[serde(default = "default_true")]
    pub rule_based_fact_extraction: bool,
    /// Detect and score episodes.
    #[serde(default = "default_true")]
    pub episodic_memory: bool,
}

impl FeatureFlags {
    /// Every optional subsystem switched off.
    pub const NONE: Self = Self {
        hierarchical_levels: false,
        moods: false,
        llm_fact_extraction: false,
        rule_based_fact_extraction: false,
        episodic_memory: false,
    };

    /// Every optional subsystem switched on.
    pub const ALL: Self = Self {
        hierarchical_levels: true,
        moods: true,
        llm_fact_extraction: true,
        rule_based_fact_extraction: true,
        episodic_memory: true,
    };
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            hierarchical_levels: true,
            moods: true,
            llm_fact_extraction: false,
            rule_based_fact_extraction: true,
            episodic_memory: true,
        }
    }
}

/// One row of a custom relationship level table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelBandConfig {
    /// Level name (e.g. "friend").
    pub name: String,
    /// Lowest point value owned by this level.
    pub min: i32,
    /// Highest point value owned by this level.
    pub max: i32,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// Relationship level table and point scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityConfig {
    /// Custom level table. `None` uses the default five-tier table.
    #[serde(default)]
    pub levels: Option<Vec<LevelBandConfig>>,
    /// Messages longer than this many characters earn a bonus point.
    #[serde(default = "default_100")]
    pub long_message_threshold: usize,
    /// Bonus points for a long message with a non-negative base delta.
    #[serde(default = "default_1_i32")]
    pub long_message_bonus: i32,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            levels: None,
            long_message_threshold: 100,
            long_message_bonus: 1,
        }
    }
}

impl AffinityConfig {
    /// Build the level table described by this config.
    ///
    /// # Errors
    /// Returns `RapportError::Validation` if a band range is malformed or the table is empty.
    pub fn level_table(&self) -> Result<LevelTable> {
        match &self.levels {
            None => Ok(LevelTable::default()),
            Some(rows) => {
                let bands = rows
                    .iter()
                    .map(|row| {
                        Ok(LevelBand {
                            name: row.name.clone(),
                            range: AffinityRange::new(row.min, row.max)?,
                            description: row.description.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                LevelTable::new(bands)
            }
        }
    }
}

/// Fact extraction and classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactConfig {
    /// Candidates below this confidence are dropped.
    #[serde(default = "default_0_7")]
    pub confidence_threshold: f64,
    /// Categories promoted one importance tier by the classifier.
    #[serde(default = "default_core_identity")]
    pub core_identity_categories: Vec<String>,
}

impl Default for FactConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            core_identity_categories: default_core_identity(),
        }
    }
}

/// Episodic memory scoring and decay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeConfig {
    /// Episodes scoring below this importance are not stored.
    #[serde(default = "default_5_0")]
    pub storage_threshold: f64,
    /// Coefficient of the logarithmic decay curve.
    #[serde(default = "default_0_1")]
    pub decay_rate: f64,
    /// Exchanges with more messages than this earn a bonus.
    #[serde(default = "default_3_usize")]
    pub long_exchange_messages: usize,
    /// Flat importance bonus for a long exchange.
    #[serde(default = "default_0_5")]
    pub long_exchange_bonus: f64,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            storage_threshold: 5.0,
            decay_rate: 0.1,
            long_exchange_messages: 3,
            long_exchange_bonus: 0.5,
        }
    }
}

/// Text-analysis collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_none")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key (OpenAI-compatible only).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_10000")]
    pub request_timeout_ms: u64,
    /// Maximum tokens to generate.
    #[serde(default = "default_512")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_0_2_f32")]
    pub temperature: f32,
    /// Retry policy for failed calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_none(),
            base_url: default_ollama_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_ms: 10_000,
            max_tokens: 512,
            temperature: 0.2,
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential backoff settings for the text-analysis client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_2")]
    pub max_retries: u32,
    /// Delay before the first retry.
    #[serde(default = "default_250")]
    pub initial_backoff_ms: u64,
    /// Factor applied to the delay after each retry.
    #[serde(default = "default_2_0")]
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    #[serde(default = "default_4000")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 250,
            backoff_multiplier: 2.0,
            max_backoff_ms: 4000,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_none() -> String { "none".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "qwen2.5:3b".to_string() }
fn default_api_key_env() -> String { "RAPPORT_LLM_API_KEY".to_string() }
fn default_core_identity() -> Vec<String> { vec!["personal_info".to_string()] }
fn default_0_1() -> f64 { 0.1 }
fn default_0_2_f32() -> f32 { 0.2 }
fn default_0_5() -> f64 { 0.5 }
fn default_0_7() -> f64 { 0.7 }
fn default_2_0() -> f64 { 2.0 }
fn default_5_0() -> f64 { 5.0 }
fn default_1_i32() -> i32 { 1 }
fn default_2() -> u32 { 2 }
fn default_3_usize() -> usize { 3 }
fn default_100() -> usize { 100 }
fn default_250() -> u64 { 250 }
fn default_512() -> u32 { 512 }
fn default_4000() -> u64 { 4000 }
fn default_10000() -> u64 { 10_000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = RapportConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.general.log_level, "info");
        assert!(config.features.hierarchical_levels);
        assert!(!config.features.llm_fact_extraction);
        assert!((config.facts.confidence_threshold - 0.7).abs() < f64::EPSILON);
        assert!((config.episodes.storage_threshold - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.llm.retry.max_retries, 2);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = RapportConfig::from_toml(
            r#"
            [features]
            moods = false

            [facts]
            confidence_threshold = 0.85
            "#,
        )
        .expect("parses");
        assert!(!config.features.moods);
        assert!(config.features.hierarchical_levels);
        assert!((config.facts.confidence_threshold - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.facts.core_identity_categories, vec!["personal_info"]);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = RapportConfig::from_toml("[facts]\nconfidence_threshold = 1.5\n")
            .expect_err("threshold above 1 must fail");
        assert!(matches!(err, RapportError::Config(_)));
    }

    #[test]
    fn unknown_core_identity_category_is_rejected() {
        let err = RapportConfig::from_toml(
            "[facts]\ncore_identity_categories = [\"personal-infoo\"]\n",
        )
        .expect_err("typo must fail");
        assert!(matches!(err, RapportError::Config(msg) if msg.contains("personal-infoo")));

        let ok = RapportConfig::from_toml(
            "[facts]\ncore_identity_categories = [\"personal-info\", \"Health\"]\n",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn custom_level_table_is_validated() {
        let ok = RapportConfig::from_toml(
            r#"
            [[affinity.levels]]
            name = "cold"
            min = 0
            max = 49

            [[affinity.levels]]
            name = "warm"
            min = 50
            max = 100
            "#,
        )
        .expect("valid table");
        let table = ok.affinity.level_table().expect("table builds");
        assert_eq!(table.len(), 2);

        let bad = RapportConfig::from_toml(
            r#"
            [[affinity.levels]]
            name = "broken"
            min = 60
            max = 10
            "#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn config_loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rapport.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").expect("write");
        let config = RapportConfig::from_file(&path).expect("loads");
        assert_eq!(config.general.log_level, "debug");
    }
}
