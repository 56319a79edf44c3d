//! Fact importance classification.

use super::{Fact, FactCategory};
use crate::config::FactConfig;
use crate::types::{ClassificationResult, ImportanceLevel, ItemType};

/// Confidence at or above which a fact is [`ImportanceLevel::High`].
pub const HIGH_CONFIDENCE: f64 = 0.95;
/// Confidence at or above which a fact is [`ImportanceLevel::Medium`].
pub const MEDIUM_CONFIDENCE: f64 = 0.7;

/// Maps facts onto the shared five-tier importance scale.
#[derive(Debug, Clone)]
pub struct FactClassifier {
    core_identity: Vec<FactCategory>,
}

impl Default for FactClassifier {
    fn default() -> Self {
        Self::new(vec![FactCategory::PersonalInfo])
    }
}

impl FactClassifier {
    /// Classifier promoting facts in `core_identity` categories one tier.
    #[must_use]
    pub fn new(core_identity: Vec<FactCategory>) -> Self {
        Self { core_identity }
    }

    /// Classifier configured from the `[facts]` section.
    #[must_use]
    pub fn from_config(config: &FactConfig) -> Self {
        Self::new(
            config
                .core_identity_categories
                .iter()
                .map(|name| FactCategory::from_name(name))
                .collect(),
        )
    }

    /// Classify a single fact.
    #[must_use]
    pub fn classify_fact(&self, fact: &Fact) -> ClassificationResult {
        let mut level = if fact.confidence >= HIGH_CONFIDENCE {
            ImportanceLevel::High
        } else if fact.confidence >= MEDIUM_CONFIDENCE {
            ImportanceLevel::Medium
        } else {
            ImportanceLevel::Low
        };
        if self.core_identity.contains(&fact.category) {
            level = level.promoted();
        }
        ClassificationResult {
            item_type: ItemType::Fact,
            primary_category: fact.category.as_str().to_string(),
            importance_level: level,
            confidence: fact.confidence,
        }
    }
}

/// Facts in `category`, preserving input order.
#[must_use]
pub fn get_facts_by_category(facts: &[Fact], category: FactCategory) -> Vec<&Fact> {
    facts.iter().filter(|f| f.category == category).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(category: FactCategory, confidence: f64) -> Fact {
        Fact::new("u1", category, "k", "v", confidence).expect("valid fact")
    }

    #[test]
    fn tiers_follow_confidence() {
        let classifier = FactClassifier::new(Vec::new());
        let level = |c| classifier.classify_fact(&fact(FactCategory::Work, c)).importance_level;
        assert_eq!(level(0.99), ImportanceLevel::High);
        assert_eq!(level(0.95), ImportanceLevel::High);
        assert_eq!(level(0.85), ImportanceLevel::Medium);
        assert_eq!(level(0.7), ImportanceLevel::Medium);
        assert_eq!(level(0.5), ImportanceLevel::Low);
    }

    #[test]
    fn core_identity_is_promoted() {
        let classifier = FactClassifier::default();
        let result = classifier.classify_fact(&fact(FactCategory::PersonalInfo, 0.96));
        assert_eq!(result.importance_level, ImportanceLevel::Critical);
        assert_eq!(result.item_type, ItemType::Fact);
        assert_eq!(result.primary_category, "personal_info");

        let result = classifier.classify_fact(&fact(FactCategory::Hobby, 0.96));
        assert_eq!(result.importance_level, ImportanceLevel::High);
    }

    #[test]
    fn from_config_reads_core_categories() {
        let config = FactConfig {
            core_identity_categories: vec!["health".to_string()],
            ..FactConfig::default()
        };
        let classifier = FactClassifier::from_config(&config);
        let result = classifier.classify_fact(&fact(FactCategory::Health, 0.5));
        assert_eq!(result.importance_level, ImportanceLevel::Medium);
    }

    #[test]
    fn category_filter_is_pure() {
        let facts = vec![
            fact(FactCategory::Work, 0.9),
            fact(FactCategory::Hobby, 0.9),
            fact(FactCategory::Work, 0.8),
        ];
        let work = get_facts_by_category(&facts, FactCategory::Work);
        assert_eq!(work.len(), 2);
        assert_eq!(facts.len(), 3);
    }
}
