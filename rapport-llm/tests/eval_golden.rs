//! Analyst Prompt Evaluation — Golden Test Set.
//!
//! Curated prompt renderings and recorded model outputs that pin down what
//! the analyst sees and how its answers are read back.
//!
//! ## Usage
//!
//! - **Offline eval:** `cargo test -p rapport-llm --test eval_golden` checks
//!   rendering, recorded-output parsing and the rule fallback.
//! - **Online eval (requires Ollama):** set `RAPPORT_EVAL_LLM=1` to send the
//!   golden messages to a local model and print what comes back.

use rapport_core::facts::prompt::build_extraction_prompt;
use rapport_core::{FactCategory, FactExtractor, FeatureFlags, TextAnalyzer};
use rapport_core::analyzer::StaticAnalyzer;
use rapport_llm::prompt::{self, PromptEngine, PromptId};
use rapport_llm::{LlmAnalyzer, LlmClient, LlmProvider, RetryPolicy};

/// A golden rendering case.
struct GoldenCase {
    name: &'static str,
    id: PromptId,
    vars: Vec<(&'static str, String)>,
    must_contain: Vec<&'static str>,
    must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            name: "extraction_wraps_core_request",
            id: PromptId::FactExtraction,
            vars: vec![(
                "request",
                build_extraction_prompt("My name is Maya and I'm allergic to peanuts."),
            )],
            must_contain: vec![
                "Maya",
                "allergic to peanuts",
                "personal_info",
                "health",
                "JSON",
            ],
            must_not_contain: vec!["{request}", "{message}", "{categories}"],
        },
        GoldenCase {
            name: "sentiment_names_the_companion",
            id: PromptId::InteractionSentiment,
            vars: vec![
                ("personality_name", "Aria".to_string()),
                ("message", "You never listen to me.".to_string()),
            ],
            must_contain: vec!["Aria", "You never listen to me.", "very_negative"],
            must_not_contain: vec!["{personality_name}", "{message}"],
        },
    ]
}

#[test]
fn golden_renderings_are_well_formed() {
    let engine = PromptEngine::builtin();
    for case in golden_cases() {
        let vars: Vec<(&str, &str)> = case.vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let (system, user) = engine.render(case.id, &vars).expect("builtin template");
        let rendered = format!("{system}\n{user}");
        for needle in &case.must_contain {
            assert!(rendered.contains(needle), "{}: missing {needle:?}", case.name);
        }
        for needle in &case.must_not_contain {
            assert!(!rendered.contains(needle), "{}: leaked {needle:?}", case.name);
        }
    }
}

#[test]
fn grammars_name_every_required_field() {
    for field in ["category", "key", "value", "confidence"] {
        assert!(prompt::FACT_LIST_GRAMMAR.contains(field), "fact grammar lacks {field}");
    }
    for label in ["very_positive", "positive", "neutral", "negative", "very_negative"] {
        assert!(prompt::SENTIMENT_GRAMMAR.contains(label), "sentiment grammar lacks {label}");
    }
}

/// Outputs recorded from small local models, including their usual quirks.
const RECORDED_OUTPUTS: &[(&str, usize)] = &[
    (
        r#"[{"category": "personal_info", "key": "name", "value": "Maya", "confidence": 0.97},
            {"category": "health", "key": "allergy_peanuts", "value": "peanuts", "confidence": 0.92}]"#,
        2,
    ),
    (
        "Sure! Here are the facts:\n```json\n{\"facts\": [{\"category\": \"hobby\", \"key\": \"hobbies\", \"value\": \"sailing\", \"confidence\": 0.8}]}\n```",
        1,
    ),
    (
        r#"[{"category": "work", "key": "occupation", "value": "nurse", "confidence": 0.4}]"#,
        0,
    ),
    ("I could not find any facts in this message.", 0),
];

#[tokio::test]
async fn recorded_outputs_parse_into_facts() {
    let extractor = FactExtractor::default();
    let features = FeatureFlags::ALL;
    for (output, expected) in RECORDED_OUTPUTS {
        let analyzer = StaticAnalyzer::responding(*output);
        let facts = extractor
            .extract_with(&analyzer, "u1", "irrelevant", Some("m1"), &features)
            .await;
        assert_eq!(facts.len(), *expected, "output: {output}");
    }
}

#[tokio::test]
async fn unreachable_model_falls_back_to_rules() {
    let client = LlmClient::new(
        LlmProvider::Ollama {
            base_url: "http://127.0.0.1:9".into(),
        },
        "test-model",
        RetryPolicy::none(),
    );
    let analyzer = LlmAnalyzer::from(client);
    assert!(analyzer.analyze("hi", "extract").await.is_err());

    let facts = FactExtractor::default()
        .extract_with(&analyzer, "u1", "My name is Maya.", None, &FeatureFlags::ALL)
        .await;
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].category, FactCategory::PersonalInfo);
    assert_eq!(facts[0].value, "Maya");
}

#[tokio::test]
async fn no_provider_falls_back_to_rules() {
    let facts = FactExtractor::default()
        .extract_with(
            &LlmClient::none(),
            "u1",
            "I work as a nurse.",
            None,
            &FeatureFlags::ALL,
        )
        .await;
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].key, "occupation");
}

#[tokio::test]
async fn online_golden_eval() {
    if std::env::var("RAPPORT_EVAL_LLM").is_err() {
        return;
    }
    let client = LlmClient::new(
        LlmProvider::Ollama {
            base_url: "http://localhost:11434".into(),
        },
        std::env::var("RAPPORT_EVAL_MODEL").unwrap_or_else(|_| "llama3.2:3b".into()),
        RetryPolicy::default(),
    );
    let extractor = FactExtractor::default();
    for message in [
        "My name is Maya and I'm allergic to peanuts.",
        "I've been learning the cello since my sister Ana gave me hers.",
    ] {
        let facts = extractor
            .extract_with(&client, "eval", message, None, &FeatureFlags::ALL)
            .await;
        println!("{message}\n  -> {facts:#?}");
    }
}
