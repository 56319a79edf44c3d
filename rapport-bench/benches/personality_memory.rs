//! Rapport Benchmark Suite
//!
//! Per-message hot paths and their targets:
//!   compile_layered_personality ...... < 20μs
//!   affinity_record_interaction ...... < 2μs
//!   rule_extraction_intro_message .... < 50μs
//!   episode_decay_pass_500 ........... < 100μs

use std::hint::black_box;

use chrono::{Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use rapport_core::affinity::scoring;
use rapport_core::episodes::{self, Episode, EpisodeType, Sentiment, decay};
use rapport_core::facts::rules;
use rapport_core::{AffinityManager, DynamicCompiler, FactExtractor, FeatureFlags, PersonalityDocument};

const INTRO: &str = "Hi, my name is Maya. I'm 34 and I live in Lisbon. I work as a marine biologist \
                     and my sister is named Ana. I love sailing but I hate crowded beaches.";

fn layered_personality() -> PersonalityDocument {
    PersonalityDocument::from_value(json!({
        "name": "aria",
        "system_prompt": "You are Aria, a thoughtful companion.",
        "advanced_parameters": { "empathy": 0.6, "humor": 0.4, "formality": 0.5 },
        "hierarchical_config": {
            "enabled": true,
            "relationship_levels": [
                { "name": "stranger", "affinity_range": [0, 20],
                  "modifiers": { "advanced_parameters": { "formality": 0.3 } } },
                { "name": "friend", "affinity_range": [21, 60],
                  "modifiers": { "advanced_parameters": { "empathy": 0.2, "humor": 0.2 },
                                 "system_prompt": { "suffix": " You know the user well." } } },
                { "name": "close_friend", "affinity_range": [61, 100],
                  "modifiers": { "advanced_parameters": { "empathy": 0.4 },
                                 "system_prompt": { "prefix": "[close] " } } }
            ]
        },
        "mood_config": {
            "enabled": true,
            "moods": [
                { "name": "playful", "modifiers": { "advanced_parameters": { "humor": 0.3 } } }
            ]
        }
    }))
    .expect("valid personality")
}

/// Benchmark: Compile a personality with level and mood layers (target: < 20μs).
fn bench_compile(c: &mut Criterion) {
    let base = layered_personality();
    let compiler = DynamicCompiler::from_document(&base).expect("extensions parse");
    let features = FeatureFlags::ALL;
    c.bench_function("compile_layered_personality", |b| {
        b.iter(|| {
            black_box(compiler.compile(
                black_box(&base),
                Some(black_box(45)),
                Some("playful"),
                &features,
            ))
        });
    });
}

/// Benchmark: Score a message and apply the resulting delta (target: < 2μs).
fn bench_affinity(c: &mut Criterion) {
    let manager = AffinityManager::default();
    let state = manager.initial_state("u1", "aria");
    let message = "Thank you so much, talking to you always makes my day better!";
    c.bench_function("affinity_record_interaction", |b| {
        b.iter(|| {
            let kind = scoring::score_interaction(black_box(message));
            black_box(manager.record_interaction(&state, kind, Some(message.len()), "chat"))
        });
    });
}

/// Benchmark: Rule-based extraction on a dense introduction (target: < 50μs).
fn bench_extraction(c: &mut Criterion) {
    let extractor = FactExtractor::default();
    let features = FeatureFlags::default();
    c.bench_function("rule_extraction_intro_message", |b| {
        b.iter(|| black_box(rules::apply_rules(black_box(INTRO))));
    });
    c.bench_function("fact_objects_intro_message", |b| {
        b.iter(|| black_box(extractor.extract("u1", black_box(INTRO), Some("m1"), &features)));
    });
}

/// Benchmark: Importance scoring and a decay pass over 500 episodes (target: < 100μs).
fn bench_episodes(c: &mut Criterion) {
    c.bench_function("episode_importance", |b| {
        b.iter(|| {
            black_box(episodes::calculate_importance(
                black_box(EpisodeType::EmotionalMoment),
                black_box(Sentiment::VeryNegative),
                black_box(6),
            ))
        });
    });

    let now = Utc::now();
    let mut history: Vec<Episode> = (0..500i64)
        .map(|i| {
            Episode::new("u1", EpisodeType::Milestone, "t", "", Sentiment::Positive, 6.0)
                .expect("valid episode")
                .at(now - Duration::days(i))
        })
        .collect();
    c.bench_function("episode_decay_pass_500", |b| {
        b.iter(|| decay::decay_pass(black_box(&mut history), now, decay::DEFAULT_DECAY_RATE));
    });
}

criterion_group!(
    benches,
    bench_compile,
    bench_affinity,
    bench_extraction,
    bench_episodes,
);
criterion_main!(benches);
