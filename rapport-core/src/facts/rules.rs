//! Deterministic extraction rules — the offline fact extractor.
//!
//! Each rule is a case-insensitive pattern with a named `value` capture.
//! Rules never call out; they only recognise common self-disclosure
//! phrasings ("my name is …", "I live in …", "I love …").

use std::sync::LazyLock;

use regex::Regex;

use super::FactCategory;

/// Most words kept from a free-text capture.
const MAX_VALUE_WORDS: usize = 8;
/// Longest slug appended to a derived key.
const MAX_SLUG_LEN: usize = 40;
/// Words that start a new clause; a captured value ends before them.
const CLAUSE_BREAKS: &[&str] = &["and", "but", "because", "so", "although", "though", "which"];

/// How a rule derives the fact key.
#[derive(Debug, Clone, Copy)]
enum KeySpec {
    /// Always the same key.
    Fixed(&'static str),
    /// `prefix` + `_` + slug of the captured value.
    FromValue(&'static str),
    /// Slug of the named capture group + `_` + suffix.
    FromGroup(&'static str, &'static str),
}

struct Rule {
    pattern: Regex,
    category: FactCategory,
    key: KeySpec,
    confidence: f64,
}

/// A fact recognised by a rule, before it becomes a [`super::Fact`].
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Fact category.
    pub category: FactCategory,
    /// Derived key.
    pub key: String,
    /// Cleaned captured value.
    pub value: String,
    /// Fixed confidence of the rule that matched.
    pub confidence: f64,
}

const CLAUSE: &str = r"[^.,!?;\n]+";

fn rule(pattern: &str, category: FactCategory, key: KeySpec, confidence: f64) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("extraction rule pattern compiles"),
        category,
        key,
        confidence,
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use FactCategory as C;
    use KeySpec::{Fixed, FromGroup, FromValue};
    vec![
        rule(
            r"(?i:\bmy name is|\bcall me|\bi'?m called|\bi am called)\s+(?P<value>[A-Za-z][\w'\-]*(?:\s+[A-Z][\w'\-]*)?)",
            C::PersonalInfo,
            Fixed("name"),
            0.95,
        ),
        rule(
            r"(?i)\bi(?:'m| am)\s+(?P<value>\d{1,3})\s+years?\s+old\b",
            C::PersonalInfo,
            Fixed("age"),
            0.95,
        ),
        rule(
            &format!(r"(?i)\bmy birthday is\s+(?:on\s+)?(?P<value>{CLAUSE})"),
            C::PersonalInfo,
            Fixed("birthday"),
            0.9,
        ),
        rule(
            &format!(r"(?i)\bi live in\s+(?P<value>{CLAUSE})"),
            C::Location,
            Fixed("home"),
            0.9,
        ),
        rule(
            &format!(r"(?i)\bi(?:'m| am) from\s+(?P<value>{CLAUSE})"),
            C::Location,
            Fixed("hometown"),
            0.85,
        ),
        rule(
            &format!(r"(?i)\bi work as an?\s+(?P<value>{CLAUSE})"),
            C::Work,
            Fixed("occupation"),
            0.9,
        ),
        rule(
            r"(?i)\bi(?:'m| am) an?\s+(?P<value>[A-Za-z][\w' \-]*?)\s+by (?:profession|trade)\b",
            C::Work,
            Fixed("occupation"),
            0.9,
        ),
        rule(
            &format!(r"(?i)\bi work (?:at|for)\s+(?P<value>{CLAUSE})"),
            C::Work,
            Fixed("employer"),
            0.85,
        ),
        rule(
            r"(?i)\bmy (?P<relation>wife|husband|partner|girlfriend|boyfriend|son|daughter|mother|father|mom|dad|brother|sister|dog|cat|best friend)(?:'s name)? is (?:named |called )?(?P<value>[A-Za-z][\w'\-]*)",
            C::Relationship,
            FromGroup("relation", "name"),
            0.85,
        ),
        rule(
            &format!(r"(?i)\bmy (?:favou?rite )?hobb(?:y is|ies are)\s+(?P<value>{CLAUSE})"),
            C::Hobby,
            Fixed("hobbies"),
            0.85,
        ),
        rule(
            &format!(r"(?i)\bi (?:really |absolutely )?(?:love|like|enjoy|adore)\s+(?P<value>{CLAUSE})"),
            C::Preference,
            FromValue("likes"),
            0.8,
        ),
        rule(
            &format!(r"(?i)\bi (?:really )?(?:hate|dislike|can't stand|don't like)\s+(?P<value>{CLAUSE})"),
            C::Preference,
            FromValue("dislikes"),
            0.8,
        ),
        rule(
            &format!(r"(?i)\bi(?:'m| am) allergic to\s+(?P<value>{CLAUSE})"),
            C::Health,
            FromValue("allergy"),
            0.9,
        ),
        rule(
            &format!(r"(?i)\bi (?:want|hope|plan|dream) to\s+(?P<value>{CLAUSE})"),
            C::Goal,
            FromValue("goal"),
            0.75,
        ),
    ]
});

/// Lowercase, underscore-separated, bounded-length identifier.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let mut slug = slug.trim_end_matches('_').to_string();
    if slug.len() > MAX_SLUG_LEN {
        let mut cut = MAX_SLUG_LEN;
        while !slug.is_char_boundary(cut) {
            cut -= 1;
        }
        slug.truncate(cut);
        slug = slug.trim_end_matches('_').to_string();
    }
    slug
}

fn clean_value(raw: &str) -> String {
    raw.split_whitespace()
        .take_while(|w| !CLAUSE_BREAKS.contains(&w.to_lowercase().as_str()))
        .take(MAX_VALUE_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Run every rule over `message`.
///
/// When several matches share a `(category, key)`, the last one in the
/// message wins, mirroring fact overwrite semantics.
#[must_use]
pub fn apply_rules(message: &str) -> Vec<RuleMatch> {
    let mut matches: Vec<(usize, RuleMatch)> = Vec::new();

    for rule in RULES.iter() {
        for caps in rule.pattern.captures_iter(message) {
            let Some(raw) = caps.name("value") else {
                continue;
            };
            let value = clean_value(raw.as_str());
            if value.is_empty() {
                continue;
            }
            let key = match rule.key {
                KeySpec::Fixed(key) => key.to_string(),
                KeySpec::FromValue(prefix) => format!("{prefix}_{}", slugify(&value)),
                KeySpec::FromGroup(group, suffix) => match caps.name(group) {
                    Some(g) => format!("{}_{suffix}", slugify(g.as_str())),
                    None => continue,
                },
            };
            let candidate = RuleMatch {
                category: rule.category,
                key,
                value,
                confidence: rule.confidence,
            };
            matches.retain(|(_, m)| !(m.category == candidate.category && m.key == candidate.key));
            matches.push((raw.start(), candidate));
        }
    }

    matches.sort_by_key(|(pos, _)| *pos);
    matches.into_iter().map(|(_, m)| m).collect()
}
