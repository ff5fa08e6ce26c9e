//! Pattern definitions for attention phrases, command phrases, and draft
//! start/end phrases, plus the cross-product builders used to generate the
//! default phrase sets from a name list and a phrase-template list.

/// A single matchable phrase, optionally requiring every word in
/// `required_words` to already appear in the search buffer (at word-level
/// similarity) before a full partial-ratio match is attempted.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub phrase: String,
    pub required_words: Vec<String>,
}

impl Pattern {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            required_words: Vec::new(),
        }
    }

    pub fn with_required_words(phrase: impl Into<String>, words: &[&str]) -> Self {
        Self {
            phrase: phrase.into(),
            required_words: words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// An ordered named command: the first phrase in `phrases` to clear
/// `command_score` wins; the definition fires at most once per TextEvent.
#[derive(Debug, Clone)]
pub struct CommandDefinition {
    pub name: String,
    pub phrases: Vec<Pattern>,
}

/// Builds patterns as the cross product of `names` and `templates`, where
/// each template contains a single `{name}` placeholder. Deduplicates
/// identical resulting phrases while preserving first-seen order, so
/// priority among near-duplicate cross-product entries is stable.
fn cross_product(names: &[&str], templates: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for template in templates {
        for name in names {
            let phrase = template.replace("{name}", name);
            if seen.insert(phrase.clone()) {
                out.push(phrase);
            }
        }
    }
    out
}

pub const DEFAULT_NAMES: &[&str] = &["rupert", "freddy"];

pub fn default_attention_patterns(names: &[&str]) -> Vec<Pattern> {
    let templates = ["hey {name}", "{name}", "okay {name}"];
    cross_product(names, &templates)
        .into_iter()
        .map(Pattern::new)
        .collect()
}

pub fn default_draft_start_patterns(names: &[&str]) -> Vec<Pattern> {
    let templates = ["{name} take this down", "{name} start draft", "{name} begin note"];
    cross_product(names, &templates)
        .into_iter()
        .map(Pattern::new)
        .collect()
}

pub fn default_draft_end_patterns(_names: &[&str]) -> Vec<Pattern> {
    ["break break break", "stop draft", "end note"]
        .into_iter()
        .map(Pattern::new)
        .collect()
}

pub fn default_commands(names: &[&str]) -> Vec<CommandDefinition> {
    let start_templates = ["{name} start block", "{name} begin block"];
    let stop_templates = ["{name} stop block", "{name} end block"];
    vec![
        CommandDefinition {
            name: "start_block".to_string(),
            phrases: cross_product(names, &start_templates)
                .into_iter()
                .map(Pattern::new)
                .collect(),
        },
        CommandDefinition {
            name: "stop_block".to_string(),
            phrases: cross_product(names, &stop_templates)
                .into_iter()
                .map(Pattern::new)
                .collect(),
        },
    ]
}
