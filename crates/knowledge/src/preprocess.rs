//! Offline corpus preparation: raw chat dialogues to filtered Q/A pairs.
//!
//! Two stages, both producer-side of the corpus store:
//! - [`pairs_from_dialogues`] turns consecutive turns of different speakers
//!   into candidate pairs;
//! - [`filter_pairs`] enforces the corpus contract (useful answer length,
//!   no echo of the question, alphabetic content) and drops chat noise.

use crate::types::QaPair;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("unreachable error: invalid whitespace regex"));

/// Leading IRC artifacts such as `[12:03]` or `[nick]`.
static IRC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*?\]\s*").expect("unreachable error: invalid prefix regex"));

/// One message of a raw dialogue export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueMessage {
    pub dialogue_id: String,

    /// Speaker
    pub from: String,

    pub text: String,

    /// Sortable timestamp (ISO 8601 in the Ubuntu dialogue exports)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Rules applied to prepared pairs before they enter the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Shortest kept query, in characters
    pub min_query_len: usize,

    /// Shortest useful answer, in characters
    pub min_answer_len: usize,

    /// Longest kept query or answer; longer text is mostly chatter
    pub max_len: usize,

    /// Minimum share of alphanumeric characters
    pub min_alnum_ratio: f32,

    /// Drop pairs whose query or answer contains a link
    pub reject_urls: bool,

    /// Keep only pairs whose query or answer mentions one of `tech_hints`
    pub require_tech_signal: bool,

    pub tech_hints: Vec<String>,

    /// Shortest utterance considered when pairing dialogue turns
    pub min_utterance_len: usize,

    /// Minimum alphanumeric share of an utterance when pairing
    pub min_utterance_alnum_ratio: f32,

    /// Utterances that carry no content on their own
    pub acknowledgements: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_query_len: 15,
            min_answer_len: 15,
            max_len: 400,
            min_alnum_ratio: 0.55,
            reject_urls: true,
            require_tech_signal: true,
            tech_hints: [
                "ubuntu",
                "apt",
                "dpkg",
                "sudo",
                "bash",
                "terminal",
                "kernel",
                "grub",
                "wifi",
                "network",
                "drivers",
                "nvidia",
                "bluetooth",
                "update",
                "upgrade",
                "install",
                "package",
                "error",
                "failed",
                "permission",
                "mount",
                "disk",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_utterance_len: 8,
            min_utterance_alnum_ratio: 0.5,
            acknowledgements: [
                "ok", "okay", "k", "thx", "thanks", "ty", "lol", "yes", "no", "yep", "nope",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Per-rule drop counts of one filtering pass. Each dropped pair is counted
/// under the first rule it fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub input: usize,
    pub too_short: usize,
    pub too_long: usize,
    pub echoes_query: usize,
    pub no_alphabetic: usize,
    pub noise: usize,
    pub no_tech_signal: usize,
    pub duplicates: usize,
    pub kept: usize,
}

impl FilterStats {
    pub fn dropped(&self) -> usize {
        self.input - self.kept
    }
}

/// Collapse whitespace and strip a leading IRC artifact.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    IRC_PREFIX.replace(&collapsed, "").trim().to_string()
}

fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn alnum_ratio(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let alnum = text.chars().filter(|c| c.is_alphanumeric()).count();
    alnum as f32 / total as f32
}

fn is_bad_utterance(text: &str, config: &FilterConfig) -> bool {
    let low = text.trim().to_lowercase();
    if low.is_empty() {
        return true;
    }
    if config.acknowledgements.iter().any(|a| *a == low) {
        return true;
    }
    if low.chars().count() < config.min_utterance_len {
        return true;
    }
    alnum_ratio(&low) < config.min_utterance_alnum_ratio
}

/// Pair consecutive turns of different speakers within each dialogue.
///
/// Dialogues are visited in identifier order, messages within a dialogue by
/// date (undated last, otherwise input order).
pub fn pairs_from_dialogues(messages: Vec<DialogueMessage>, config: &FilterConfig) -> Vec<QaPair> {
    let mut dialogues: BTreeMap<String, Vec<DialogueMessage>> = BTreeMap::new();
    for mut message in messages {
        message.text = clean_text(&message.text);
        dialogues
            .entry(message.dialogue_id.clone())
            .or_default()
            .push(message);
    }

    let mut pairs = Vec::new();
    for turns in dialogues.values_mut() {
        turns.sort_by(|a, b| match (&a.date, &b.date) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        for window in turns.windows(2) {
            let (question, answer) = (&window[0], &window[1]);
            if question.from == answer.from {
                continue;
            }
            if is_bad_utterance(&question.text, config) || is_bad_utterance(&answer.text, config)
            {
                continue;
            }
            pairs.push(QaPair::new(question.text.clone(), answer.text.clone()));
        }
    }

    tracing::debug!(
        "Paired {} dialogues into {} candidate pairs",
        dialogues.len(),
        pairs.len()
    );
    pairs
}

fn looks_like_noise(text: &str, config: &FilterConfig) -> bool {
    let low = text.to_lowercase();
    if config.reject_urls && low.contains("http") {
        return true;
    }
    alnum_ratio(&low) < config.min_alnum_ratio
}

fn has_tech_signal(text: &str, config: &FilterConfig) -> bool {
    let low = text.to_lowercase();
    config.tech_hints.iter().any(|hint| low.contains(hint.as_str()))
}

/// Normalize and filter pairs, keeping input order. Exact duplicates keep
/// their first occurrence.
pub fn filter_pairs(pairs: Vec<QaPair>, config: &FilterConfig) -> (Vec<QaPair>, FilterStats) {
    let mut stats = FilterStats {
        input: pairs.len(),
        ..Default::default()
    };
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut kept = Vec::new();

    for pair in pairs {
        let query = normalize(&pair.query);
        let answer = normalize(&pair.answer);
        let query_len = query.chars().count();
        let answer_len = answer.chars().count();

        if query_len < config.min_query_len || answer_len < config.min_answer_len {
            stats.too_short += 1;
            continue;
        }
        if query_len > config.max_len || answer_len > config.max_len {
            stats.too_long += 1;
            continue;
        }
        if !answer.chars().any(char::is_alphabetic) {
            stats.no_alphabetic += 1;
            continue;
        }
        if answer.to_lowercase() == query.to_lowercase() {
            stats.echoes_query += 1;
            continue;
        }
        if looks_like_noise(&query, config) || looks_like_noise(&answer, config) {
            stats.noise += 1;
            continue;
        }
        if config.require_tech_signal
            && !has_tech_signal(&query, config)
            && !has_tech_signal(&answer, config)
        {
            stats.no_tech_signal += 1;
            continue;
        }
        if !seen.insert((query.clone(), answer.clone())) {
            stats.duplicates += 1;
            continue;
        }

        kept.push(QaPair::new(query, answer));
    }

    stats.kept = kept.len();
    tracing::info!(
        "Filtered {} pairs: kept {}, dropped {} (short {}, long {}, echo {}, no letters {}, noise {}, off-topic {}, duplicate {})",
        stats.input,
        stats.kept,
        stats.dropped(),
        stats.too_short,
        stats.too_long,
        stats.echoes_query,
        stats.no_alphabetic,
        stats.noise,
        stats.no_tech_signal,
        stats.duplicates
    );

    (kept, stats)
}
