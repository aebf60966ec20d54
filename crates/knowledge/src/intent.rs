//! Topic gate in front of retrieval.
//!
//! A question passes when it mentions one of the configured domain keywords
//! or, failing that, matches enough of the configured technical patterns.
//! The filter holds no per-call state.

use helpdesk_core::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Endings a question word may add to a plain keyword.
const INFLECTIONS: &[&str] = &[
    "s", "es", "d", "ed", "ing", "er", "ers", "ation", "ations", "'s",
];

/// Whether `word` is `keyword` or an inflection of it. A trailing "e" may
/// be dropped before the ending ("update" matches "updating").
fn is_inflection_of(word: &str, keyword: &str) -> bool {
    let Some(rest) = word.strip_prefix(keyword).or_else(|| {
        keyword
            .strip_suffix('e')
            .and_then(|stem| word.strip_prefix(stem))
            .filter(|rest| rest.starts_with('i') || rest.starts_with('a'))
    }) else {
        return false;
    };
    rest.is_empty() || INFLECTIONS.contains(&rest)
}

/// Intent gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Domain vocabulary. Plain words match a whole word of the question or
    /// one of its inflections ("drivers", "mounted", "upgrading"); keywords
    /// containing other characters ("apt-get", "wi-fi") match as substrings.
    pub keywords: Vec<String>,

    /// Regexes for technical shapes (paths, flags, error codes)
    pub patterns: Vec<String>,

    /// Share of `patterns` a keyword-free question must match to pass
    pub min_confidence: f32,

    /// Reply shown for rejected questions
    pub refusal_message: String,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "ubuntu",
                "linux",
                "apt",
                "apt-get",
                "dpkg",
                "sudo",
                "kernel",
                "grub",
                "wifi",
                "wi-fi",
                "wireless",
                "network",
                "nmcli",
                "bluetooth",
                "nvidia",
                "driver",
                "install",
                "update",
                "upgrade",
                "error",
                "failed",
                "package",
                "terminal",
                "bash",
                "permission",
                "mount",
                "disk",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            patterns: [
                r"(^|\s)/(etc|usr|var|dev|boot|home|proc|sys|opt)/",
                r"(^|\s)--?[a-z][a-z-]*\b",
                r"\b[\w.-]+\.(conf|service|deb|sh|log|list|img|iso)\b",
                r"\b(errno|code|exit status)\s*[:=]?\s*-?\d+\b|\b0x[0-9a-f]{2,}\b",
                r"\b(ls|cd|cat|grep|chmod|chown|systemctl|journalctl|dmesg|lsusb|lspci|modprobe)\b",
                r"\b\d+\.\d{2}(\.\d+)?\b",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_confidence: 0.3,
            refusal_message: "I can only help with Ubuntu / Linux technical support questions. \
                              Try asking something like: 'wifi not working after update' or \
                              'apt-get update failed'."
                .to_string(),
        }
    }
}

/// Gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Accept,
    Reject,
}

/// Why a verdict was reached, for debug output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentAssessment {
    pub verdict: Verdict,
    pub keyword_hits: Vec<String>,
    /// Share of patterns matched, in `[0, 1]`
    pub confidence: f32,
}

/// Compiled intent gate.
#[derive(Debug, Clone)]
pub struct IntentFilter {
    word_keywords: Vec<String>,
    substring_keywords: Vec<String>,
    patterns: Vec<Regex>,
    min_confidence: f32,
    refusal_message: String,
}

impl IntentFilter {
    /// Compile a filter. Invalid patterns are a configuration error.
    pub fn new(config: &IntentConfig) -> AppResult<Self> {
        let (word_keywords, substring_keywords): (Vec<String>, Vec<String>) = config
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .partition(|k| k.chars().all(char::is_alphanumeric));

        let patterns = config
            .patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){}", p)).map_err(|e| {
                    AppError::Config(format!("Invalid intent pattern '{}': {}", p, e))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            word_keywords,
            substring_keywords,
            patterns,
            min_confidence: config.min_confidence,
            refusal_message: config.refusal_message.clone(),
        })
    }

    /// Accept or reject a question.
    pub fn classify(&self, question: &str) -> Verdict {
        self.assess(question).verdict
    }

    /// Classify and report the signals behind the verdict.
    pub fn assess(&self, question: &str) -> IntentAssessment {
        let lower = question.to_lowercase();
        let words: Vec<&str> = lower.unicode_words().collect();

        let mut keyword_hits: Vec<String> = self
            .word_keywords
            .iter()
            .filter(|k| words.iter().any(|w| is_inflection_of(w, k)))
            .cloned()
            .collect();
        keyword_hits.extend(
            self.substring_keywords
                .iter()
                .filter(|k| lower.contains(k.as_str()))
                .cloned(),
        );

        let confidence = if self.patterns.is_empty() {
            0.0
        } else {
            let matched = self.patterns.iter().filter(|p| p.is_match(&lower)).count();
            matched as f32 / self.patterns.len() as f32
        };

        let verdict = if keyword_hits.is_empty() && confidence < self.min_confidence {
            Verdict::Reject
        } else {
            Verdict::Accept
        };

        tracing::debug!(
            "Intent {:?}: keywords={:?} confidence={:.2}",
            verdict,
            keyword_hits,
            confidence
        );

        IntentAssessment {
            verdict,
            keyword_hits,
            confidence,
        }
    }

    pub fn refusal_message(&self) -> &str {
        &self.refusal_message
    }
}
