//! Second-pass ordering of retrieved candidates.
//!
//! The retriever ranks by embedding distance only; rerankers reorder that
//! list with other signals. They never add or drop candidates.

use crate::types::Candidate;
use crate::vector_index::Metric;
use helpdesk_core::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

const OVERLAP_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "to", "of", "in", "on", "for", "and", "or", "it", "i",
    "my", "me", "you", "do", "does", "how", "what", "with", "after", "not", "can", "this", "that",
];

/// A reranker reorders candidates for one question.
///
/// Implementations must be deterministic and must return exactly the
/// candidates they were given.
pub trait Reranker: Send + Sync {
    fn rerank(&self, candidates: Vec<Candidate>, question: &str) -> Vec<Candidate>;
}

/// Keeps the retriever's order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

impl Reranker for NoOpReranker {
    fn rerank(&self, candidates: Vec<Candidate>, _question: &str) -> Vec<Candidate> {
        candidates
    }
}

/// Heuristic reranker weights and vocabularies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub w_similarity: f32,
    pub w_quality: f32,
    pub w_overlap: f32,

    /// Chat-noise regexes; any match makes the answer score `noise_penalty`
    pub noise_patterns: Vec<String>,
    pub noise_penalty: f32,

    /// Technical vocabulary; each one present adds `hint_bonus`
    pub quality_hints: Vec<String>,
    pub hint_bonus: f32,

    /// Instructional words; any present adds `step_bonus` once
    pub step_words: Vec<String>,
    pub step_bonus: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            w_similarity: 1.0,
            w_quality: 1.0,
            w_overlap: 0.5,
            noise_patterns: [
                r"#\w+",
                r"\bjoin\b",
                r"\birssi\b",
                r"\blol\b",
                r"\bpm me\b",
                r"\bgoogle it\b",
                r"\bask on\b",
                r"\bwrong channel\b",
                r"\bask in\b",
                r"\bgo to #\b",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            noise_penalty: -2.0,
            quality_hints: [
                "sudo",
                "apt",
                "apt-get",
                "dpkg",
                "systemctl",
                "service",
                "nmcli",
                "ifconfig",
                "iwconfig",
                "lspci",
                "lsusb",
                "modprobe",
                "dmesg",
                "/etc/",
                "reboot",
                "restart",
                "update",
                "upgrade",
                "install",
                "purge",
                "remove",
                "networkmanager",
                "netplan",
                "rfkill",
                "error",
                "failed",
                "dependency",
                "dependencies",
                "kernel",
                "driver",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            hint_bonus: 0.25,
            step_words: [
                "try", "run", "check", "edit", "open", "type", "command", "reboot", "restart",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            step_bonus: 0.3,
        }
    }
}

/// Signals behind one candidate's blended score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankSignals {
    /// Embedding similarity derived from distance (1.0 = identical)
    pub similarity: f32,
    /// Answer informativeness
    pub quality: f32,
    /// Jaccard overlap between question words and the pair's words
    pub overlap: f32,
}

/// Weighted blend of similarity, answer quality and lexical overlap.
#[derive(Debug, Clone)]
pub struct HeuristicReranker {
    config: RerankConfig,
    metric: Metric,
    noise: Vec<Regex>,
    stop_words: HashSet<&'static str>,
}

impl HeuristicReranker {
    pub fn new(config: RerankConfig, metric: Metric) -> AppResult<Self> {
        let noise = config
            .noise_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    AppError::Config(format!("Invalid noise pattern '{}': {}", p, e))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            config,
            metric,
            noise,
            stop_words: OVERLAP_STOP_WORDS.iter().copied().collect(),
        })
    }

    /// Informativeness of an answer.
    pub fn answer_quality(&self, answer: &str) -> f32 {
        let a = answer.trim().to_lowercase();

        if self.noise.iter().any(|p| p.is_match(&a)) {
            return self.config.noise_penalty;
        }

        let mut score = 0.0;

        for hint in &self.config.quality_hints {
            if a.contains(hint.as_str()) {
                score += self.config.hint_bonus;
            }
        }

        let len = a.chars().count();
        if (30..=350).contains(&len) {
            score += 0.5;
        } else if len < 15 {
            score -= 0.5;
        } else if len > 600 {
            score -= 0.3;
        }

        if self.config.step_words.iter().any(|w| a.contains(w.as_str())) {
            score += self.config.step_bonus;
        }

        score
    }

    fn words<'a>(&self, text: &'a str) -> HashSet<&'a str> {
        text.unicode_words()
            .filter(|w| w.chars().count() > 1 && !self.stop_words.contains(w))
            .collect()
    }

    /// Jaccard index between the question's words and the pair's words.
    pub fn lexical_overlap(&self, question: &str, matched_query: &str, answer: &str) -> f32 {
        let question = question.to_lowercase();
        let pair_text = format!("{} {}", matched_query, answer).to_lowercase();

        let q = self.words(&question);
        let p = self.words(&pair_text);
        if q.is_empty() || p.is_empty() {
            return 0.0;
        }

        let shared = q.intersection(&p).count();
        let union = q.union(&p).count();
        shared as f32 / union as f32
    }

    /// Compute the signals for one candidate.
    pub fn signals(&self, candidate: &Candidate, question: &str) -> RerankSignals {
        RerankSignals {
            similarity: self.metric.similarity(candidate.distance),
            quality: self.answer_quality(&candidate.pair.answer),
            overlap: self.lexical_overlap(question, &candidate.pair.query, &candidate.pair.answer),
        }
    }

    fn blend(&self, signals: &RerankSignals) -> f32 {
        self.config.w_similarity * signals.similarity
            + self.config.w_quality * signals.quality
            + self.config.w_overlap * signals.overlap
    }
}

impl Reranker for HeuristicReranker {
    fn rerank(&self, mut candidates: Vec<Candidate>, question: &str) -> Vec<Candidate> {
        for candidate in &mut candidates {
            let signals = self.signals(candidate, question);
            candidate.rerank_score = Some(self.blend(&signals));
            candidate.signals = Some(signals);
        }

        // Stable: equal scores keep the incoming distance order.
        candidates.sort_by(|a, b| {
            let a = a.rerank_score.unwrap_or(f32::NEG_INFINITY);
            let b = b.rerank_score.unwrap_or(f32::NEG_INFINITY);
            b.total_cmp(&a)
        });

        if let Some(best) = candidates.first() {
            tracing::debug!(
                "Reranked {} candidates, best id {} score {:.3}",
                candidates.len(),
                best.id,
                best.rerank_score.unwrap_or_default()
            );
        }

        candidates
    }
}
