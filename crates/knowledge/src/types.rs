//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::intent::IntentConfig;
use crate::preprocess::{FilterConfig, FilterStats};
use crate::rerank::{RerankConfig, RerankSignals};
use crate::vector_index::Metric;

/// Configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    pub name: String,

    /// Embedding provider ("trigram", "ollama")
    pub provider: String,

    /// Embedding model
    pub model: String,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: u32,

    /// Upper bound for a single encoder call
    #[serde(default = "default_encode_timeout_ms")]
    pub encode_timeout_ms: u64,

    /// Number of neighbors fetched per question
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Distance used by the index
    #[serde(default)]
    pub metric: Metric,

    /// Best blended score below which no answer is given
    #[serde(default = "default_min_total_score")]
    pub min_total_score: f32,

    #[serde(default)]
    pub intent: IntentConfig,

    #[serde(default)]
    pub rerank: RerankConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

fn default_embedding_dim() -> u32 {
    384
}

fn default_encode_timeout_ms() -> u64 {
    30_000
}

fn default_top_k() -> u32 {
    20
}

fn default_min_total_score() -> f32 {
    1.10
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            embedding_dim: default_embedding_dim(),
            encode_timeout_ms: default_encode_timeout_ms(),
            top_k: default_top_k(),
            metric: Metric::default(),
            min_total_score: default_min_total_score(),
            intent: IntentConfig::default(),
            rerank: RerankConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

/// One corpus entry: a historical question and the answer it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    /// Historical user question (trimmed, non-empty)
    pub query: String,

    /// Accepted answer (non-empty)
    pub answer: String,

    /// Embedding of `query`, present only while building
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl QaPair {
    /// Create a pair without an embedding.
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
            embedding: None,
        }
    }
}

/// A corpus pair retrieved for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Offset of the pair in the corpus store
    pub id: usize,

    /// The retrieved pair
    pub pair: QaPair,

    /// Embedding-space distance (lower is closer)
    pub distance: f32,

    /// Blended score assigned by the reranker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,

    /// Individual reranking signals, for debug output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<RerankSignals>,
}

impl Candidate {
    pub fn new(id: usize, pair: QaPair, distance: f32) -> Self {
        Self {
            id,
            pair,
            distance,
            rerank_score: None,
            signals: None,
        }
    }
}

/// Outcome of the intent gate for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AskStatus {
    Accepted,
    Rejected,
}

/// Response of the query interface consumed by every frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub status: AskStatus,

    /// Best answer; `None` when rejected or when no candidate is confident enough
    pub answer: Option<String>,

    /// Candidates in reranked order (empty when rejected)
    pub candidates: Vec<Candidate>,

    /// Whether the best blended score fell below the configured threshold
    pub low_confidence: bool,
}

impl AskResponse {
    /// Response for a question refused by the intent filter.
    pub fn rejected() -> Self {
        Self {
            status: AskStatus::Rejected,
            answer: None,
            candidates: Vec::new(),
            low_confidence: false,
        }
    }

    /// The top-ranked candidate, if any.
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Options for the prepare operation (raw dialogues to pairs).
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Dialogue JSONL input
    pub input: PathBuf,

    /// Pair JSONL output
    pub output: PathBuf,
}

/// Statistics from a prepare operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareStats {
    pub messages_read: u64,
    pub dialogues: u64,
    pub pairs_written: u64,
    pub duration_secs: f64,
}

/// Options for the build operation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Knowledge base name
    pub base_name: String,

    /// Pair JSONL corpus
    pub input: PathBuf,
}

/// Statistics from a build operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    pub build_id: String,
    pub pairs_read: u64,
    pub pairs_indexed: u64,
    pub filter: FilterStats,
    pub dimensions: usize,
    pub duration_secs: f64,
}

/// Description of a published build, stored as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub build_id: String,
    pub built_at: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub metric: Metric,
    pub pair_count: usize,
    pub filter: FilterStats,
}

/// Statistics for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    pub base_name: String,
    pub build_id: String,
    pub built_at: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub pair_count: usize,
    pub dimensions: usize,
    pub metric: Metric,
    pub index_size_bytes: u64,
    pub meta_size_bytes: u64,
}
