//! Vector index abstraction for corpus embeddings.
//!
//! Identifiers are offsets into the corpus store. Implementations are
//! read-only once built and shared between concurrent queries.

use helpdesk_core::AppResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Distance function used by an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// `1 - cos(a, b)`, in `[0, 2]`
    #[default]
    Cosine,
    /// Squared Euclidean distance
    L2,
}

impl Metric {
    /// Distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
            Metric::L2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum(),
        }
    }

    /// Map a distance to a similarity where 1.0 means identical.
    ///
    /// For `L2` this assumes unit-length embeddings, where the squared
    /// distance lies in `[0, 4]`.
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            Metric::Cosine => 1.0 - distance,
            Metric::L2 => 1.0 - distance / 2.0,
        }
    }

    pub(crate) fn as_byte(&self) -> u8 {
        match self {
            Metric::Cosine => 0,
            Metric::L2 => 1,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Metric::Cosine),
            1 => Some(Metric::L2),
            _ => None,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::L2 => write!(f, "l2"),
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Offset into the corpus store
    pub id: usize,
    /// Distance to the query (lower is closer)
    pub distance: f32,
}

impl Neighbor {
    /// Ascending distance, then ascending id.
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Trait for vector index backends.
///
/// Implementations must:
/// - return at most `k` neighbors ordered by [`Neighbor::cmp_rank`]
/// - fail with `AppError::EmptyIndex` when holding no vectors
/// - never mutate state on search
pub trait VectorIndex: Send + Sync {
    /// Search for the `k` nearest vectors to `query`.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Neighbor>>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality of indexed vectors.
    fn dimensions(&self) -> usize;

    /// Distance function of the index.
    fn metric(&self) -> Metric;
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
