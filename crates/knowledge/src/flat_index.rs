//! Exact flat vector index with a binary on-disk format.
//!
//! File layout (little-endian):
//!
//! ```text
//! "HDIX" | version u32 | metric u8 | dimensions u32 | count u64 | count*dimensions f32 | sha256
//! ```

use crate::types::QaPair;
use crate::vector_index::{Metric, Neighbor, VectorIndex};
use helpdesk_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 4] = b"HDIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 1 + 4 + 8;
const CHECKSUM_LEN: usize = 32;

/// Brute-force index over row-major embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    metric: Metric,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from precomputed embeddings; row `i` gets identifier `i`.
    pub fn build(dimensions: usize, metric: Metric, embeddings: &[Vec<f32>]) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Config(
                "Index dimensions must be greater than zero".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(embeddings.len() * dimensions);
        for (id, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimensions {
                return Err(AppError::Knowledge(format!(
                    "Embedding dimension mismatch at {}: expected {}, got {}",
                    id,
                    dimensions,
                    embedding.len()
                )));
            }
            data.extend_from_slice(embedding);
        }

        tracing::debug!(
            "Built flat index: {} vectors, {} dimensions, metric {}",
            embeddings.len(),
            dimensions,
            metric
        );

        Ok(Self {
            dimensions,
            metric,
            data,
        })
    }

    /// Build an index from corpus pairs carrying their query embeddings.
    pub fn from_pairs(dimensions: usize, metric: Metric, pairs: &[QaPair]) -> AppResult<Self> {
        let embeddings = pairs
            .iter()
            .enumerate()
            .map(|(id, pair)| {
                pair.embedding.clone().ok_or_else(|| {
                    AppError::Knowledge(format!("Pair {} is missing its embedding", id))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Self::build(dimensions, metric, &embeddings)
    }

    /// Embedding stored under `id`.
    pub fn vector(&self, id: usize) -> Option<&[f32]> {
        let start = id.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    /// Persist the index. The file is written next to `path` and renamed into
    /// place, so readers never see a partial file.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4 + CHECKSUM_LEN);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.push(self.metric.as_byte());
        bytes.extend_from_slice(&(self.dimensions as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&embedding_to_bytes(&self.data));

        let checksum = Sha256::digest(&bytes);
        bytes.extend_from_slice(&checksum);

        let tmp_path = path.with_extension("bin.tmp");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, path)?;

        tracing::debug!("Saved flat index to {:?} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Load an index written by [`FlatIndex::save`].
    pub fn load(path: &Path) -> AppResult<Self> {
        let bytes = fs::read(path).map_err(|e| {
            AppError::CorruptData(format!("Failed to read index file {:?}: {}", path, e))
        })?;

        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(AppError::CorruptData(format!(
                "Index file {:?} is truncated",
                path
            )));
        }

        let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if Sha256::digest(body).as_slice() != checksum {
            return Err(AppError::CorruptData(format!(
                "Index file {:?} failed checksum verification",
                path
            )));
        }

        if &body[0..4] != MAGIC {
            return Err(AppError::CorruptData(format!(
                "{:?} is not an index file",
                path
            )));
        }

        let version = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
        if version != FORMAT_VERSION {
            return Err(AppError::CorruptData(format!(
                "Unsupported index format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        let metric = Metric::from_byte(body[8]).ok_or_else(|| {
            AppError::CorruptData(format!("Unknown metric tag {} in index", body[8]))
        })?;
        let dimensions = u32::from_le_bytes([body[9], body[10], body[11], body[12]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&body[13..21]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        if dimensions == 0 {
            return Err(AppError::CorruptData(
                "Index declares zero dimensions".to_string(),
            ));
        }

        let payload = &body[HEADER_LEN..];
        let expected = count
            .checked_mul(dimensions)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| AppError::CorruptData("Index header overflows".to_string()))?;
        if payload.len() != expected {
            return Err(AppError::CorruptData(format!(
                "Index payload holds {} bytes, header declares {} vectors of {} dimensions",
                payload.len(),
                count,
                dimensions
            )));
        }

        let data = bytes_to_embedding(payload)?;

        tracing::debug!(
            "Loaded flat index from {:?}: {} vectors, {} dimensions",
            path,
            count,
            dimensions
        );

        Ok(Self {
            dimensions,
            metric,
            data,
        })
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        if self.is_empty() {
            return Err(AppError::EmptyIndex);
        }

        if query.len() != self.dimensions {
            return Err(AppError::Encoding(format!(
                "Query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(id, vector)| Neighbor {
                id,
                distance: self.metric.distance(query, vector),
            })
            .collect();

        if hits.len() > k {
            hits.select_nth_unstable_by(k - 1, Neighbor::cmp_rank);
            hits.truncate(k);
        }
        hits.sort_by(Neighbor::cmp_rank);

        Ok(hits)
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn metric(&self) -> Metric {
        self.metric
    }
}

/// Convert embedding values to little-endian bytes for storage.
fn embedding_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for &value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert little-endian bytes back to embedding values.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::CorruptData(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
