//! Question to nearest corpus pairs.

use crate::corpus::CorpusStore;
use crate::embeddings::Encoder;
use crate::types::Candidate;
use crate::vector_index::VectorIndex;
use helpdesk_core::{AppError, AppResult};
use std::sync::Arc;

/// Encodes a question, searches the index and resolves hits to pairs.
#[derive(Clone)]
pub struct Retriever {
    encoder: Encoder,
    index: Arc<dyn VectorIndex>,
    corpus: Arc<CorpusStore>,
}

impl Retriever {
    /// Wire the three parts together.
    ///
    /// Fails with `Encoding` if the encoder's dimensionality differs from the
    /// index, and with `CorruptData` if index and corpus disagree on size.
    pub fn new(
        encoder: Encoder,
        index: Arc<dyn VectorIndex>,
        corpus: Arc<CorpusStore>,
    ) -> AppResult<Self> {
        if encoder.dimensions() != index.dimensions() {
            return Err(AppError::Encoding(format!(
                "Encoder produces {} dimensions but the index holds {}",
                encoder.dimensions(),
                index.dimensions()
            )));
        }

        if index.len() != corpus.len() {
            return Err(AppError::CorruptData(format!(
                "Index holds {} vectors but the corpus holds {} pairs",
                index.len(),
                corpus.len()
            )));
        }

        Ok(Self {
            encoder,
            index,
            corpus,
        })
    }

    /// Up to `k` candidates, nearest first.
    ///
    /// A blank question fails with `InvalidQuery` before the encoder runs.
    pub async fn retrieve(&self, question: &str, k: usize) -> AppResult<Vec<Candidate>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidQuery(
                "question is empty".to_string(),
            ));
        }

        let vector = self.encoder.encode(question).await?;
        self.search(&vector, k)
    }

    /// Search with an already encoded question.
    pub fn search(&self, vector: &[f32], k: usize) -> AppResult<Vec<Candidate>> {
        let neighbors = self.index.search(vector, k)?;

        let candidates = neighbors
            .into_iter()
            .map(|n| {
                let pair = self.corpus.get(n.id)?.clone();
                Ok(Candidate::new(n.id, pair, n.distance))
            })
            .collect::<AppResult<Vec<_>>>()?;

        tracing::debug!(
            "Retrieved {} candidates (k={}), nearest distance {:?}",
            candidates.len(),
            k,
            candidates.first().map(|c| c.distance)
        );

        Ok(candidates)
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn corpus(&self) -> &Arc<CorpusStore> {
        &self.corpus
    }
}
