//! Crate-level scenario tests and shared fixtures.

mod build_flow;
mod pipeline_scenarios;

use crate::corpus::CorpusStore;
use crate::embeddings::providers::trigram::TrigramProvider;
use crate::embeddings::{EmbeddingProvider, Encoder};
use crate::flat_index::FlatIndex;
use crate::intent::{IntentConfig, IntentFilter};
use crate::pipeline::RetrievalContext;
use crate::rerank::{HeuristicReranker, RerankConfig};
use crate::retriever::Retriever;
use crate::types::QaPair;
use crate::vector_index::{Metric, Neighbor, VectorIndex};
use helpdesk_core::AppResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DIMS: usize = 384;

/// Ubuntu support pairs used across scenarios.
pub(crate) fn support_pairs() -> Vec<QaPair> {
    vec![
        QaPair::new(
            "wifi driver not detected after kernel update",
            "run sudo apt-get install --reinstall bcmwl-kernel-source then reboot",
        ),
        QaPair::new(
            "sound not working on ubuntu",
            "open alsamixer in a terminal and unmute the master channel",
        ),
        QaPair::new(
            "grub rescue prompt after installing windows",
            "boot a live usb and run sudo update-grub after mounting the root partition",
        ),
        QaPair::new(
            "nvidia screen resolution stuck at 800x600",
            "install the proprietary nvidia driver from additional drivers then restart",
        ),
        QaPair::new(
            "apt-get update fails with hash sum mismatch",
            "sudo rm -rf /var/lib/apt/lists/* then run sudo apt-get update again",
        ),
        QaPair::new(
            "bluetooth headset connects but no audio",
            "select the a2dp profile in sound settings and restart pulseaudio",
        ),
    ]
}

/// Provider that counts how often it is asked to embed.
#[derive(Debug)]
pub(crate) struct CountingProvider {
    inner: TrigramProvider,
    pub calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            inner: TrigramProvider::new(DIMS),
            calls,
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for CountingProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Index that counts searches.
pub(crate) struct CountingIndex {
    inner: FlatIndex,
    pub searches: Arc<AtomicUsize>,
}

impl VectorIndex for CountingIndex {
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(query, k)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn metric(&self) -> Metric {
        self.inner.metric()
    }
}

/// Call counters of a fixture context.
#[derive(Clone, Default)]
pub(crate) struct Counters {
    pub encodes: Arc<AtomicUsize>,
    pub searches: Arc<AtomicUsize>,
}

impl Counters {
    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

/// Build an in-memory context over `pairs` with counting encoder and index.
pub(crate) async fn counted_context(
    pairs: Vec<QaPair>,
    top_k: usize,
    min_total_score: f32,
) -> (RetrievalContext, Counters) {
    let counters = Counters::default();

    let texts: Vec<String> = pairs.iter().map(|p| p.query.clone()).collect();
    let vectors = TrigramProvider::new(DIMS).embed_batch(&texts).await.unwrap();
    let index = CountingIndex {
        inner: FlatIndex::build(DIMS, Metric::Cosine, &vectors).unwrap(),
        searches: counters.searches.clone(),
    };

    let encoder = Encoder::new(
        Arc::new(CountingProvider::new(counters.encodes.clone())),
        Duration::from_secs(5),
    );
    let retriever = Retriever::new(
        encoder,
        Arc::new(index),
        Arc::new(CorpusStore::new(pairs).unwrap()),
    )
    .unwrap();

    let context = RetrievalContext::new(
        retriever,
        IntentFilter::new(&IntentConfig::default()).unwrap(),
        Arc::new(HeuristicReranker::new(RerankConfig::default(), Metric::Cosine).unwrap()),
        top_k,
        min_total_score,
    )
    .unwrap();

    (context, counters)
}
