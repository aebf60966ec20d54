//! Query entry point shared by every frontend.
//!
//! A [`RetrievalContext`] bundles one loaded corpus version with the gate,
//! retriever and reranker that serve it. [`Pipeline`] hands each request an
//! `Arc` of the current context, so a context swapped in mid-request never
//! affects that request.

use crate::intent::{IntentAssessment, IntentFilter, Verdict};
use crate::rerank::Reranker;
use crate::retriever::Retriever;
use crate::types::{AskResponse, AskStatus, BuildManifest};
use helpdesk_core::{AppError, AppResult};
use std::sync::{Arc, RwLock};

/// Read-only state for answering questions against one corpus version.
pub struct RetrievalContext {
    retriever: Retriever,
    intent: IntentFilter,
    reranker: Arc<dyn Reranker>,
    top_k: usize,
    min_total_score: f32,
    manifest: Option<BuildManifest>,
}

impl RetrievalContext {
    pub fn new(
        retriever: Retriever,
        intent: IntentFilter,
        reranker: Arc<dyn Reranker>,
        top_k: usize,
        min_total_score: f32,
    ) -> AppResult<Self> {
        if top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        Ok(Self {
            retriever,
            intent,
            reranker,
            top_k,
            min_total_score,
            manifest: None,
        })
    }

    /// Attach the manifest of the build this context was loaded from.
    pub fn with_manifest(mut self, manifest: BuildManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn manifest(&self) -> Option<&BuildManifest> {
        self.manifest.as_ref()
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn intent(&self) -> &IntentFilter {
        &self.intent
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Gate decision with its signals, without retrieving.
    pub fn assess(&self, question: &str) -> IntentAssessment {
        self.intent.assess(question)
    }

    /// Answer one question.
    ///
    /// Order: blank check, intent gate, retrieval, rerank, confidence
    /// threshold. A rejected question never reaches the encoder or index.
    pub async fn ask(&self, question: &str) -> AppResult<AskResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidQuery("question is empty".to_string()));
        }

        if self.intent.classify(question) == Verdict::Reject {
            tracing::info!("Question rejected by intent filter");
            return Ok(AskResponse::rejected());
        }

        let candidates = self.retriever.retrieve(question, self.top_k).await?;
        let candidates = self.reranker.rerank(candidates, question);

        let best_score = candidates.first().and_then(|c| c.rerank_score);
        let low_confidence = match best_score {
            Some(score) => score < self.min_total_score,
            // Without a blended score the nearest pair stands on its own.
            None => candidates.is_empty(),
        };

        let answer = if low_confidence {
            None
        } else {
            candidates.first().map(|c| c.pair.answer.clone())
        };

        tracing::info!(
            "Answered with {} candidates, best score {:?}, low confidence: {}",
            candidates.len(),
            best_score,
            low_confidence
        );

        Ok(AskResponse {
            status: AskStatus::Accepted,
            answer,
            candidates,
            low_confidence,
        })
    }
}

/// Serves questions from a context that can be replaced atomically.
pub struct Pipeline {
    context: RwLock<Arc<RetrievalContext>>,
}

impl Pipeline {
    pub fn new(context: RetrievalContext) -> Self {
        Self {
            context: RwLock::new(Arc::new(context)),
        }
    }

    /// The context new requests are served from.
    pub fn context(&self) -> Arc<RetrievalContext> {
        let guard = self.context.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the context. In-flight requests keep the one they started
    /// with; the previous context is returned.
    pub fn swap_context(&self, context: RetrievalContext) -> Arc<RetrievalContext> {
        let next = Arc::new(context);
        let mut guard = self.context.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, next);

        tracing::info!(
            "Swapped retrieval context (build {:?})",
            guard.manifest().map(|m| m.build_id.as_str())
        );
        previous
    }

    pub async fn ask(&self, question: &str) -> AppResult<AskResponse> {
        let context = self.context();
        context.ask(question).await
    }

    /// Reply shown for questions the intent filter rejects.
    pub fn refusal_message(&self) -> String {
        self.context().intent().refusal_message().to_string()
    }
}
