//! Retrieval core of the helpdesk assistant.
//!
//! Offline: dialogue exports are paired ([`prepare`]), filtered, embedded and
//! written as an immutable build ([`build`]). Online: the published build is
//! loaded into a [`RetrievalContext`] and served through a [`Pipeline`].

pub mod answer;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod embeddings;
pub mod flat_index;
pub mod intent;
pub mod pipeline;
pub mod preprocess;
pub mod progress;
pub mod rerank;
pub mod retriever;
pub mod snapshot;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use corpus::CorpusStore;
pub use embeddings::{EmbeddingConfig, EmbeddingProvider, Encoder};
pub use flat_index::FlatIndex;
pub use intent::{IntentConfig, IntentFilter, Verdict};
pub use pipeline::{Pipeline, RetrievalContext};
pub use preprocess::{FilterConfig, FilterStats};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rerank::{HeuristicReranker, RerankConfig, Reranker};
pub use retriever::Retriever;
pub use types::{
    AskResponse, AskStatus, BaseStats, BuildManifest, BuildOptions, BuildStats, Candidate,
    KnowledgeBaseConfig, PrepareOptions, PrepareStats, QaPair,
};
pub use vector_index::{Metric, Neighbor, VectorIndex};

use chrono::Utc;
use helpdesk_core::{AppConfig, AppError, AppResult};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Turn a raw dialogue export into a `{query, answer}` corpus file.
pub async fn prepare(
    workspace: &Path,
    base_name: &str,
    options: PrepareOptions,
) -> AppResult<PrepareStats> {
    let start = Instant::now();
    let config = config::load_config(workspace, base_name)?;

    tracing::info!("Preparing pairs from {:?}", options.input);

    let read = dataset::read_dialogues(&options.input).await?;
    let messages_read = read.records.len() as u64;
    let dialogues = read
        .records
        .iter()
        .map(|m| m.dialogue_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let pairs = preprocess::pairs_from_dialogues(read.records, &config.filter);
    dataset::write_pairs(&options.output, &pairs).await?;

    tracing::info!(
        "Wrote {} pairs from {} dialogues to {:?}",
        pairs.len(),
        dialogues,
        options.output
    );

    Ok(PrepareStats {
        messages_read,
        dialogues,
        pairs_written: pairs.len() as u64,
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

/// Filter, embed and index a corpus file, then publish it as the current
/// build of the base.
///
/// Nothing already published is touched until the new build is complete on
/// disk; only the previous build is kept after publishing.
pub async fn build(
    workspace: &Path,
    app: &AppConfig,
    options: BuildOptions,
    reporter: &ProgressReporter,
) -> AppResult<BuildStats> {
    let start = Instant::now();
    let base_name = options.base_name.as_str();

    tracing::info!("Starting build for base '{}'", base_name);

    let kb_config = config::load_config(workspace, base_name)?;
    if !config::get_config_path(workspace, base_name).exists() {
        config::save_config(workspace, &kb_config)?;
    }

    // Load
    let read = dataset::read_pairs(&options.input).await?;
    let pairs_read = read.records.len() as u64;
    reporter.load(
        pairs_read,
        read.skipped as u64,
        &options.input.display().to_string(),
    );

    // Filter
    let (mut pairs, filter_stats) = preprocess::filter_pairs(read.records, &kb_config.filter);
    reporter.filter(pairs.len() as u64, pairs_read);
    if pairs.is_empty() {
        return Err(AppError::Knowledge(format!(
            "No pairs left in {:?} after filtering",
            options.input
        )));
    }

    // Embed
    let embedding_config = EmbeddingConfig::from_base(&kb_config).with_app_config(app);
    let encoder = Encoder::from_config(&embedding_config).await?;
    let queries: Vec<String> = pairs.iter().map(|p| p.query.clone()).collect();
    let total = queries.len() as u64;
    let model = encoder.model_name().to_string();
    let vectors = encoder
        .encode_batch(&queries, |done| reporter.embed(done as u64, total, &model))
        .await?;
    for (pair, vector) in pairs.iter_mut().zip(vectors) {
        pair.embedding = Some(vector);
    }

    // Index
    let index = FlatIndex::from_pairs(encoder.dimensions(), kb_config.metric, &pairs)?;
    let corpus = CorpusStore::new(pairs)?;

    let build_id = snapshot::new_build_id();
    let build_dir = config::get_build_dir(workspace, base_name, &build_id);
    index.save(&config::index_file(&build_dir))?;
    corpus.save(&config::meta_file(&build_dir))?;
    reporter.index(index.len() as u64, index.dimensions());

    let manifest = BuildManifest {
        build_id: build_id.clone(),
        built_at: Utc::now(),
        provider: encoder.provider_name().to_string(),
        model,
        dimensions: index.dimensions(),
        metric: index.metric(),
        pair_count: corpus.len(),
        filter: filter_stats.clone(),
    };
    snapshot::write_manifest(&build_dir, &manifest)?;

    // Publish
    let previous = snapshot::read_current(workspace, base_name);
    snapshot::publish(workspace, base_name, &build_id)?;
    reporter.publish(&build_id);

    // Without a readable previous pointer every old build is kept.
    match previous {
        Ok(previous) => {
            let mut keep = vec![build_id.as_str()];
            if let Some(previous) = previous.as_deref() {
                keep.push(previous);
            }
            let pruned = snapshot::prune(workspace, base_name, &keep)?;
            if pruned > 0 {
                tracing::debug!("Pruned {} old builds", pruned);
            }
        }
        Err(e) => {
            tracing::warn!(
                "Skipping prune of old builds, previous CURRENT unreadable: {}",
                e
            );
        }
    }

    let stats = BuildStats {
        build_id,
        pairs_read,
        pairs_indexed: corpus.len() as u64,
        filter: filter_stats,
        dimensions: index.dimensions(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Build '{}' complete: {} pairs indexed in {:.2}s",
        stats.build_id,
        stats.pairs_indexed,
        stats.duration_secs
    );

    Ok(stats)
}

/// Load the published build of a base into a ready-to-serve context.
///
/// Any integrity problem (missing or empty index, checksum failure, count
/// or dimension disagreement, encoder mismatch) fails the load; a context is
/// never built from a partially valid build.
pub async fn load_context(
    workspace: &Path,
    app: &AppConfig,
    base_name: &str,
) -> AppResult<RetrievalContext> {
    let kb_config = config::load_config(workspace, base_name)?;

    let build_id = snapshot::read_current(workspace, base_name)?.ok_or_else(|| {
        AppError::Knowledge(format!(
            "Knowledge base '{}' has no published build. Run `helpdesk build` first.",
            base_name
        ))
    })?;
    let build_dir = config::get_build_dir(workspace, base_name, &build_id);
    let manifest = snapshot::read_manifest(&build_dir)?;

    let index = FlatIndex::load(&config::index_file(&build_dir))?;
    if index.is_empty() {
        return Err(AppError::EmptyIndex);
    }
    if index.len() != manifest.pair_count
        || index.dimensions() != manifest.dimensions
        || index.metric() != manifest.metric
    {
        return Err(AppError::CorruptData(format!(
            "Index of build '{}' does not match its manifest",
            build_id
        )));
    }

    let corpus = CorpusStore::load(&config::meta_file(&build_dir), index.len())?;

    let wanted = EmbeddingConfig::from_base(&kb_config).with_app_config(app);
    EmbeddingConfig::from_manifest(&manifest).validate_consistency(&wanted)?;
    let encoder = Encoder::from_config(&wanted).await?;

    let metric = index.metric();
    let retriever = Retriever::new(encoder, Arc::new(index), Arc::new(corpus))?;
    let intent = IntentFilter::new(&kb_config.intent)?;
    let reranker = HeuristicReranker::new(kb_config.rerank.clone(), metric)?;

    tracing::info!(
        "Loaded build '{}' of base '{}': {} pairs, {} dimensions",
        build_id,
        base_name,
        manifest.pair_count,
        manifest.dimensions
    );

    Ok(RetrievalContext::new(
        retriever,
        intent,
        Arc::new(reranker),
        kb_config.top_k as usize,
        kb_config.min_total_score,
    )?
    .with_manifest(manifest))
}

/// Load the published build and wrap it in a pipeline.
pub async fn open_pipeline(
    workspace: &Path,
    app: &AppConfig,
    base_name: &str,
) -> AppResult<Pipeline> {
    Ok(Pipeline::new(load_context(workspace, app, base_name).await?))
}

/// Reload the published build into a running pipeline. On failure the
/// pipeline keeps serving its current context.
pub async fn reload(
    pipeline: &Pipeline,
    workspace: &Path,
    app: &AppConfig,
    base_name: &str,
) -> AppResult<()> {
    let context = load_context(workspace, app, base_name).await?;
    pipeline.swap_context(context);
    Ok(())
}

/// Remove every build of a base. Returns how many builds were deleted.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<usize> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);

    let base_dir = config::get_base_dir(workspace, base_name);
    if !base_dir.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist",
            base_name
        )));
    }

    let current = config::get_current_path(workspace, base_name);
    if current.exists() {
        std::fs::remove_file(&current)?;
    }
    let removed = snapshot::prune(workspace, base_name, &[])?;

    tracing::info!(
        "Knowledge base '{}' cleaned ({} builds removed)",
        base_name,
        removed
    );
    Ok(removed)
}

/// Describe the published build of a base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    let build_id = snapshot::read_current(workspace, base_name)?.ok_or_else(|| {
        AppError::Knowledge(format!(
            "Knowledge base '{}' has no published build",
            base_name
        ))
    })?;
    let build_dir = config::get_build_dir(workspace, base_name, &build_id);
    let manifest = snapshot::read_manifest(&build_dir)?;

    let file_size = |path: &Path| std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    Ok(BaseStats {
        base_name: base_name.to_string(),
        build_id: manifest.build_id,
        built_at: manifest.built_at,
        provider: manifest.provider,
        model: manifest.model,
        pair_count: manifest.pair_count,
        dimensions: manifest.dimensions,
        metric: manifest.metric,
        index_size_bytes: file_size(&config::index_file(&build_dir)),
        meta_size_bytes: file_size(&config::meta_file(&build_dir)),
    })
}
