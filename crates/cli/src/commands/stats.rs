//! Stats command handler.
//!
//! Describes the published build of the knowledge base.

use clap::Args;
use helpdesk_core::{config::AppConfig, AppResult};

/// Show statistics of the published build
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for base '{}'", config.base);

        let stats = helpdesk_knowledge::stats(&config.workspace, &config.base)?;

        if self.json {
            let output = serde_json::json!({
                "base": stats.base_name,
                "buildId": stats.build_id,
                "builtAt": stats.built_at,
                "provider": stats.provider,
                "model": stats.model,
                "pairCount": stats.pair_count,
                "dimensions": stats.dimensions,
                "metric": stats.metric,
                "indexSizeBytes": stats.index_size_bytes,
                "metaSizeBytes": stats.meta_size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Knowledge base: {}", stats.base_name);
            println!("  Build: {} ({})", stats.build_id, stats.built_at);
            println!("  Encoder: {}/{}", stats.provider, stats.model);
            println!("  Pairs: {}", stats.pair_count);
            println!("  Dimensions: {}", stats.dimensions);
            println!("  Metric: {:?}", stats.metric);
            println!("  Index size: {} bytes", stats.index_size_bytes);
            println!("  Metadata size: {} bytes", stats.meta_size_bytes);
        }

        Ok(())
    }
}
