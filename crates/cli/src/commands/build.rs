//! Build command handler.
//!
//! Filters, embeds and indexes a pair file, then publishes it as the
//! current build of the knowledge base.

use clap::Args;
use helpdesk_core::{config::AppConfig, AppResult};
use helpdesk_knowledge::{BuildOptions, FilterStats, ProgressEvent, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Filter, embed and publish a Q/A pair file
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Pair JSONL file (`query`, `answer`)
    pub input: PathBuf,

    /// Do not print progress
    #[arg(short, long)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn filter_report(stats: &FilterStats) -> String {
    let rules = [
        ("too short", stats.too_short),
        ("too long", stats.too_long),
        ("echoes the question", stats.echoes_query),
        ("no letters", stats.no_alphabetic),
        ("noise", stats.noise),
        ("off-topic", stats.no_tech_signal),
        ("duplicate", stats.duplicates),
    ];

    let mut lines = vec![format!(
        "Filter: kept {} of {} pairs",
        stats.kept, stats.input
    )];
    for (rule, count) in rules.iter().filter(|(_, count)| *count > 0) {
        lines.push(format!("  dropped {:>6}  {}", count, rule));
    }
    lines.join("\n")
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing build command for base '{}'", config.base);

        let reporter = if self.quiet || self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple());
            }))
        };

        let options = BuildOptions {
            base_name: config.base.clone(),
            input: self.input.clone(),
        };
        let stats =
            helpdesk_knowledge::build(&config.workspace, config, options, &reporter).await?;

        if self.json {
            let output = serde_json::json!({
                "base": config.base,
                "buildId": stats.build_id,
                "pairsRead": stats.pairs_read,
                "pairsIndexed": stats.pairs_indexed,
                "dimensions": stats.dimensions,
                "filter": stats.filter,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", filter_report(&stats.filter));
            println!(
                "Published build {} of '{}': {} pairs, {} dimensions in {:.2}s",
                stats.build_id,
                config.base,
                stats.pairs_indexed,
                stats.dimensions,
                stats.duration_secs
            );
        }

        Ok(())
    }
}
