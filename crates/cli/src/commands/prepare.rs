//! Prepare command handler.
//!
//! Pairs consecutive turns of a dialogue export into a Q/A pair file.

use clap::Args;
use helpdesk_core::{config::AppConfig, AppResult};
use helpdesk_knowledge::PrepareOptions;
use std::path::PathBuf;

/// Turn a dialogue export into a Q/A pair file
#[derive(Args, Debug)]
pub struct PrepareCommand {
    /// Dialogue JSONL export (`dialogue_id`, `from`, `text`, `date`)
    pub input: PathBuf,

    /// Pair JSONL file to write
    #[arg(short, long, default_value = "pairs.jsonl")]
    pub output: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PrepareCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prepare command for {:?}", self.input);

        let options = PrepareOptions {
            input: self.input.clone(),
            output: self.output.clone(),
        };
        let stats = helpdesk_knowledge::prepare(&config.workspace, &config.base, options).await?;

        if self.json {
            let output = serde_json::json!({
                "output": self.output,
                "messagesRead": stats.messages_read,
                "dialogues": stats.dialogues,
                "pairsWritten": stats.pairs_written,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Wrote {} pairs from {} dialogues ({} messages) to {} in {:.2}s",
                stats.pairs_written,
                stats.dialogues,
                stats.messages_read,
                self.output.display(),
                stats.duration_secs
            );
        }

        Ok(())
    }
}
