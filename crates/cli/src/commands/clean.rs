//! Clean command handler.

use clap::Args;
use helpdesk_core::{config::AppConfig, AppResult};

/// Remove every build of the knowledge base
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command for base '{}'", config.base);

        let removed = helpdesk_knowledge::clean(&config.workspace, &config.base)?;
        println!(
            "Knowledge base '{}' cleaned ({} builds removed)",
            config.base, removed
        );

        Ok(())
    }
}
