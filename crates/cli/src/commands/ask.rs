//! Ask command handler.
//!
//! Answers one question against the published build of the knowledge base.

use super::{render_debug, render_reply};
use clap::Args;
use helpdesk_core::{config::AppConfig, AppError, AppResult};

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Show the top candidates with their scores
    #[arg(long)]
    pub debug: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for base '{}'", config.base);

        let question = self.question.join(" ");
        tracing::debug!("Question: {}", question);

        // A blank question is answered with a rephrase prompt, not a failure.
        if question.trim().is_empty() {
            println!("{}", AppError::InvalidQuery(question).user_message());
            return Ok(());
        }

        let pipeline =
            helpdesk_knowledge::open_pipeline(&config.workspace, config, &config.base).await?;

        let response = match pipeline.ask(&question).await {
            Ok(response) => response,
            Err(e @ AppError::InvalidQuery(_)) => {
                tracing::debug!("Question not asked: {}", e);
                println!("{}", e.user_message());
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let reply = render_reply(&response, &pipeline.refusal_message());

        if self.json {
            let output = serde_json::json!({
                "question": question,
                "reply": reply,
                "response": response,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", reply);
        if self.debug && !response.candidates.is_empty() {
            println!();
            println!("{}", render_debug(&response));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(words: &[&str]) -> AskCommand {
        AskCommand {
            question: words.iter().map(|w| w.to_string()).collect(),
            debug: false,
            json: false,
        }
    }

    #[tokio::test]
    async fn test_blank_question_is_handled() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..Default::default()
        };

        // No build exists, so reaching the pipeline would fail.
        assert!(command(&["   "]).execute(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_build_reports_guidance() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..Default::default()
        };

        let err = command(&["wifi", "drops"])
            .execute(&config)
            .await
            .unwrap_err();
        assert!(err.user_message().contains("helpdesk build"));
    }
}
