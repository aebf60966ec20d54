//! Chat command handler.
//!
//! Interactive support session. The pipeline keeps no state between
//! questions; the transcript lives here.

use super::{render_debug, render_reply};
use clap::Args;
use helpdesk_core::{config::AppConfig, AppResult};
use helpdesk_knowledge::Pipeline;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Type a question, or /history, /clear, /reload, exit.";

/// Interactive support session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Show the top candidates after each answer
    #[arg(long)]
    pub debug: bool,
}

/// What the session does with one input line.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Empty,
    Exit,
    History,
    Clear,
    Reload,
    Question(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Empty,
        "exit" | "quit" | "/exit" | "/quit" => Input::Exit,
        "/history" => Input::History,
        "/clear" => Input::Clear,
        "/reload" => Input::Reload,
        _ => Input::Question(line),
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting chat session for base '{}'", config.base);

        // A build that fails its integrity checks is never served.
        let pipeline =
            helpdesk_knowledge::open_pipeline(&config.workspace, config, &config.base).await?;

        println!("Ubuntu helpdesk ({}). {}", config.base, HELP);

        let mut history: Vec<(String, String)> = Vec::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                Input::Empty => continue,
                Input::Exit => break,
                Input::History => {
                    if history.is_empty() {
                        println!("(no questions yet)");
                    }
                    for (i, (question, reply)) in history.iter().enumerate() {
                        println!("[{}] you: {}", i + 1, question);
                        println!("{}", reply);
                        println!();
                    }
                }
                Input::Clear => {
                    history.clear();
                    println!("History cleared.");
                }
                Input::Reload => self.reload(&pipeline, config).await,
                Input::Question(question) => {
                    let reply = self.answer(&pipeline, question).await;
                    println!("{}", reply);
                    println!();
                    history.push((question.to_string(), reply));
                }
            }
        }

        tracing::info!("Chat session ended after {} questions", history.len());
        Ok(())
    }

    async fn answer(&self, pipeline: &Pipeline, question: &str) -> String {
        match pipeline.ask(question).await {
            Ok(response) => {
                let mut reply = render_reply(&response, &pipeline.refusal_message());
                if self.debug && !response.candidates.is_empty() {
                    reply.push_str("\n\n");
                    reply.push_str(&render_debug(&response));
                }
                reply
            }
            Err(e) => {
                tracing::error!("Question failed: {}", e);
                e.user_message()
            }
        }
    }

    async fn reload(&self, pipeline: &Pipeline, config: &AppConfig) {
        match helpdesk_knowledge::reload(pipeline, &config.workspace, config, &config.base).await {
            Ok(()) => println!("Reloaded the published build."),
            Err(e) => {
                tracing::warn!("Reload failed, keeping current build: {}", e);
                println!("{}", e.user_message());
            }
        }
    }
}
