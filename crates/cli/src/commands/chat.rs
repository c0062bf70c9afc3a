//! Interactive chat loop over stdin.

use crate::commands::ask::print_sources;
use clap::Args;
use reviewqa_chat::build_orchestrator;
use reviewqa_core::{config::AppConfig, AppResult};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Start an interactive conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Session id (default: a new random session)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Print the reviews each answer was grounded in
    #[arg(long)]
    pub show_sources: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let orchestrator = build_orchestrator(config)?;
        let session_id = self
            .session
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        println!("Session {} (type 'exit' to quit)", session_id);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "exit" || line == "quit" {
                break;
            }

            // A failed turn leaves the history untouched; keep the session open
            match orchestrator.handle_turn_detailed(&session_id, line).await {
                Ok(outcome) => {
                    println!("{}", outcome.answer);
                    if self.show_sources {
                        print_sources(&outcome);
                    }
                }
                Err(e) => eprintln!("error ({}): {}", e.kind(), e),
            }
        }

        Ok(())
    }
}
