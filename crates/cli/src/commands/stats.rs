//! Stats command handler.

use clap::Args;
use reviewqa_chat::history_from_config;
use reviewqa_core::config::{AppConfig, HistoryBackendKind};
use reviewqa_core::AppResult;

/// Show index, history and prompt statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index = reviewqa_knowledge::stats(config).await?;

        // An in-memory history is always empty in a fresh process
        let history = match config.history.backend {
            HistoryBackendKind::Sqlite => Some(history_from_config(config)?.stats().await?),
            HistoryBackendKind::Memory => None,
        };
        let prompts = reviewqa_prompt::list_prompts(&config.workspace)?;

        if self.json {
            let body = serde_json::json!({
                "index": index,
                "history": history,
                "prompts": prompts,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            return Ok(());
        }

        println!("Collection:  {}", index.collection);
        println!("Documents:   {}", index.documents);
        println!("Dimensions:  {}", index.dimensions);
        println!("Index file:  {} ({} bytes)", index.index_path, index.db_size_bytes);
        match history {
            Some(h) => println!("History:     {} sessions, {} turns", h.sessions, h.turns),
            None => println!("History:     in-memory (not persisted)"),
        }
        println!("Prompts:     {}", prompts.join(", "));

        Ok(())
    }
}
