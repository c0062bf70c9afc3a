//! Ingest command handler.

use clap::Args;
use reviewqa_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// Load review records (CSV or JSON Lines with `review` and `product_title`)
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Path to the .csv or .jsonl review file
    pub file: PathBuf,

    /// Remove existing documents from the collection first
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest options: {:?}", self);

        let stats = reviewqa_knowledge::ingest_file(config, &self.file, self.reset).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Indexed {} of {} records into '{}' ({} skipped) in {:.2}s",
                stats.documents_indexed,
                stats.records_read,
                config.retrieval.collection,
                stats.skipped,
                stats.duration_secs
            );
        }

        Ok(())
    }
}
