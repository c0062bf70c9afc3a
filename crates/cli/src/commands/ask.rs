//! Ask command handler.
//!
//! Runs a single conversation turn. With a durable history backend, passing
//! the same `--session` across invocations continues a conversation.

use clap::Args;
use reviewqa_chat::{build_orchestrator, TurnOutcome};
use reviewqa_core::{config::AppConfig, AppError, AppResult};

/// Ask one question about the indexed products
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Session id (default: a new random session)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the reviews the answer was grounded in
    #[arg(long)]
    pub show_sources: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let session_id = self
            .session
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let result = match build_orchestrator(config) {
            Ok(orchestrator) => {
                orchestrator
                    .handle_turn_detailed(&session_id, &self.question)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) if self.json => {
                let body = outcome_json(&session_id, &outcome);
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(())
            }
            Ok(outcome) => {
                println!("{}", outcome.answer);
                if self.show_sources {
                    print_sources(&outcome);
                }
                Ok(())
            }
            Err(e) if self.json => {
                println!("{}", serde_json::to_string_pretty(&error_json(&e))?);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn print_sources(outcome: &TurnOutcome) {
    if outcome.context.is_empty() {
        println!("\n(no matching reviews)");
        return;
    }

    println!("\nSources (query: {}):", outcome.standalone_query);
    for (i, scored) in outcome.context.documents.iter().enumerate() {
        println!(
            "  {}. [{}] ({:.2}) {}",
            i + 1,
            scored.document.metadata.product_name,
            scored.score,
            scored.document.content
        );
    }
}

fn outcome_json(session_id: &str, outcome: &TurnOutcome) -> serde_json::Value {
    let sources: Vec<serde_json::Value> = outcome
        .context
        .documents
        .iter()
        .map(|scored| {
            serde_json::json!({
                "productName": scored.document.metadata.product_name,
                "content": scored.document.content,
                "score": scored.score,
            })
        })
        .collect();

    serde_json::json!({
        "sessionId": session_id,
        "answer": outcome.answer,
        "query": outcome.standalone_query,
        "sources": sources,
    })
}

fn error_json(error: &AppError) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
        }
    })
}
