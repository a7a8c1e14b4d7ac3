//! Command handlers for the ragline CLI.

pub mod ask;
pub mod chat;
pub mod health;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use health::HealthCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use ragline_core::{AppError, AppResult};
use ragline_knowledge::RagResponse;
use serde::Serialize;

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Answer followed by numbered citations.
pub(crate) fn print_response(response: &RagResponse) {
    println!("{}", response.answer);

    if response.sources.is_empty() {
        return;
    }

    println!();
    println!("Sources:");
    for (i, source) in response.sources.iter().enumerate() {
        match source.title {
            Some(ref title) => println!("  [{}] {}\n      {}", i + 1, title, source.url),
            None => println!("  [{}] {}", i + 1, source.url),
        }
    }
}
