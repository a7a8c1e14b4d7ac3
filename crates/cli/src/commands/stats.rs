//! Stats command handler.
//!
//! Prints vector index statistics.

use super::print_json;
use crate::services::Services;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};

/// Show vector index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let services = Services::storage(config)?;
        let stats = services.index.stats().await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Backend:    {}", stats.backend);
        println!("Vectors:    {}", stats.total_vector_count);
        match stats.dimension {
            Some(dim) => println!("Dimension:  {}", dim),
            None => println!("Dimension:  unknown"),
        }
        if let Some(fullness) = stats.index_fullness {
            println!("Fullness:   {:.1}%", fullness * 100.0);
        }
        for (namespace, count) in &stats.namespaces {
            let name = if namespace.is_empty() { "(default)" } else { namespace.as_str() };
            println!("Namespace:  {} ({} vectors)", name, count);
        }

        Ok(())
    }
}
