//! Health command handler.

use super::print_json;
use crate::services::Services;
use clap::Args;
use ragline_core::{config::AppConfig, AppError, AppResult};
use ragline_knowledge::check_health;

/// Check index, embedder and language model
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        let services = Services::build(config)?;
        let report = check_health(
            services.index.as_ref(),
            services.embedder.as_ref(),
            services.llm.as_deref(),
        )
        .await;

        if self.json {
            print_json(&report)?;
        } else {
            for component in &report.components {
                println!(
                    "{:<10} {:<10} {}",
                    component.name,
                    format!("{:?}", component.status).to_lowercase(),
                    component.detail
                );
            }
        }

        if report.is_healthy() {
            Ok(())
        } else {
            Err(AppError::Other("Health check degraded".to_string()))
        }
    }
}
