//! Ingest command handler.
//!
//! Offline write path: documents to chunks to embeddings to the index.

use super::print_json;
use crate::services::Services;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{IngestOptions, Ingestor, ProgressEvent, ProgressReporter, TextChunker};
use std::path::PathBuf;
use std::sync::Arc;

/// Chunk, embed and index documents
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories (JSONL crawl output, Markdown, HTML, text)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Clear the index before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Vectors per upsert request (default from config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Only ingest paths containing one of these substrings
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip paths containing any of these substrings
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest options: {:?}", self);

        let services = Services::storage(config)?;
        let mut ingestor = Ingestor::new(
            Arc::clone(&services.embedder),
            Arc::clone(&services.index),
            TextChunker::from_settings(&config.chunking),
        );
        if !self.json {
            ingestor = ingestor.with_reporter(ProgressReporter::new(Arc::new(
                |event: &ProgressEvent| eprintln!("{}", event.format_simple()),
            )));
        }

        let options = IngestOptions {
            paths: self.paths.clone(),
            reset: self.reset,
            batch_size: self.batch_size.unwrap_or(config.index.batch_size),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        };

        let stats = ingestor.run(&options).await?;
        let index_stats = services.index.stats().await?;

        if self.json {
            return print_json(&serde_json::json!({
                "ingest": stats,
                "index": index_stats,
            }));
        }

        println!(
            "Ingested {} documents ({} skipped) into {} chunks, {} vectors in {} batches ({} bytes, {:.2}s)",
            stats.documents_count,
            stats.skipped_documents,
            stats.chunks_count,
            stats.vectors_upserted,
            stats.batches,
            stats.bytes_processed,
            stats.duration_secs
        );
        println!(
            "Index ({}): {} vectors",
            index_stats.backend, index_stats.total_vector_count
        );

        Ok(())
    }
}
