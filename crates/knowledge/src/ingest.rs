//! Offline ingestion: documents to chunks to embeddings to index.

use crate::chunker::TextChunker;
use crate::embeddings::EmbeddingProvider;
use crate::parser::{collect_files, load_documents};
use crate::progress::{Phase, ProgressReporter};
use crate::types::{IndexedVector, IngestOptions, IngestStats, Metadata, SourceDocument};
use crate::vector_index::VectorIndex;
use ragline_core::{AppError, AppResult};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;

/// Writes documents into a vector index.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: TextChunker,
    reporter: ProgressReporter,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chunker: TextChunker,
    ) -> Self {
        Self {
            embedder,
            index,
            chunker,
            reporter: ProgressReporter::noop(),
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Load every file under `options.paths` and index it.
    pub async fn run(&self, options: &IngestOptions) -> AppResult<IngestStats> {
        let started = Instant::now();
        let files = collect_files(&options.paths, &options.include, &options.exclude)?;
        tracing::info!("Ingesting {} files", files.len());

        let mut documents = Vec::new();
        let mut skipped = 0;
        let mut bytes = 0;
        for (i, file) in files.iter().enumerate() {
            let loaded = load_documents(file)?;
            skipped += loaded.skipped;
            bytes += loaded.bytes;
            documents.extend(loaded.documents);
            self.reporter.emit(
                Phase::Load,
                i as u64 + 1,
                Some(files.len() as u64),
                file.display().to_string(),
            );
        }

        let mut stats = self.ingest_documents(&documents, options).await?;
        stats.skipped_documents += skipped;
        stats.bytes_processed = bytes;
        stats.duration_secs = started.elapsed().as_secs_f64();

        tracing::info!(
            "Ingested {} documents into {} chunks ({} vectors, {} skipped) in {:.2}s",
            stats.documents_count,
            stats.chunks_count,
            stats.vectors_upserted,
            stats.skipped_documents,
            stats.duration_secs
        );

        Ok(stats)
    }

    /// Chunk, embed and upsert already-loaded documents.
    pub async fn ingest_documents(
        &self,
        documents: &[SourceDocument],
        options: &IngestOptions,
    ) -> AppResult<IngestStats> {
        let started = Instant::now();
        let mut stats = IngestStats::default();

        if options.reset {
            tracing::info!("Resetting {} index", self.index.backend_name());
            self.index.reset().await?;
        }

        let mut vectors_meta = Vec::new();
        for doc in documents {
            let chunks = self.chunker.chunk(&doc.text, &document_metadata(doc));
            if chunks.is_empty() {
                stats.skipped_documents += 1;
                continue;
            }

            stats.documents_count += 1;
            for chunk in chunks {
                let index = chunk.index().unwrap_or(0);
                let mut metadata = chunk.metadata;
                metadata.insert("text".to_string(), Value::from(chunk.text.as_str()));
                vectors_meta.push((vector_id(&doc.url, index, &chunk.text), chunk.text, metadata));
            }
        }
        stats.chunks_count = vectors_meta.len() as u32;
        let total = vectors_meta.len() as u64;
        self.reporter
            .emit(Phase::Chunk, total, Some(total), format!("{} chunks", total));

        let batch_size = options.batch_size.max(1);
        let mut done = 0u64;
        for batch in vectors_meta.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|(_, text, _)| text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(AppError::EmbeddingUnavailable(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            self.reporter.emit(
                Phase::Embed,
                done + batch.len() as u64,
                Some(total),
                format!("batch {}", stats.batches + 1),
            );

            let vectors: Vec<IndexedVector> = batch
                .iter()
                .zip(embeddings)
                .map(|((id, _, metadata), values)| IndexedVector {
                    id: id.clone(),
                    values,
                    metadata: metadata.clone(),
                })
                .collect();

            stats.vectors_upserted += self.index.upsert(&vectors).await? as u64;
            stats.batches += 1;
            done += batch.len() as u64;
            self.reporter.emit(
                Phase::Upsert,
                done,
                Some(total),
                format!("batch {}", stats.batches),
            );
        }

        stats.bytes_processed = documents.iter().map(|d| d.text.len() as u64).sum();
        stats.duration_secs = started.elapsed().as_secs_f64();
        Ok(stats)
    }
}

fn document_metadata(doc: &SourceDocument) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("url".to_string(), Value::from(doc.url.as_str()));
    metadata.insert("depth".to_string(), Value::from(doc.depth));
    if let Some(title) = doc.title.as_deref().filter(|t| !t.trim().is_empty()) {
        metadata.insert("title".to_string(), Value::from(title));
    }
    metadata
}

/// Stable, content-derived vector id: `{url hash}_{chunk index}_{text hash}`.
pub fn vector_id(url: &str, chunk_index: u64, text: &str) -> String {
    format!(
        "{}_{}_{}",
        short_hash(url),
        chunk_index,
        short_hash(text)
    )
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
