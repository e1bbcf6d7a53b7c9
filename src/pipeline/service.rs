//! Ingestion service coordinating extraction, chunking, embedding, and
//! vector-store writes.

use crate::{
    config::Config,
    embedding::{self, EmbeddingClient},
    extract::{self, ExtractError, FileKind},
    metrics::{IngestMetrics, MetricsSnapshot},
    pipeline::{
        chunking::chunk_text,
        types::{BatchSummary, FileOutcome, IngestStats, PipelineError},
    },
    qdrant::{ChunkPoint, DocumentMeta, QdrantStore, ScoredPoint},
    registry::Registry,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use walkdir::WalkDir;

/// Coordinates the full ingestion pipeline for study documents.
///
/// The service owns long-lived handles to the embedding client, the Qdrant
/// transport, and the metrics registry. Each file moves through
/// extraction, chunking, embedding, and storage sequentially; per-file
/// failures are absorbed at the batch loops so one bad document never aborts
/// a run.
pub struct IngestionService {
    config: Config,
    embedding_client: Box<dyn EmbeddingClient>,
    store: QdrantStore,
    metrics: Arc<IngestMetrics>,
}

impl IngestionService {
    /// Assemble a service from explicitly constructed components.
    pub fn new(
        config: Config,
        embedding_client: Box<dyn EmbeddingClient>,
        store: QdrantStore,
    ) -> Self {
        Self {
            config,
            embedding_client,
            store,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Build the default clients for the configuration and ensure the
    /// embedding collection exists.
    ///
    /// Failures here mean the run cannot proceed at all (bad provider
    /// settings, unreachable Qdrant) and are fatal to the caller.
    pub async fn connect(config: Config) -> Result<Self, PipelineError> {
        tracing::info!(provider = ?config.embedding_provider, "Initializing embedding client");
        let embedding_client = embedding::client_for(&config)?;
        let store = QdrantStore::new(&config)?;
        store.ensure_collection().await?;
        tracing::debug!(collection = %config.qdrant_collection_name, "Embedding collection ready");
        Ok(Self::new(config, embedding_client, store))
    }

    /// Push a single document through extraction, chunking, embedding, and
    /// storage.
    ///
    /// Nothing is written to the vector store unless every chunk embedded
    /// successfully, so a failed file leaves no partial records behind.
    pub async fn process_file(&self, path: &Path) -> Result<FileOutcome, PipelineError> {
        tracing::info!(file = %path.display(), "Processing document");

        let text = extract::extract_text(path)?;
        let chunks = chunk_text(&text, self.config.chunk_size, self.config.chunk_overlap)?;
        if chunks.is_empty() {
            tracing::warn!(file = %path.display(), "No text content extracted; skipping");
            self.metrics.record_skip();
            return Ok(FileOutcome::SkippedEmpty);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedding_client.generate_embeddings(texts).await?;
        debug_assert_eq!(chunks.len(), vectors.len());

        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkPoint {
                index: chunk.index,
                text: chunk.text,
                vector,
            })
            .collect();

        let meta = document_meta_for(path)?;
        let document_id = path.to_string_lossy().to_string();
        let written = self.store.store(&document_id, &meta, points).await?;

        self.metrics.record_document(written as u64);
        tracing::info!(
            file = %path.display(),
            chunks = written,
            chunk_size = self.config.chunk_size,
            "Document indexed"
        );
        Ok(FileOutcome::Indexed {
            chunk_count: written,
        })
    }

    /// Recursively ingest every supported file under the materials directory.
    ///
    /// A missing directory is a configuration error and fails the run;
    /// anything that goes wrong with an individual file is logged and
    /// counted, and the scan continues.
    pub async fn process_materials_dir(&self, dir: &Path) -> Result<BatchSummary, PipelineError> {
        if !dir.is_dir() {
            return Err(PipelineError::MissingDirectory(
                dir.display().to_string(),
            ));
        }

        tracing::info!(dir = %dir.display(), "Processing materials directory");
        let mut summary = BatchSummary::default();

        for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !extract::is_supported_file_type(path) {
                tracing::warn!(file = %path.display(), "Unsupported file type; skipping");
                self.metrics.record_skip();
                summary.skipped += 1;
                continue;
            }

            match self.process_file(path).await {
                Ok(FileOutcome::Indexed { .. }) => summary.processed += 1,
                Ok(FileOutcome::SkippedEmpty) => summary.skipped += 1,
                Err(error) => {
                    tracing::error!(file = %path.display(), error = %error, "Failed to process file");
                    self.metrics.record_failure();
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Materials directory run complete"
        );
        Ok(summary)
    }

    /// Ingest every completed upload that is still missing embeddings.
    ///
    /// The `embedding_ready` flag is flipped and persisted per upload right
    /// after its store write succeeds, so an interrupted batch leaves
    /// finished uploads marked done and the rest pending for the next run.
    /// Uploads that extract to no text are also marked ready: there is
    /// nothing to embed and leaving the flag unset would re-queue them on
    /// every run.
    pub async fn process_pending_uploads(
        &self,
        registry: &Registry,
    ) -> Result<BatchSummary, PipelineError> {
        let uploads = registry.pending_uploads()?;
        tracing::info!(count = uploads.len(), "Processing uploads awaiting embeddings");
        let mut summary = BatchSummary::default();

        for upload in uploads {
            let path = PathBuf::from(&upload.file_path);
            if !path.exists() {
                tracing::warn!(
                    upload = upload.id,
                    file = %upload.file_path,
                    "File not found for upload; skipping"
                );
                self.metrics.record_skip();
                summary.skipped += 1;
                continue;
            }

            let outcome = match self.process_file(&path).await {
                Ok(FileOutcome::Indexed { chunk_count }) => registry
                    .mark_embedding_ready(upload.id)
                    .map_err(PipelineError::from)
                    .map(|()| {
                        tracing::info!(upload = upload.id, "Upload marked embedding-ready");
                        FileOutcome::Indexed { chunk_count }
                    }),
                Ok(FileOutcome::SkippedEmpty) => registry
                    .mark_embedding_ready(upload.id)
                    .map_err(PipelineError::from)
                    .map(|()| {
                        tracing::warn!(
                            upload = upload.id,
                            file = %upload.file_path,
                            "Upload produced no text; marked embedding-ready with nothing stored"
                        );
                        FileOutcome::SkippedEmpty
                    }),
                Err(error) => Err(error),
            };

            match outcome {
                Ok(FileOutcome::Indexed { .. }) => summary.processed += 1,
                Ok(FileOutcome::SkippedEmpty) => summary.skipped += 1,
                Err(error) => {
                    tracing::error!(
                        upload = upload.id,
                        file = %upload.file_path,
                        error = %error,
                        "Failed to process upload"
                    );
                    self.metrics.record_failure();
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Upload run complete"
        );
        Ok(summary)
    }

    /// Re-embed every tracked study material.
    ///
    /// Store idempotency makes this safe to re-run: each material's prior
    /// records are replaced, not duplicated.
    pub async fn process_materials(
        &self,
        registry: &Registry,
    ) -> Result<BatchSummary, PipelineError> {
        let materials = registry.materials()?;
        tracing::info!(count = materials.len(), "Processing tracked materials");
        let mut summary = BatchSummary::default();

        for material in materials {
            let path = PathBuf::from(&material.file_path);
            if !path.exists() {
                tracing::warn!(
                    material = material.id,
                    file = %material.file_path,
                    "File not found for material; skipping"
                );
                self.metrics.record_skip();
                summary.skipped += 1;
                continue;
            }

            match self.process_file(&path).await {
                Ok(FileOutcome::Indexed { .. }) => summary.processed += 1,
                Ok(FileOutcome::SkippedEmpty) => summary.skipped += 1,
                Err(error) => {
                    tracing::error!(
                        material = material.id,
                        file = %material.file_path,
                        error = %error,
                        "Failed to process material"
                    );
                    self.metrics.record_failure();
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Materials run complete"
        );
        Ok(summary)
    }

    /// Remove embedding records older than the given number of days.
    pub async fn cleanup_older_than(&self, days: u32) -> Result<usize, PipelineError> {
        let cutoff = OffsetDateTime::now_utc() - time::Duration::days(i64::from(days));
        let cutoff = cutoff
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string());
        tracing::info!(days, cutoff = %cutoff, "Cleaning up aged embedding records");
        Ok(self.store.purge_older_than(&cutoff).await?)
    }

    /// Report registry and vector-store statistics.
    pub async fn statistics(&self, registry: &Registry) -> Result<IngestStats, PipelineError> {
        Ok(IngestStats {
            total_materials: registry.count_materials()?,
            total_uploads: registry.count_uploads()?,
            embedded_uploads: registry.count_embedded_uploads()?,
            vector_store_size: self.store.count().await?,
        })
    }

    /// Embed a query and return the `k` most similar stored chunks.
    ///
    /// This is the chatbot-facing surface of the vector store; the ingestion
    /// CLI itself does not exercise it.
    pub async fn search_similar(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredPoint>, PipelineError> {
        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let vector = vectors
            .pop()
            .ok_or(crate::embedding::EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;
        if vector.len() != self.config.embedding_dimension {
            return Err(crate::embedding::EmbeddingError::DimensionMismatch {
                expected: self.config.embedding_dimension,
                actual: vector.len(),
            }
            .into());
        }
        Ok(self.store.search(vector, k).await?)
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn document_meta_for(path: &Path) -> Result<DocumentMeta, PipelineError> {
    let file_type = FileKind::from_path(path)
        .map(|kind| kind.as_str().to_string())
        .ok_or_else(|| ExtractError::Unsupported {
            path: path.display().to_string(),
        })?;
    let file_size = std::fs::metadata(path)
        .map_err(|source| ExtractError::Io {
            path: path.display().to_string(),
            source,
        })?
        .len();

    Ok(DocumentMeta {
        file_path: path.to_string_lossy().to_string(),
        file_type,
        file_size,
    })
}
