//! Core data types and error definitions for the ingestion pipeline.

use crate::config::ConfigError;
use crate::embedding::EmbeddingError;
use crate::extract::ExtractError;
use crate::qdrant::QdrantError;
use crate::registry::RegistryError;
use thiserror::Error;

/// Errors produced while splitting extracted text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunking was configured with a zero-character window.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// The overlap would swallow the whole window and chunks could not advance.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidOverlap {
        /// Configured overlap in characters.
        overlap: usize,
        /// Configured chunk size in characters.
        chunk_size: usize,
    },
}

/// Errors emitted by the document ingestion pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text extraction rejected or failed on the source file.
    #[error("Failed to extract text: {0}")]
    Extract(#[from] ExtractError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Vector store interaction failed.
    #[error("Qdrant request failed: {0}")]
    Store(#[from] QdrantError),
    /// Registry read or update failed.
    #[error("Registry operation failed: {0}")]
    Registry(#[from] RegistryError),
    /// Configuration was incomplete for the requested operation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The configured materials directory does not exist.
    #[error("Materials directory not found: {0}")]
    MissingDirectory(String),
}

/// Result of pushing a single file through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file was chunked, embedded, and stored.
    Indexed {
        /// Number of chunk records written for the file.
        chunk_count: usize,
    },
    /// The file produced no text and nothing was embedded.
    SkippedEmpty,
}

/// Aggregate counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files fully indexed.
    pub processed: usize,
    /// Files skipped before embedding (unsupported, missing, or empty).
    pub skipped: usize,
    /// Files that failed at some pipeline stage.
    pub failed: usize,
}

/// Snapshot of registry and vector-store statistics.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct IngestStats {
    /// Number of tracked study materials.
    pub total_materials: u64,
    /// Number of tracked user uploads, in any state.
    pub total_uploads: u64,
    /// Uploads whose embeddings are ready.
    pub embedded_uploads: u64,
    /// Number of embedding records currently in the vector store.
    pub vector_store_size: usize,
}
