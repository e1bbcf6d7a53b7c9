//! Document ingestion pipeline: extraction, chunking, embedding, and storage
//! orchestration.

pub mod chunking;
mod service;
pub mod types;

pub use chunking::{Chunk, chunk_text};
pub use service::IngestionService;
pub use types::{BatchSummary, ChunkingError, FileOutcome, IngestStats, PipelineError};
