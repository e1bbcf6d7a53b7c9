//! Qdrant vector store integration.
//!
//! Embedding records live in a single Qdrant collection: one point per chunk,
//! carrying the chunk text, its vector, and the source document metadata. The
//! store is idempotent per document: re-ingesting a document id replaces its
//! prior points instead of duplicating them.

mod client;
mod filters;
mod payload;
mod types;

pub use client::QdrantStore;
pub use filters::{document_filter, older_than_filter};
pub use payload::{compute_chunk_hash, current_timestamp_rfc3339};
pub use types::{ChunkPoint, DocumentMeta, QdrantError, ScoredPoint};
