#![deny(missing_docs)]

//! Core library for the study companion document ingestion pipeline.

/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and provider adapters.
pub mod embedding;
/// File-type detection and plain-text extraction.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document ingestion pipeline and batch orchestration.
pub mod pipeline;
/// Qdrant vector store integration.
pub mod qdrant;
/// SQLite registry tracking materials and user uploads.
pub mod registry;
