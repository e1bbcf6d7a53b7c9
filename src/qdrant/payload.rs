//! Helpers for constructing and hashing embedding-record payloads.

use crate::qdrant::types::DocumentMeta;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(
    document_id: &str,
    chunk_index: usize,
    text: &str,
    timestamp_rfc3339: &str,
    meta: &DocumentMeta,
) -> Value {
    let mut payload = Map::new();
    payload.insert("document_id".into(), Value::String(document_id.to_string()));
    payload.insert("chunk_index".into(), Value::from(chunk_index));
    payload.insert("text".into(), Value::String(text.to_string()));
    payload.insert(
        "content_hash".into(),
        Value::String(compute_chunk_hash(text)),
    );
    payload.insert("file_path".into(), Value::String(meta.file_path.clone()));
    payload.insert("file_type".into(), Value::String(meta.file_type.clone()));
    payload.insert("file_size".into(), Value::from(meta.file_size));
    payload.insert(
        "timestamp".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    Value::Object(payload)
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct a point identifier suitable for Qdrant.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> DocumentMeta {
        DocumentMeta {
            file_path: "/materials/biology.pdf".into(),
            file_type: "pdf".into(),
            file_size: 4096,
        }
    }

    #[test]
    fn chunk_hash_is_stable() {
        let text = "Hello world";
        let h1 = compute_chunk_hash(text);
        let h2 = compute_chunk_hash(text);
        assert_eq!(h1, h2);
        assert!(!h1.is_empty());
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn payload_carries_document_identity_and_metadata() {
        let now = "2025-01-01T00:00:00Z";
        let payload = build_payload("/materials/biology.pdf", 3, "mitochondria", now, &meta());
        assert_eq!(payload["document_id"], "/materials/biology.pdf");
        assert_eq!(payload["chunk_index"], 3);
        assert_eq!(payload["text"], "mitochondria");
        assert_eq!(payload["file_type"], "pdf");
        assert_eq!(payload["file_size"], 4096);
        assert_eq!(payload["timestamp"], now);
        assert_eq!(
            payload["content_hash"],
            Value::String(compute_chunk_hash("mitochondria"))
        );
    }
}
