//! Filter helpers for Qdrant deletes, counts, and purges.

use serde_json::{Value, json};

/// Filter matching every point belonging to one source document.
pub fn document_filter(document_id: &str) -> Value {
    json!({
        "must": [
            {
                "key": "document_id",
                "match": { "value": document_id }
            }
        ]
    })
}

/// Filter matching points stamped strictly before the cutoff.
///
/// The boundary is exclusive: a point whose timestamp equals the cutoff is
/// retained.
pub fn older_than_filter(cutoff_rfc3339: &str) -> Value {
    json!({
        "must": [
            {
                "key": "timestamp",
                "range": { "lt": cutoff_rfc3339 }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_filter_matches_exact_id() {
        assert_eq!(
            document_filter("/materials/biology.pdf"),
            json!({
                "must": [
                    {
                        "key": "document_id",
                        "match": { "value": "/materials/biology.pdf" }
                    }
                ]
            })
        );
    }

    #[test]
    fn older_than_filter_uses_exclusive_lt_bound() {
        assert_eq!(
            older_than_filter("2025-01-01T00:00:00Z"),
            json!({
                "must": [
                    {
                        "key": "timestamp",
                        "range": { "lt": "2025-01-01T00:00:00Z" }
                    }
                ]
            })
        );
    }
}
