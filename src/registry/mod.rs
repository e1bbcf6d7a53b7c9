//! SQLite registry tracking study materials and user uploads.
//!
//! This is the pipeline's view of the backend datastore: material records
//! point at files in the shared materials tree, upload records track user
//! files through `pending → processing → completed` and carry the
//! `embedding_ready` flag the orchestrator flips after a successful store.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying SQLite operation failed.
    #[error("registry database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// A stored status string did not match any known upload status.
    #[error("invalid upload status: {0}")]
    InvalidStatus(String),
}

/// Processing status of an uploaded file, owned by the upload subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// Upload accepted but not yet processed.
    Pending,
    /// Upload is being processed by the backend.
    Processing,
    /// Upload processing finished; the file is ready for embedding.
    Completed,
    /// Upload processing failed.
    Failed,
}

impl UploadStatus {
    /// Canonical lowercase name stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Result<Self, RegistryError> {
        match value {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(RegistryError::InvalidStatus(other.to_string())),
        }
    }
}

/// A user-uploaded document tracked by the registry.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    /// Row identifier.
    pub id: i64,
    /// Path of the uploaded file on disk.
    pub file_path: String,
    /// Declared file type.
    pub file_type: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Processing status owned by the upload subsystem.
    pub status: UploadStatus,
    /// Whether embeddings have been generated for this upload.
    pub embedding_ready: bool,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

/// A curated study material tracked by the registry.
#[derive(Debug, Clone)]
pub struct MaterialRecord {
    /// Row identifier.
    pub id: i64,
    /// Display title of the material.
    pub title: String,
    /// Path of the material file on disk.
    pub file_path: String,
    /// Declared file type.
    pub file_type: String,
    /// File size in bytes.
    pub file_size: u64,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

/// SQLite-backed registry of materials and uploads.
pub struct Registry {
    conn: Arc<Mutex<Connection>>,
}

impl Registry {
    /// Create or open the registry database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let conn = Connection::open(path)?;
        let registry = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        registry.migrate()?;
        Ok(registry)
    }

    /// Create an in-memory registry, used by tests and ephemeral runs.
    pub fn in_memory() -> Result<Self, RegistryError> {
        let conn = Connection::open_in_memory()?;
        let registry = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        registry.migrate()?;
        Ok(registry)
    }

    fn migrate(&self) -> Result<(), RegistryError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS materials (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS uploads (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                status TEXT NOT NULL,
                embedding_ready INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_uploads_status ON uploads(status);
            CREATE INDEX IF NOT EXISTS idx_uploads_embedding_ready ON uploads(embedding_ready);
            "#,
        )?;
        Ok(())
    }

    /// Insert a material record, returning its id.
    pub fn insert_material(
        &self,
        title: &str,
        file_path: &str,
        file_type: &str,
        file_size: u64,
    ) -> Result<i64, RegistryError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO materials (title, file_path, file_type, file_size, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![title, file_path, file_type, file_size, now_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert an upload record with the given status, returning its id.
    pub fn insert_upload(
        &self,
        file_path: &str,
        file_type: &str,
        file_size: u64,
        status: UploadStatus,
    ) -> Result<i64, RegistryError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO uploads (file_path, file_type, file_size, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![file_path, file_type, file_size, status.as_str(), now_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Uploads whose processing completed but whose embeddings are missing.
    pub fn pending_uploads(&self) -> Result<Vec<UploadRecord>, RegistryError> {
        let conn = self.conn.lock();
        let mut statement = conn.prepare(
            "SELECT id, file_path, file_type, file_size, status, embedding_ready, created_at
             FROM uploads
             WHERE status = 'completed' AND embedding_ready = 0
             ORDER BY id",
        )?;
        let rows = statement.query_map([], map_upload_row)?;
        let mut uploads = Vec::new();
        for row in rows {
            uploads.push(row?.into_record()?);
        }
        Ok(uploads)
    }

    /// Look up a single upload by id.
    pub fn upload(&self, id: i64) -> Result<Option<UploadRecord>, RegistryError> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT id, file_path, file_type, file_size, status, embedding_ready, created_at
                 FROM uploads WHERE id = ?1",
                params![id],
                map_upload_row,
            )
            .optional()?;
        record.map(RawUpload::into_record).transpose()
    }

    /// Mark an upload's embeddings as generated and persist the change.
    pub fn mark_embedding_ready(&self, id: i64) -> Result<(), RegistryError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE uploads SET embedding_ready = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// All tracked study materials, in insertion order.
    pub fn materials(&self) -> Result<Vec<MaterialRecord>, RegistryError> {
        let conn = self.conn.lock();
        let mut statement = conn.prepare(
            "SELECT id, title, file_path, file_type, file_size, created_at
             FROM materials ORDER BY id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(MaterialRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                file_path: row.get(2)?,
                file_type: row.get(3)?,
                file_size: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        let mut materials = Vec::new();
        for row in rows {
            materials.push(row?);
        }
        Ok(materials)
    }

    /// Number of tracked materials.
    pub fn count_materials(&self) -> Result<u64, RegistryError> {
        self.count("SELECT COUNT(*) FROM materials")
    }

    /// Number of tracked uploads, in any state.
    pub fn count_uploads(&self) -> Result<u64, RegistryError> {
        self.count("SELECT COUNT(*) FROM uploads")
    }

    /// Number of uploads whose embeddings are ready.
    pub fn count_embedded_uploads(&self) -> Result<u64, RegistryError> {
        self.count("SELECT COUNT(*) FROM uploads WHERE embedding_ready = 1")
    }

    fn count(&self, sql: &str) -> Result<u64, RegistryError> {
        let conn = self.conn.lock();
        let count: u64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Upload row as read from SQLite, before status validation.
struct RawUpload {
    id: i64,
    file_path: String,
    file_type: String,
    file_size: u64,
    status: String,
    embedding_ready: bool,
    created_at: String,
}

impl RawUpload {
    fn into_record(self) -> Result<UploadRecord, RegistryError> {
        Ok(UploadRecord {
            id: self.id,
            file_path: self.file_path,
            file_type: self.file_type,
            file_size: self.file_size,
            status: UploadStatus::parse(&self.status)?,
            embedding_ready: self.embedding_ready,
            created_at: self.created_at,
        })
    }
}

fn map_upload_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUpload> {
    Ok(RawUpload {
        id: row.get(0)?,
        file_path: row.get(1)?,
        file_type: row.get(2)?,
        file_size: row.get(3)?,
        status: row.get(4)?,
        embedding_ready: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
    })
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_uploads_filters_on_status_and_flag() {
        let registry = Registry::in_memory().expect("registry");

        let ready = registry
            .insert_upload("/u/a.txt", "txt", 10, UploadStatus::Completed)
            .expect("insert");
        registry
            .insert_upload("/u/b.txt", "txt", 10, UploadStatus::Pending)
            .expect("insert");
        let done = registry
            .insert_upload("/u/c.txt", "txt", 10, UploadStatus::Completed)
            .expect("insert");
        registry.mark_embedding_ready(done).expect("mark");

        let pending = registry.pending_uploads().expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ready);
        assert_eq!(pending[0].status, UploadStatus::Completed);
        assert!(!pending[0].embedding_ready);
    }

    #[test]
    fn mark_embedding_ready_persists() {
        let registry = Registry::in_memory().expect("registry");
        let id = registry
            .insert_upload("/u/a.pdf", "pdf", 2048, UploadStatus::Completed)
            .expect("insert");

        registry.mark_embedding_ready(id).expect("mark");

        let record = registry.upload(id).expect("query").expect("record");
        assert!(record.embedding_ready);
        assert!(registry.pending_uploads().expect("pending").is_empty());
    }

    #[test]
    fn counts_track_inserts_and_flags() {
        let registry = Registry::in_memory().expect("registry");
        registry
            .insert_material("Biology Grade 12", "/m/bio.pdf", "pdf", 4096)
            .expect("insert");
        let first = registry
            .insert_upload("/u/a.txt", "txt", 10, UploadStatus::Completed)
            .expect("insert");
        registry
            .insert_upload("/u/b.txt", "txt", 10, UploadStatus::Completed)
            .expect("insert");
        registry.mark_embedding_ready(first).expect("mark");

        assert_eq!(registry.count_materials().expect("count"), 1);
        assert_eq!(registry.count_uploads().expect("count"), 2);
        assert_eq!(registry.count_embedded_uploads().expect("count"), 1);
    }

    #[test]
    fn materials_round_trip() {
        let registry = Registry::in_memory().expect("registry");
        registry
            .insert_material("Physics Notes", "/m/physics.docx", "docx", 1234)
            .expect("insert");

        let materials = registry.materials().expect("materials");
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].title, "Physics Notes");
        assert_eq!(materials[0].file_type, "docx");
        assert!(materials[0].created_at.contains('T'));
    }
}
