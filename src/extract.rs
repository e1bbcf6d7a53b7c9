//! File-type detection and plain-text extraction for study materials.
//!
//! Only a fixed allow-list of document types is accepted (PDF, DOCX, and
//! plain text / markdown). Unsupported types are rejected from the extension
//! alone, before any file I/O happens, so batch scans can skip foreign files
//! cheaply.

use std::path::Path;
use thiserror::Error;

/// Document types the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Plain text.
    Txt,
    /// Markdown, read as plain text.
    Markdown,
}

impl FileKind {
    /// Detect the file kind from a lowercase extension, if supported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detect the file kind from a path's extension, if supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical lowercase name used in stored metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Markdown => "md",
        }
    }
}

/// Errors produced while extracting text from a document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file's extension is not on the supported allow-list.
    #[error("unsupported file type: {path}")]
    Unsupported {
        /// Path of the rejected file.
        path: String,
    },
    /// The file could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the unreadable file.
        path: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The file's bytes could not be parsed as the declared format.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path of the unparseable file.
        path: String,
        /// Diagnostic from the format parser.
        message: String,
    },
}

/// Whether the path's extension is on the supported allow-list.
///
/// This never touches the filesystem.
pub fn is_supported_file_type(path: &Path) -> bool {
    FileKind::from_path(path).is_some()
}

/// Extract plain text from a document on disk.
///
/// Unsupported types are rejected before any I/O is attempted. Extraction
/// failures (unreadable or corrupt files) surface as [`ExtractError`] so the
/// orchestrator can log and skip the file without aborting the batch.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let kind = FileKind::from_path(path).ok_or_else(|| ExtractError::Unsupported {
        path: path.display().to_string(),
    })?;

    match kind {
        FileKind::Txt | FileKind::Markdown => {
            std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
                path: path.display().to_string(),
                source,
            })
        }
        FileKind::Pdf => extract_pdf(path),
        FileKind::Docx => extract_docx(path),
    }
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let raw = pdf_extract::extract_text_from_mem(&bytes).map_err(|err| ExtractError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    Ok(cleanup_extracted_text(&raw))
}

fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let doc = docx_rs::read_docx(&bytes).map_err(|err| ExtractError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(text) = child {
                            content.push_str(&text.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(cleanup_extracted_text(&content))
}

/// Strip NUL bytes, trim line edges, and drop blank lines left behind by
/// format parsers.
fn cleanup_extracted_text(raw: &str) -> String {
    raw.replace('\0', "")
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn supported_extensions_are_recognized() {
        for name in ["notes.pdf", "thesis.DOCX", "todo.txt", "summary.md"] {
            assert!(
                is_supported_file_type(&PathBuf::from(name)),
                "{name} should be supported"
            );
        }
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        for name in ["virus.exe", "photo.png", "archive.zip", "no_extension"] {
            assert!(
                !is_supported_file_type(&PathBuf::from(name)),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn unsupported_file_is_rejected_before_io() {
        // The path does not exist; an I/O error would mean extraction was attempted.
        let error = extract_text(&PathBuf::from("/nonexistent/setup.exe")).unwrap_err();
        assert!(matches!(error, ExtractError::Unsupported { .. }));
    }

    #[test]
    fn missing_supported_file_reports_io_error() {
        let error = extract_text(&PathBuf::from("/nonexistent/notes.txt")).unwrap_err();
        assert!(matches!(error, ExtractError::Io { .. }));
    }

    #[test]
    fn plain_text_is_read_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        let mut file = std::fs::File::create(&path).expect("create");
        write!(file, "algebra basics\nquadratic equations").expect("write");

        let text = extract_text(&path).expect("extract");
        assert_eq!(text, "algebra basics\nquadratic equations");
    }

    #[test]
    fn cleanup_removes_nulls_and_blank_lines() {
        let cleaned = cleanup_extracted_text("  first \0line \n\n\n  second  \n");
        assert_eq!(cleaned, "first line\nsecond");
    }
}
