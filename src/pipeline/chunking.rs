//! Character-window chunking with whitespace-preferring boundaries.
//!
//! Extracted text is split into bounded segments sized for the embedding
//! model. Boundaries prefer the last whitespace inside the trailing fifth of
//! the size window, so chunks tend to end on word or sentence breaks instead
//! of mid-word. A fixed trailing overlap is repeated at the start of the next
//! chunk to keep context visible across boundaries: stripping the first
//! `overlap` characters of every chunk after the first reconstructs the
//! original text exactly.

use super::types::ChunkingError;

/// One ordered fragment of a document's extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk within the document.
    pub index: usize,
    /// The chunk's text span, including the leading overlap.
    pub text: String,
}

/// Split text into overlapping chunks of at most `chunk_size` characters.
///
/// Whitespace-only input yields no chunks; the caller treats that as
/// "nothing to embed". Input no longer than one window yields exactly one
/// chunk. Each subsequent chunk starts exactly `overlap` characters before
/// the previous chunk's end.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::InvalidOverlap {
            overlap,
            chunk_size,
        });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0_usize;

    loop {
        let hard_end = (start + chunk_size).min(total);
        let end = if hard_end == total {
            total
        } else {
            boundary_near(&chars, start, hard_end, overlap)
        };

        chunks.push(Chunk {
            index: chunks.len(),
            text: chars[start..end].iter().collect(),
        });

        if end == total {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}

/// Pick a chunk end at or before `hard_end`, preferring to break just after
/// the last whitespace within the trailing fifth of the window. Never moves
/// the boundary so far back that the next chunk would fail to advance.
fn boundary_near(chars: &[char], start: usize, hard_end: usize, overlap: usize) -> usize {
    let window = (hard_end - start) / 5;
    let floor = (hard_end - window).max(start + overlap + 1);

    let mut pos = hard_end;
    while pos > floor {
        if chars[pos - 1].is_whitespace() {
            return pos;
        }
        pos -= 1;
    }
    hard_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
        let mut text = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                text.push_str(&chunk.text);
            } else {
                text.extend(chunk.text.chars().skip(overlap));
            }
        }
        text
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 100, 10).expect("chunks").is_empty());
        assert!(chunk_text("   \n\t ", 100, 10).expect("chunks").is_empty());
    }

    #[test]
    fn short_text_yields_exactly_one_chunk() {
        let chunks = chunk_text("a short note", 100, 10).expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "a short note");
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let error = chunk_text("hello", 0, 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let error = chunk_text("hello", 10, 10).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidOverlap { .. }));
    }

    #[test]
    fn chunks_respect_size_and_are_sequentially_indexed() {
        let text = "word ".repeat(200);
        let chunks = chunk_text(&text, 100, 10).expect("chunks");
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.text.chars().count() <= 100);
        }
    }

    #[test]
    fn deoverlapped_concatenation_reconstructs_input() {
        let text = "The mitochondria is the powerhouse of the cell. ".repeat(40);
        let chunks = chunk_text(&text, 120, 20).expect("chunks");
        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks, 20), text);
    }

    #[test]
    fn reconstruction_holds_without_convenient_whitespace() {
        let text = "x".repeat(950);
        let chunks = chunk_text(&text, 100, 10).expect("chunks");
        assert_eq!(reassemble(&chunks, 10), text);
    }

    #[test]
    fn chunk_count_tracks_effective_step() {
        // 5000 chars with whitespace at every fifth position: boundaries land
        // on word breaks and the step stays chunk_size - overlap.
        let text = "word ".repeat(1000);
        let chunks = chunk_text(&text, 1000, 100).expect("chunks");
        assert_eq!(chunks.len(), 5000_usize.div_ceil(1000 - 100));
        assert_eq!(chunks.len(), 6);
    }

    #[test]
    fn boundaries_prefer_whitespace_over_midword_cuts() {
        let text = format!("{} {}", "a".repeat(95), "b".repeat(100));
        let chunks = chunk_text(&text, 100, 10).expect("chunks");
        // The first boundary falls on the space at position 96, not inside
        // the run of `b`s.
        assert!(chunks[0].text.ends_with(' '));
        assert_eq!(chunks[0].text.chars().count(), 96);
    }

    #[test]
    fn multibyte_text_chunks_on_char_boundaries() {
        let text = "αβγδε ".repeat(50);
        let chunks = chunk_text(&text, 40, 8).expect("chunks");
        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks, 8), text);
    }
}
