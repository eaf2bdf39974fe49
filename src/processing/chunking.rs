//! Recursive character splitting with overlapping chunk merge.
//!
//! Splitting walks an ordered list of separators (highest priority first):
//! segments that still exceed the target size are re-split with the next
//! separator, and a hard character-boundary cut is the last resort. Adjacent
//! segments are then merged greedily up to the target size, and each chunk
//! after the first is extended backwards into its predecessor by the
//! configured overlap.

use thiserror::Error;

/// Separator priorities used when the caller does not supply their own.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Errors produced while configuring the splitter.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Overlap must stay strictly below the chunk size, and size must be nonzero.
    #[error("invalid chunk configuration: size {chunk_size}, overlap {chunk_overlap}")]
    InvalidChunkConfig {
        /// Requested target chunk size in characters.
        chunk_size: usize,
        /// Requested overlap in characters.
        chunk_overlap: usize,
    },
}

/// One produced chunk together with the span it shares with its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPiece {
    /// Chunk text, including the leading overlap.
    pub text: String,
    /// Number of leading characters shared with the previous chunk (0 for the first).
    pub lead_overlap: usize,
}

/// Character-count recursive splitter.
///
/// Configuration is validated once at construction; [`RecursiveChunker::split`]
/// never fails.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Build a splitter, rejecting impossible `(size, overlap)` combinations.
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ChunkingError::InvalidChunkConfig {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    /// Build a splitter with the default separator priorities.
    pub fn with_defaults(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        Self::new(
            chunk_size,
            chunk_overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Configured target chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Configured overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// Every chunk except possibly the last is at most
    /// `chunk_size + chunk_overlap` characters long, and dropping each chunk's
    /// `lead_overlap` characters reconstructs `text` exactly.
    pub fn split(&self, text: &str) -> Vec<ChunkPiece> {
        if text.is_empty() {
            return Vec::new();
        }

        let segments = self.split_segments(text, &self.separators);
        let merged = self.merge_segments(segments);
        self.apply_overlap(merged)
    }

    fn split_segments(&self, text: &str, separators: &[String]) -> Vec<String> {
        if char_count(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some(position) = separators
            .iter()
            .position(|sep| !sep.is_empty() && text.contains(sep.as_str()))
        else {
            return hard_cut(text, self.chunk_size);
        };

        let separator = &separators[position];
        let remaining = &separators[position + 1..];
        let mut segments = Vec::new();
        for part in split_after_separator(text, separator) {
            if char_count(&part) <= self.chunk_size {
                segments.push(part);
            } else {
                segments.extend(self.split_segments(&part, remaining));
            }
        }
        segments
    }

    fn merge_segments(&self, segments: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;

        for segment in segments {
            let segment_chars = char_count(&segment);
            if current_chars > 0 && current_chars + segment_chars > self.chunk_size {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            current.push_str(&segment);
            current_chars += segment_chars;
        }
        if current_chars > 0 {
            chunks.push(current);
        }
        chunks
    }

    fn apply_overlap(&self, chunks: Vec<String>) -> Vec<ChunkPiece> {
        let mut pieces: Vec<ChunkPiece> = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            if index == 0 || self.chunk_overlap == 0 {
                pieces.push(ChunkPiece {
                    text: chunk,
                    lead_overlap: 0,
                });
                continue;
            }

            let previous = &pieces[index - 1].text;
            let previous_chars = char_count(previous);
            // Never swallow the whole predecessor: clamp to its length minus one.
            let overlap = self.chunk_overlap.min(previous_chars.saturating_sub(1));
            let tail = tail_chars(previous, overlap).to_string();
            pieces.push(ChunkPiece {
                text: format!("{tail}{chunk}"),
                lead_overlap: overlap,
            });
        }
        pieces
    }
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` on `separator`, keeping the separator attached to the
/// preceding part so that concatenation reproduces the input.
fn split_after_separator(text: &str, separator: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(found) = rest.find(separator) {
        let end = found + separator.len();
        parts.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}

fn hard_cut(text: &str, size: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == size {
            parts.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Suffix of `text` containing the last `count` characters.
fn tail_chars(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    match text.char_indices().rev().nth(count - 1) {
        Some((start, _)) => &text[start..],
        None => text,
    }
}
