//! Document splitting strategies.
//!
//! This module provides the [`Splitter`] trait and its standard
//! implementation, [`SentenceSplitter`], which packs sentences and paragraphs
//! greedily into size-bounded chunks with configurable overlap.

use crate::document::{CHUNK_INDEX_KEY, Document, TOTAL_CHUNKS_KEY};

/// Sentence and paragraph boundaries, cut after the trailing delimiter.
const BOUNDARIES: [&[u8]; 4] = [b"\n\n", b". ", b"! ", b"? "];

/// A strategy for splitting documents into chunk documents.
///
/// Implementations are pure functions of the input document: the same
/// document and configuration always produce the same chunks. Chunks carry
/// no embeddings; the pipeline attaches them later.
pub trait Splitter: Send + Sync {
    /// Split a document into ordered chunk documents.
    ///
    /// Never fails and never returns an empty `Vec`: a document with empty
    /// or whitespace-only content yields exactly one chunk carrying that
    /// content unchanged.
    fn split(&self, document: &Document) -> Vec<Document>;
}

/// Splits text at sentence and paragraph boundaries, packing segments
/// greedily so no emitted chunk exceeds `chunk_size` characters, with the
/// trailing `chunk_overlap` characters of each chunk repeated at the start
/// of the next.
///
/// Sizes are measured in characters, not bytes, so multi-byte text never
/// splits inside a code point. A single sentence longer than the chunk
/// budget is cut at a word boundary where possible, mid-word otherwise.
///
/// Chunk ids are generated as `{document_id}_{chunk_index}`, and each chunk
/// inherits the parent document's metadata plus `chunk_index` and
/// `total_chunks` fields.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::SentenceSplitter;
///
/// let splitter = SentenceSplitter::new(512, 100);
/// let chunks = splitter.split(&document);
/// ```
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceSplitter {
    /// Create a new `SentenceSplitter`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per emitted chunk
    /// * `chunk_overlap` - number of characters repeated between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Splitter for SentenceSplitter {
    fn split(&self, document: &Document) -> Vec<Document> {
        // Packing needs a positive per-chunk budget.
        let chunk_size = self.chunk_size.max(1);
        let chunk_overlap = self.chunk_overlap.min(chunk_size - 1);

        let pieces = if document.content.trim().is_empty() {
            vec![document.content.clone()]
        } else {
            pack_segments(&document.content, chunk_size, chunk_overlap)
        };

        let total_chunks = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), chunk_index.to_string());
                metadata.insert(TOTAL_CHUNKS_KEY.to_string(), total_chunks.to_string());
                Document {
                    id: format!("{}_{chunk_index}", document.id),
                    title: document.title.clone(),
                    content,
                    metadata,
                    embedding: None,
                    created_at: document.created_at,
                    updated_at: document.updated_at,
                }
            })
            .collect()
    }
}

/// Split `text` into chunks of at most `chunk_size` characters, where every
/// chunk after the first starts with the previous chunk's trailing
/// `chunk_overlap` characters.
fn pack_segments(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    // Chunks after the first reserve room for the overlap prefix.
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for segment in split_segments(text) {
        let mut segment = segment;
        loop {
            let budget = if pieces.is_empty() { chunk_size } else { chunk_size - chunk_overlap };
            let segment_len = char_len(segment);
            if current_len + segment_len <= budget {
                current.push_str(segment);
                current_len += segment_len;
                break;
            }
            if current_len == 0 {
                // A single segment longer than the whole budget.
                let (head, tail) = cut_at_budget(segment, budget);
                pieces.push(head.to_string());
                segment = tail;
                continue;
            }
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if current_len > 0 {
        pieces.push(current);
    }

    if chunk_overlap == 0 || pieces.len() < 2 {
        return pieces;
    }

    let mut chunks: Vec<String> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let chunk = match chunks.last() {
            Some(previous) => {
                let mut text = tail_chars(previous, chunk_overlap).to_string();
                text.push_str(&piece);
                text
            }
            None => piece,
        };
        chunks.push(chunk);
    }
    chunks
}

/// Split text at sentence and paragraph boundaries, keeping each delimiter
/// attached to the preceding segment.
fn split_segments(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    // All boundary delimiters are ASCII pairs, so cutting next to them
    // always lands on a char boundary.
    while i + 1 < bytes.len() {
        if BOUNDARIES.contains(&&bytes[i..i + 2]) {
            segments.push(&text[start..i + 2]);
            start = i + 2;
            i += 2;
        } else {
            i += 1;
        }
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

/// Cut an oversize segment down to `budget` characters, preferring the last
/// space inside the window over a mid-word cut.
fn cut_at_budget(segment: &str, budget: usize) -> (&str, &str) {
    let (head, tail) = split_at_chars(segment, budget);
    match head.rfind(' ') {
        Some(pos) => (&segment[..pos + 1], &segment[pos + 1..]),
        None => (head, tail),
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The last `n` characters of `text`, or all of it when shorter.
fn tail_chars(text: &str, n: usize) -> &str {
    let len = char_len(text);
    if len <= n {
        return text;
    }
    match text.char_indices().nth(len - n) {
        Some((index, _)) => &text[index..],
        None => text,
    }
}

/// Split after the first `n` characters without breaking a code point.
fn split_at_chars(text: &str, n: usize) -> (&str, &str) {
    match text.char_indices().nth(n) {
        Some((index, _)) => text.split_at(index),
        None => (text, ""),
    }
}
