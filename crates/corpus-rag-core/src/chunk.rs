//! Fixed-window text chunker.
//!
//! Splits a corpus into [`Chunk`]s of at most `max_chars` characters.
//! Boundaries are purely positional: the text is cut every `max_chars`
//! Unicode scalar values with no regard for words, lines, or sentences.
//! Concatenating the chunk texts in order reproduces the input exactly.
//!
//! Each chunk receives its 1-based position as id, plus a SHA-256 hash of
//! its text.
//!
//! # Example
//!
//! ```rust
//! use corpus_rag_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("hello world", 5);
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, ["hello", " worl", "d"]);
//! assert_eq!(chunks[0].id, "1");
//! ```

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Split `text` into consecutive windows of at most `max_chars` characters.
///
/// # Guarantees
///
/// - `chunks.concat() == text`; no character is dropped or duplicated.
/// - Every chunk holds at most `max_chars` characters.
/// - Input of `max_chars` characters or fewer yields exactly one chunk
///   (an empty input yields a single empty chunk).
/// - Ids are `"1"`, `"2"`, … in order.
///
/// A `max_chars` of zero is treated as one.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (pos, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(make_chunk(chunks.len() + 1, &text[start..pos]));
            start = pos;
            count = 0;
        }
        count += 1;
    }

    // Flush the tail (or the whole input when it fits in one window)
    chunks.push(make_chunk(chunks.len() + 1, &text[start..]));
    chunks
}

/// SHA-256 of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(position: usize, text: &str) -> Chunk {
    Chunk {
        id: position.to_string(),
        text: text.to_string(),
        hash: content_hash(text),
    }
}
