//! Recursive-separator text chunking
//!
//! Splits document text on a prioritized list of separators (paragraph
//! break, line break, sentence end, single space, then character level),
//! merging the resulting fragments into windows of at most `chunk_size`
//! characters with `overlap` characters carried between adjacent windows.
//!
//! Guarantees:
//! - every character of the input appears in at least one chunk
//! - chunk order matches document order
//! - non-empty input yields non-empty output
//! - no chunk exceeds `chunk_size` characters
//!
//! All sizes are counted in Unicode scalar values, not bytes.

use std::collections::VecDeque;
use thiserror::Error;

/// Separators tried in priority order; character-level splitting is the
/// implicit last resort.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk_size must be at least 1")]
    InvalidChunkSize,

    /// Overlap at or above the chunk size would make zero progress per
    /// window; rejected rather than clamped.
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    InvalidOverlap { chunk_size: usize, overlap: usize },
}

/// A text fragment with its starting character offset in the source text.
#[derive(Debug, Clone)]
struct Fragment {
    text: String,
    start: usize,
}

/// Configured chunker; cheap to construct, reusable across documents.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::InvalidOverlap {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Split `text` into overlapping chunks in document order.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.chunk_spans(text)
            .into_iter()
            .map(|f| f.text)
            .collect()
    }

    /// Chunking with source offsets; the offsets drive the coverage tests.
    fn chunk_spans(&self, text: &str) -> Vec<Fragment> {
        if text.is_empty() {
            return Vec::new();
        }
        let chunks = self.split(text, &SEPARATORS, 0);
        tracing::debug!(chunks = chunks.len(), "split text into chunks");
        chunks
    }

    /// Recursively split `text` (starting at char offset `base`) using the
    /// first separator that occurs in it, descending to finer separators
    /// for fragments that are still too large.
    fn split(&self, text: &str, separators: &[&str], base: usize) -> Vec<Fragment> {
        let (sep, rest): (Option<&str>, &[&str]) =
            match separators.iter().position(|s| text.contains(s)) {
                Some(i) => (Some(separators[i]), &separators[i + 1..]),
                None => (None, &[]),
            };

        let fragments = match sep {
            Some(sep) => split_keep_separator(text, sep, base),
            // Character-level fallback: the merge step below reassembles
            // these into exact sliding windows.
            None => text
                .chars()
                .enumerate()
                .map(|(i, c)| Fragment {
                    text: c.to_string(),
                    start: base + i,
                })
                .collect(),
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<Fragment> = Vec::new();

        for frag in fragments {
            if char_len(&frag.text) <= self.chunk_size {
                pending.push(frag);
            } else {
                if !pending.is_empty() {
                    self.merge(&mut chunks, std::mem::take(&mut pending));
                }
                let sub = self.split(&frag.text, rest, frag.start);
                chunks.extend(sub);
            }
        }
        if !pending.is_empty() {
            self.merge(&mut chunks, pending);
        }

        chunks
    }

    /// Greedily pack fragments into windows of at most `chunk_size` chars.
    /// When a window closes, trailing fragments totalling at most `overlap`
    /// characters are carried into the next window.
    fn merge(&self, out: &mut Vec<Fragment>, fragments: Vec<Fragment>) {
        let mut window: VecDeque<Fragment> = VecDeque::new();
        let mut total = 0usize;

        for frag in fragments {
            let flen = char_len(&frag.text);
            if total + flen > self.chunk_size && !window.is_empty() {
                out.push(join_window(&window));
                while total > self.overlap
                    || (total + flen > self.chunk_size && total > 0)
                {
                    if let Some(front) = window.pop_front() {
                        total -= char_len(&front.text);
                    } else {
                        break;
                    }
                }
            }
            total += flen;
            window.push_back(frag);
        }

        if !window.is_empty() {
            out.push(join_window(&window));
        }
    }
}

fn join_window(window: &VecDeque<Fragment>) -> Fragment {
    let mut text = String::new();
    for frag in window {
        text.push_str(&frag.text);
    }
    Fragment {
        text,
        // window is never empty at a call site
        start: window.front().map(|f| f.start).unwrap_or(0),
    }
}

/// Split on `sep`, keeping each separator attached to the fragment that
/// precedes it so that concatenating all fragments reproduces the input.
fn split_keep_separator(text: &str, sep: &str, base: usize) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut offset = base;
    let mut rest = text;

    while let Some(idx) = rest.find(sep) {
        let end = idx + sep.len();
        let piece = &rest[..end];
        fragments.push(Fragment {
            text: piece.to_string(),
            start: offset,
        });
        offset += char_len(piece);
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        fragments.push(Fragment {
            text: rest.to_string(),
            start: offset,
        });
    }

    fragments
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
