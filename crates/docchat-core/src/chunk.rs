//! Overlapping, boundary-aware text chunker.
//!
//! Splits the pages of a loaded document into [`Chunk`]s of at most
//! [`CHUNK_SIZE`] characters, where every chunk after the first starts with
//! the last [`CHUNK_OVERLAP`] characters of its predecessor.
//!
//! Lengths are counted in Unicode scalar values, never bytes, so multibyte
//! text is cut on character boundaries.
//!
//! # Algorithm
//!
//! 1. Normalize whitespace on each page and drop pages left empty.
//! 2. Join pages with a paragraph break (`\n\n`), remembering where each
//!    page starts so chunks can report their page.
//! 3. From the current start, if the rest fits in one chunk, emit it.
//! 4. Otherwise choose the cut as the rightmost boundary inside the window,
//!    trying in order: paragraph, line, sentence end, word. Preferred
//!    boundaries must fall in the second half of the window.
//! 5. Failing that, cut at any whitespace that still makes progress, and
//!    finally at the raw window edge.
//! 6. The next chunk starts `CHUNK_OVERLAP` characters before the cut.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::chunk::chunk_pages;
//!
//! let chunks = chunk_pages(&["Hello world.", "Second page."]);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "Hello world.\n\nSecond page.");
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Maximum characters per chunk.
pub const CHUNK_SIZE: usize = 520;

/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 20;

/// Boundary classes, highest priority first. Within a class the rightmost
/// match wins.
const BOUNDARIES: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

/// Split a document's pages into overlapping chunks.
///
/// Returns an empty vector when no page contains any text.
///
/// # Guarantees
///
/// - No chunk exceeds [`CHUNK_SIZE`] characters and none is blank.
/// - Chunk `i + 1` begins with the last [`CHUNK_OVERLAP`] characters of
///   chunk `i`.
/// - Chunk indices are contiguous: `0, 1, 2, …, N-1`.
/// - Same input, same chunk texts, pages and hashes.
pub fn chunk_pages<S: AsRef<str>>(pages: &[S]) -> Vec<Chunk> {
    split_pages(pages, CHUNK_SIZE, CHUNK_OVERLAP)
}

fn split_pages<S: AsRef<str>>(pages: &[S], size: usize, overlap: usize) -> Vec<Chunk> {
    let overlap = overlap.min(size.saturating_sub(1));
    let (chars, page_starts) = join_pages(pages);
    let len = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let end = if len - start <= size {
            len
        } else {
            find_cut(&chars, start, size, overlap)
        };
        let text: String = chars[start..end].iter().collect();
        let page = page_at(&page_starts, start);
        chunks.push(make_chunk(chunks.len() as i64, page, &text));
        if end == len {
            break;
        }
        start = end - overlap;
    }

    chunks
}

/// Normalize and join pages, returning the characters plus `(offset, page)`
/// pairs marking where each non-empty page begins.
fn join_pages<S: AsRef<str>>(pages: &[S]) -> (Vec<char>, Vec<(usize, i64)>) {
    let mut chars = Vec::new();
    let mut page_starts = Vec::new();

    for (page, raw) in pages.iter().enumerate() {
        let text = normalize_whitespace(raw.as_ref());
        if text.is_empty() {
            continue;
        }
        if !chars.is_empty() {
            chars.extend(['\n', '\n']);
        }
        page_starts.push((chars.len(), page as i64));
        chars.extend(text.chars());
    }

    (chars, page_starts)
}

/// Collapse runs of horizontal whitespace to one space and runs of three or
/// more newlines to a paragraph break. Leading and trailing whitespace is
/// removed.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    let mut pending_space = false;

    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => {
                newlines += 1;
                pending_space = false;
            }
            c if c.is_whitespace() => {
                if newlines == 0 {
                    pending_space = true;
                }
            }
            c => {
                if !out.is_empty() {
                    if newlines >= 2 {
                        out.push_str("\n\n");
                    } else if newlines == 1 {
                        out.push('\n');
                    } else if pending_space {
                        out.push(' ');
                    }
                }
                newlines = 0;
                pending_space = false;
                out.push(c);
            }
        }
    }

    out
}

/// Pick the exclusive end of the chunk starting at `start`.
fn find_cut(chars: &[char], start: usize, size: usize, overlap: usize) -> usize {
    let max_end = start + size;
    // The next chunk starts at `end - overlap`, which must move forward.
    let min_end = start + overlap + 1;
    let preferred_min = (start + size / 2).max(min_end);

    for class in BOUNDARIES {
        if let Some(end) = rightmost_boundary(chars, class, preferred_min, max_end) {
            return end;
        }
    }

    rightmost_boundary(chars, &[" ", "\n"], min_end, max_end).unwrap_or(max_end)
}

/// Rightmost position `p` in `lo..=hi` such that one of `separators` ends
/// exactly at `p`.
fn rightmost_boundary(chars: &[char], separators: &[&str], lo: usize, hi: usize) -> Option<usize> {
    let separators: Vec<Vec<char>> = separators.iter().map(|s| s.chars().collect()).collect();
    (lo..=hi.min(chars.len())).rev().find(|&p| {
        separators
            .iter()
            .any(|sep| p >= sep.len() && chars[p - sep.len()..p] == sep[..])
    })
}

fn page_at(page_starts: &[(usize, i64)], offset: usize) -> i64 {
    page_starts
        .iter()
        .take_while(|(start, _)| *start <= offset)
        .last()
        .map(|(_, page)| *page)
        .unwrap_or(0)
}

/// Create a single [`Chunk`] with a UUID and SHA-256 content hash.
fn make_chunk(index: i64, page: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        chunk_index: index,
        page,
        text: text.to_string(),
        hash,
    }
}
