//! Text chunking with recursive separators and overlap padding.
//!
//! Sizing works on characters, not bytes. A document is first split on the
//! coarsest separator that brings every piece under `chunk_size`, falling
//! back to finer separators and finally to fixed-width hard cuts. Each sized
//! piece is then padded with up to `chunk_overlap` characters from its
//! neighbours.

use crate::types::{Chunk, Metadata};
use ragline_core::ChunkingSettings;
use serde_json::Value;

/// Separators in order of preference. The empty string means hard cut.
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Splits documents into bounded, overlapping chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_settings(&ChunkingSettings::default())
    }
}

impl TextChunker {
    /// Create a chunker. Overlap is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk `text`, merging `metadata` into every chunk.
    ///
    /// `chunk_index` and `total_chunks` are always set by the chunker and
    /// take precedence over caller fields of the same name.
    pub fn chunk(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        let pieces = self.split(text);
        let total = pieces.len();
        let padded = self.add_overlap(&pieces);

        padded
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunk_index".to_string(), Value::from(index));
                chunk_metadata.insert("total_chunks".to_string(), Value::from(total));
                Chunk {
                    text,
                    metadata: chunk_metadata,
                }
            })
            .collect()
    }

    /// Split `text` into sized pieces without overlap padding.
    ///
    /// Every piece is at most `chunk_size` characters. Whitespace at piece
    /// boundaries is dropped; all other characters are kept in order.
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        self.split_by_separators(text)
            .into_iter()
            .flat_map(|piece| {
                if char_len(&piece) <= self.chunk_size {
                    vec![piece]
                } else {
                    self.hard_cut(&piece)
                }
            })
            .collect()
    }

    fn split_by_separators(&self, text: &str) -> Vec<String> {
        let mut pieces = vec![text.to_string()];

        for separator in SEPARATORS {
            if separator.is_empty() {
                break;
            }

            let mut next = Vec::with_capacity(pieces.len());
            for piece in &pieces {
                if char_len(piece) <= self.chunk_size {
                    next.push(piece.clone());
                } else {
                    self.merge_parts(piece, separator, &mut next);
                }
            }

            pieces = next;
            if pieces.iter().all(|p| char_len(p) <= self.chunk_size) {
                break;
            }
        }

        pieces
    }

    /// Greedily pack separator-delimited parts of `piece` into `out`.
    fn merge_parts(&self, piece: &str, separator: &str, out: &mut Vec<String>) {
        let mut current = String::new();
        let mut current_len = 0;

        // Each part keeps its trailing separator so joined parts are the
        // original text verbatim.
        for part in piece.split_inclusive(separator) {
            let visible_len = char_len(part.trim_end());
            if current.is_empty() || current_len + visible_len <= self.chunk_size {
                current.push_str(part);
                current_len += char_len(part);
            } else {
                push_trimmed(out, &current);
                current = part.to_string();
                current_len = char_len(part);
            }
        }

        push_trimmed(out, &current);
    }

    /// Fixed-width windows with `chunk_size - chunk_overlap` stride.
    fn hard_cut(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let stride = self.chunk_size - self.chunk_overlap;
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let window: String = chars[start..end].iter().collect();
            if !window.trim().is_empty() {
                pieces.push(window);
            }
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        pieces
    }

    fn add_overlap(&self, pieces: &[String]) -> Vec<String> {
        if pieces.len() <= 1 || self.chunk_overlap == 0 {
            return pieces.to_vec();
        }

        let last = pieces.len() - 1;
        pieces
            .iter()
            .enumerate()
            .map(|(i, piece)| {
                let mut padded = String::with_capacity(piece.len() + 2 * self.chunk_overlap + 2);
                if i > 0 {
                    padded.push_str(last_chars(&pieces[i - 1], self.chunk_overlap));
                    padded.push(' ');
                }
                padded.push_str(piece);
                if i < last {
                    padded.push(' ');
                    padded.push_str(first_chars(&pieces[i + 1], self.chunk_overlap));
                }
                padded
            })
            .collect()
    }
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn first_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn last_chars(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if len <= n {
        return s;
    }
    match s.char_indices().nth(len - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
