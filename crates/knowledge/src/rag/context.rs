//! Context window assembly.

use super::types::RetrievedChunk;

/// A partial chunk is only worth including when this much budget remains.
const MIN_PARTIAL_CHARS: usize = 100;

const CHUNK_SEPARATOR: &str = "\n\n";

/// Concatenate chunk texts in order within `max_length` characters.
///
/// Budget counts chunk text only; separators are free. A chunk that does
/// not fit contributes its leading `remaining` characters when more than
/// 100 remain, and assembly stops there.
pub fn build_context(chunks: &[RetrievedChunk], max_length: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut used = 0;

    for chunk in chunks {
        let len = chunk.text.chars().count();
        if used + len <= max_length {
            parts.push(chunk.text.clone());
            used += len;
            continue;
        }

        let remaining = max_length - used;
        if remaining > MIN_PARTIAL_CHARS {
            parts.push(chunk.text.chars().take(remaining).collect());
        }
        break;
    }

    parts.join(CHUNK_SEPARATOR)
}
