//! Source extraction and ranking.

use super::types::{RetrievedChunk, Source};
use ragline_core::RagSettings;
use std::collections::HashSet;

/// Turn retrieved chunks into deduplicated, score-ordered citations.
///
/// - chunks without a URL are skipped
/// - a URL matching a denylist pattern is kept only when its score exceeds
///   the high-confidence threshold
/// - the first occurrence of a URL wins
/// - the result is stably sorted by descending score
pub fn extract_sources(chunks: &[RetrievedChunk], settings: &RagSettings) -> Vec<Source> {
    let denylist: Vec<String> = settings
        .denylist
        .iter()
        .map(|p| p.to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for chunk in chunks {
        if chunk.url.is_empty() || seen.contains(&chunk.url) {
            continue;
        }

        if is_denied(&chunk.url, &denylist) && chunk.score <= settings.high_confidence_score {
            tracing::debug!(
                "Excluding source {} (denylisted, score {:.3})",
                chunk.url,
                chunk.score
            );
            continue;
        }

        seen.insert(chunk.url.clone());
        sources.push(Source {
            url: chunk.url.clone(),
            title: chunk.title().map(str::to_string),
            snippet: snippet(&chunk.text, settings.snippet_length),
            score: chunk.score,
        });
    }

    sources.sort_by(|a, b| b.score.total_cmp(&a.score));
    sources
}

fn is_denied(url: &str, denylist: &[String]) -> bool {
    let url = url.to_lowercase();
    denylist.iter().any(|pattern| url.contains(pattern.as_str()))
}

/// At most `max_chars` characters; truncated text ends in "...".
pub fn snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut snippet: String = text.chars().take(keep).collect();
    snippet.push_str("...");
    snippet
}
