//! Source document loading and text extraction.
//!
//! Accepts JSONL crawl output (`{url, text, depth?, title?}` per line) and
//! plain text, Markdown or HTML files.

use crate::types::SourceDocument;
use ragline_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Input format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Jsonl,
    Markdown,
    Html,
    PlainText,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "txt" | "text" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Documents read from one file, plus the number of unusable entries.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<SourceDocument>,
    pub skipped: u32,
    pub bytes: u64,
}

/// Expand files and directories into the supported files to ingest.
///
/// `include` keeps only paths containing one of its substrings (when
/// non-empty); `exclude` drops paths containing any of its substrings.
/// The result is sorted and free of duplicates.
pub fn collect_files(
    paths: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(AppError::Knowledge(format!("Path not found: {:?}", path)));
        }

        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry
                .map_err(|e| AppError::Knowledge(format!("Failed to walk {:?}: {}", path, e)))?;
            let file = entry.path();
            if entry.file_type().is_file() && DocumentKind::from_path(file).is_some() {
                files.push(file.to_path_buf());
            }
        }
    }

    files.retain(|file| {
        let display = file.to_string_lossy();
        let included = include.is_empty() || include.iter().any(|p| display.contains(p.as_str()));
        let excluded = exclude.iter().any(|p| display.contains(p.as_str()));
        included && !excluded
    });
    files.sort();
    files.dedup();

    Ok(files)
}

/// Read every document in `path`.
pub fn load_documents(path: &Path) -> AppResult<LoadedDocuments> {
    let kind = DocumentKind::from_path(path).ok_or_else(|| {
        AppError::Knowledge(format!("Unsupported file type: {:?}", path))
    })?;

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;
    let bytes = raw.len() as u64;

    let mut loaded = match kind {
        DocumentKind::Jsonl => parse_jsonl(&raw, path),
        DocumentKind::Markdown => single(path, clean_markdown(&raw)),
        DocumentKind::Html => single(path, clean_html(&raw)),
        DocumentKind::PlainText => single(path, raw.trim().to_string()),
    };
    loaded.bytes = bytes;

    tracing::debug!(
        "Loaded {} documents from {:?} ({} skipped)",
        loaded.documents.len(),
        path,
        loaded.skipped
    );

    Ok(loaded)
}

fn single(path: &Path, text: String) -> LoadedDocuments {
    if text.trim().is_empty() {
        tracing::warn!("Skipping empty document: {:?}", path);
        return LoadedDocuments {
            skipped: 1,
            ..LoadedDocuments::default()
        };
    }

    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string);

    LoadedDocuments {
        documents: vec![SourceDocument {
            url: path.to_string_lossy().to_string(),
            text,
            depth: 0,
            title,
        }],
        ..LoadedDocuments::default()
    }
}

/// Parse crawl output; bad or text-less lines are skipped with a warning.
pub fn parse_jsonl(raw: &str, path: &Path) -> LoadedDocuments {
    let mut loaded = LoadedDocuments::default();

    for (line_num, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SourceDocument>(line) {
            Ok(doc) if !doc.text.trim().is_empty() && !doc.url.trim().is_empty() => {
                loaded.documents.push(doc)
            }
            Ok(_) => {
                tracing::warn!("{:?} line {}: missing url or text", path, line_num + 1);
                loaded.skipped += 1;
            }
            Err(e) => {
                tracing::warn!("{:?} line {}: {}", path, line_num + 1, e);
                loaded.skipped += 1;
            }
        }
    }

    loaded
}

/// Drop Markdown heading markers, fences and rules; keep the prose.
pub fn clean_markdown(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_start_matches('#').trim())
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("```")
                && !line.starts_with("~~~")
                && !line.chars().all(|c| c == '-' || c == '*' || c == '_')
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip tags, `<script>` and `<style>` bodies; collapse whitespace.
pub fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut skip_until: Option<&str> = None;
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        if skip_until.is_none() {
            result.push_str(&rest[..start]);
            result.push(' ');
        }

        let tag = &rest[start..];
        let end = tag.find('>').map_or(tag.len(), |i| i + 1);
        let name = tag_name(&tag[..end]);

        match skip_until {
            Some(closing) if name == closing => skip_until = None,
            Some(_) => {}
            None if name == "script" => skip_until = Some("/script"),
            None if name == "style" => skip_until = Some("/style"),
            None => {}
        }

        rest = &tag[end..];
    }
    if skip_until.is_none() {
        result.push_str(rest);
    }

    decode_entities(&result)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_end_matches('>')
        .split(|c: char| c.is_whitespace() || c == '>')
        .next()
        .unwrap_or("")
        .trim_end_matches('/')
        .to_ascii_lowercase()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
