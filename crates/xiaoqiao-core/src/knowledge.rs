//! Keyword-retrieval knowledge base.
//!
//! Loads a markdown document, splits it into overlapping chunks, and returns
//! the chunks sharing the most terms with a question. There is no embedding
//! index; retrieval is plain term containment.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Characters carried over between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 80;

/// Split points, coarsest first. The empty separator splits per character.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A chunked reference document.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    source: Option<PathBuf>,
    chunks: Vec<String>,
}

impl KnowledgeBase {
    /// Load and chunk a knowledge file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!("knowledge base file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read knowledge base: {}", path.display()))?;

        let mut kb = Self::from_text(&content);
        kb.source = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            chunks = kb.chunks.len(),
            "knowledge base loaded"
        );
        Ok(kb)
    }

    /// Chunk in-memory text with the default sizes.
    pub fn from_text(text: &str) -> Self {
        Self::with_chunking(text, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }

    /// Chunk in-memory text with explicit sizes.
    pub fn with_chunking(text: &str, chunk_size: usize, overlap: usize) -> Self {
        Self {
            source: None,
            chunks: split_text(text, chunk_size, overlap),
        }
    }

    /// File the knowledge base was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Up to `k` chunks most relevant to `query`, joined by newlines.
    ///
    /// Chunks are ranked by how many distinct query terms they contain; ties
    /// keep document order. When nothing matches, the first `k` chunks are
    /// returned instead.
    pub fn retrieve(&self, query: &str, k: usize) -> String {
        if self.chunks.is_empty() || k == 0 {
            return String::new();
        }

        let terms = query_terms(query);
        let mut scored: Vec<(usize, &str)> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let text = chunk.to_lowercase();
                let score = terms.iter().filter(|t| text.contains(t.as_str())).count();
                (score > 0).then_some((score, chunk.as_str()))
            })
            .collect();

        if scored.is_empty() {
            tracing::debug!(query, "no knowledge chunk matched, using leading chunks");
            return self
                .chunks
                .iter()
                .take(k)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n");
        }

        // stable: equal scores stay in document order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(_, chunk)| chunk)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lowercased runs of alphanumeric characters and `_`. A run of CJK
/// characters is a single term.
fn query_terms(query: &str) -> BTreeSet<String> {
    query
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recursively split `text` into trimmed chunks of at most `chunk_size`
/// characters, with up to `overlap` characters repeated between neighbours.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let size = chunk_size.max(1);
    split_recursive(text, &SEPARATORS, size, overlap)
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(text: &str, separators: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let Some(position) = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
    else {
        return vec![text.to_string()];
    };
    let separator = separators[position];
    let finer = &separators[position + 1..];

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    };
    let sep_len = char_len(separator);

    let mut chunks = Vec::new();
    let mut window: Vec<String> = Vec::new();
    // characters in window.join(separator)
    let mut window_len = 0usize;

    for piece in pieces {
        let piece_len = char_len(&piece);

        if piece_len > size {
            if !window.is_empty() {
                chunks.push(window.join(separator));
                window.clear();
                window_len = 0;
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(split_recursive(&piece, finer, size, overlap));
            }
            continue;
        }

        if !window.is_empty() && window_len + sep_len + piece_len > size {
            chunks.push(window.join(separator));
            while !window.is_empty()
                && (window_len > overlap || window_len + sep_len + piece_len > size)
            {
                let removed = window.remove(0);
                window_len -= char_len(&removed);
                if !window.is_empty() {
                    window_len -= sep_len;
                }
            }
        }

        if !window.is_empty() {
            window_len += sep_len;
        }
        window_len += piece_len;
        window.push(piece);
    }

    if !window.is_empty() {
        chunks.push(window.join(separator));
    }
    chunks
}
