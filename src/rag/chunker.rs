//! Text chunking for document ingestion.
//!
//! Two strategies are available:
//!
//! - [`ChunkingStrategy::Recursive`] (default) splits on a priority list of
//!   separators (paragraph, line, sentence, word, character) until every
//!   piece fits, then greedily packs neighbouring pieces back together.
//!   Consecutive chunks share up to `overlap` characters.
//! - [`ChunkingStrategy::Semantic`] delegates to `text-splitter`, which
//!   splits on Unicode sentence and word boundaries.
//!
//! Sizes are counted in `char`s. Every chunk records the byte span it was
//! cut from, so for the recursive strategy the chunks joined without their
//! overlapping prefixes give back the input.

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use text_splitter::{ChunkConfig, TextSplitter};

/// Separators tried in order by the recursive strategy.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Chunking algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Separator-driven recursive splitting with character overlap
    #[default]
    Recursive,
    /// Unicode sentence/word boundaries via text-splitter
    Semantic,
}

impl FromStr for ChunkingStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "recursive" | "character" | "default" => Ok(Self::Recursive),
            "semantic" | "sentence" | "unicode" => Ok(Self::Semantic),
            _ => Err(AppError::InvalidInput(format!(
                "Unknown chunking strategy: {}. Use: recursive, semantic",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Recursive => "recursive",
            Self::Semantic => "semantic",
        };
        write!(f, "{}", name)
    }
}

/// A passage cut from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position in the output sequence, starting at 0
    pub index: usize,
    /// Chunk text, exactly `source[start..end]`
    pub content: String,
    /// Byte offset of the first byte in the source
    pub start: usize,
    /// Byte offset one past the last byte in the source
    pub end: usize,
}

impl TextChunk {
    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Configured chunker.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    strategy: ChunkingStrategy,
}

impl Chunker {
    /// Recursive chunker with the default separators.
    ///
    /// Fails with `InvalidInput` if `chunk_size` is 0 or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        validate_sizes(chunk_size, overlap)?;
        Ok(Self {
            chunk_size,
            overlap,
            strategy: ChunkingStrategy::Recursive,
        })
    }

    pub fn with_strategy(mut self, strategy: ChunkingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    /// Split `text` into ordered chunks. Deterministic.
    pub fn split(&self, text: &str) -> Result<Vec<TextChunk>> {
        match self.strategy {
            ChunkingStrategy::Recursive => Ok(split_recursive(
                text,
                self.chunk_size,
                self.overlap,
                &DEFAULT_SEPARATORS,
            )),
            ChunkingStrategy::Semantic => split_semantic(text, self.chunk_size, self.overlap),
        }
    }
}

/// Split with the recursive strategy.
///
/// Free-function form of [`Chunker::split`] for callers that don't keep a
/// configured chunker around.
pub fn split(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    separators: &[&str],
) -> Result<Vec<TextChunk>> {
    validate_sizes(chunk_size, overlap)?;
    Ok(split_recursive(text, chunk_size, overlap, separators))
}

fn validate_sizes(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(AppError::InvalidInput(
            "chunk size must be greater than 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(AppError::InvalidInput(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Contiguous byte range of the source with its char length.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

fn split_recursive(text: &str, chunk_size: usize, overlap: usize, separators: &[&str]) -> Vec<TextChunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    collect_pieces(text, 0, text.len(), separators, chunk_size, &mut pieces);
    let spans = merge_pieces(&pieces, chunk_size, overlap);

    spans
        .into_iter()
        .map(|(start, end)| (start, end, &text[start..end]))
        .filter(|(_, _, content)| !content.trim().is_empty())
        .enumerate()
        .map(|(index, (start, end, content))| TextChunk {
            index,
            content: content.to_string(),
            start,
            end,
        })
        .collect()
}

/// Break `text[start..end]` into pieces of at most `chunk_size` chars.
///
/// Separators stay attached to the piece on their left so that pieces tile
/// the source exactly.
fn collect_pieces(
    text: &str,
    start: usize,
    end: usize,
    separators: &[&str],
    chunk_size: usize,
    out: &mut Vec<Piece>,
) {
    let segment = &text[start..end];
    let chars = segment.chars().count();
    if chars <= chunk_size {
        out.push(Piece { start, end, chars });
        return;
    }

    let found = separators
        .iter()
        .position(|sep| !sep.is_empty() && segment.contains(sep));

    let Some(pos) = found else {
        // "" or nothing matched: fall back to single characters.
        for (offset, ch) in segment.char_indices() {
            out.push(Piece {
                start: start + offset,
                end: start + offset + ch.len_utf8(),
                chars: 1,
            });
        }
        return;
    };

    let sep = separators[pos];
    let rest = &separators[pos + 1..];
    let mut last = 0;
    for (idx, matched) in segment.match_indices(sep) {
        let cut = idx + matched.len();
        if cut > last {
            collect_pieces(text, start + last, start + cut, rest, chunk_size, out);
        }
        last = cut;
    }
    if last < segment.len() {
        collect_pieces(text, start + last, end, rest, chunk_size, out);
    }
}

/// Greedily pack pieces into spans of at most `chunk_size` chars, starting
/// each new span up to `overlap` chars before the previous one ended.
fn merge_pieces(pieces: &[Piece], chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let n = pieces.len();
    let mut spans = Vec::new();
    let mut s = 0;

    while s < n {
        let mut e = s;
        let mut total = 0;
        while e < n && total + pieces[e].chars <= chunk_size {
            total += pieces[e].chars;
            e += 1;
        }
        spans.push((pieces[s].start, pieces[e - 1].end));
        if e == n {
            break;
        }

        // Walk back over trailing pieces while they fit in the overlap, but
        // always move forward by at least one piece.
        let mut j = e;
        let mut carried = 0;
        while j > s + 1 && carried + pieces[j - 1].chars <= overlap {
            carried += pieces[j - 1].chars;
            j -= 1;
        }
        // The next span must still have room for piece `e`.
        while j < e && carried + pieces[e].chars > chunk_size {
            carried -= pieces[j].chars;
            j += 1;
        }
        s = j;
    }

    spans
}

fn split_semantic(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    validate_sizes(chunk_size, overlap)?;
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::InvalidInput(format!("Invalid chunk configuration: {}", e)))?;
    let splitter = TextSplitter::new(config);

    Ok(splitter
        .chunk_indices(text)
        .filter(|(_, content)| !content.trim().is_empty())
        .enumerate()
        .map(|(index, (start, content))| TextChunk {
            index,
            content: content.to_string(),
            start,
            end: start + content.len(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Join chunks, skipping the bytes each chunk shares with the previous one.
    fn reconstruct(text: &str, chunks: &[TextChunk]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for chunk in chunks {
            assert!(chunk.start <= covered, "gap before chunk {}", chunk.index);
            if chunk.end > covered {
                out.push_str(&text[covered..chunk.end]);
                covered = chunk.end;
            }
        }
        out
    }

    fn sample_text() -> String {
        let para = "Supervised learning trains a model on labelled examples. \
                    Each example pairs an input with the expected output. \
                    The model learns a mapping it can apply to new inputs.";
        let other = "Unsupervised learning has no labels.\nIt looks for structure: \
                     clusters, densities and latent factors.\nDimensionality \
                     reduction is a common example.";
        format!("{}\n\n{}\n\n{}\n\n{}", para, other, para, other)
    }

    #[test]
    fn test_short_input_is_one_chunk() {
        let chunker = Chunker::new(100, 10).unwrap();
        let chunks = chunker.split("A short note.").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "A short note.");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 13));
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert!(chunker.split("").unwrap().is_empty());
        assert!(chunker.split("   \n\n  \t ").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(matches!(Chunker::new(0, 0), Err(AppError::InvalidInput(_))));
        assert!(matches!(Chunker::new(10, 10), Err(AppError::InvalidInput(_))));
        assert!(matches!(
            split("text", 5, 7, &DEFAULT_SEPARATORS),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_chunks_respect_size_and_reconstruct() {
        let text = sample_text();
        for (size, overlap) in [(500, 100), (120, 30), (60, 0), (25, 5)] {
            let chunks = Chunker::new(size, overlap).unwrap().split(&text).unwrap();
            assert!(chunks.len() >= 2, "size {} produced one chunk", size);
            for chunk in &chunks {
                assert!(chunk.char_len() <= size, "chunk over {} chars", size);
                assert!(!chunk.content.trim().is_empty());
                assert_eq!(chunk.content, &text[chunk.start..chunk.end]);
            }
            assert_eq!(reconstruct(&text, &chunks), text);
        }
    }

    #[test]
    fn test_overlap_is_bounded() {
        let text = sample_text();
        let chunks = Chunker::new(120, 30).unwrap().split(&text).unwrap();
        let mut saw_overlap = false;
        for pair in chunks.windows(2) {
            assert!(pair[1].start > pair[0].start, "chunks must advance");
            if pair[1].start < pair[0].end {
                saw_overlap = true;
                let shared = text[pair[1].start..pair[0].end].chars().count();
                assert!(shared <= 30);
            }
        }
        assert!(saw_overlap);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = Chunker::new(30, 0).unwrap().split(text).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "First paragraph here.\n\n");
        assert_eq!(chunks[1].content, "Second paragraph here.");
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let text = "x".repeat(23);
        let chunks = Chunker::new(10, 3).unwrap().split(&text).unwrap();
        assert!(chunks.iter().all(|c| c.char_len() <= 10));
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "données été naïve ünïcödé ".repeat(20);
        let chunks = Chunker::new(40, 8).unwrap().split(&text).unwrap();
        for chunk in &chunks {
            assert!(chunk.char_len() <= 40);
            assert!(text.is_char_boundary(chunk.start));
            assert!(text.is_char_boundary(chunk.end));
        }
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text();
        let chunker = Chunker::new(80, 20).unwrap();
        assert_eq!(chunker.split(&text).unwrap(), chunker.split(&text).unwrap());
    }

    #[test]
    fn test_indices_are_sequential_after_filtering() {
        let text = format!("{}\n\n\n\n\n\n{}", "a".repeat(8), "b".repeat(8));
        let chunks = Chunker::new(8, 0).unwrap().split(&text).unwrap();
        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
        assert!(chunks.iter().all(|c| !c.content.trim().is_empty()));
    }

    #[test]
    fn test_semantic_strategy_respects_size() {
        let text = sample_text();
        let chunker = Chunker::new(100, 20)
            .unwrap()
            .with_strategy(ChunkingStrategy::Semantic);
        let chunks = chunker.split(&text).unwrap();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 100);
            assert_eq!(chunk.content, &text[chunk.start..chunk.end]);
        }
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "Semantic".parse::<ChunkingStrategy>().unwrap(),
            ChunkingStrategy::Semantic
        );
        assert_eq!(
            "recursive".parse::<ChunkingStrategy>().unwrap(),
            ChunkingStrategy::Recursive
        );
        assert!("tokens".parse::<ChunkingStrategy>().is_err());
        assert_eq!(ChunkingStrategy::Semantic.to_string(), "semantic");
    }
}
