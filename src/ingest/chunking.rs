//! Sentence-aware text chunking.

use regex::Regex;
use std::sync::OnceLock;

/// Splits text into overlapping chunks on sentence boundaries.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    /// Target maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters of trailing sentences repeated at the start of the next chunk.
    pub overlap: usize,
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 100,
        }
    }
}

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]+\s+").expect("static regex"))
}

/// Split text into sentences, keeping terminal punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sentences = Vec::new();
    let mut start = 0;
    for m in sentence_boundary().find_iter(&normalized) {
        let sentence = normalized[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }
    let rest = normalized[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

impl SentenceChunker {
    /// Create a chunker with the given size and overlap.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap }
    }

    /// Chunk `text`. Sentences are never split; an oversize sentence becomes its own chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut i = 0;

        while i < sentences.len() {
            let mut current: Vec<&str> = Vec::new();
            let mut size = 0;
            let mut j = i;

            while j < sentences.len() {
                let len = sentences[j].len() + usize::from(!current.is_empty());
                if !current.is_empty() && size + len > self.chunk_size {
                    break;
                }
                current.push(&sentences[j]);
                size += len;
                j += 1;
            }

            chunks.push(current.join(" "));

            if j >= sentences.len() {
                break;
            }

            // Step back over trailing sentences that fit in the overlap budget,
            // but always advance by at least one sentence.
            let mut carried = 0;
            let mut overlap_size = 0;
            for sentence in current.iter().rev() {
                let len = sentence.len() + 1;
                if overlap_size + len > self.overlap || carried + 1 >= current.len() {
                    break;
                }
                overlap_size += len;
                carried += 1;
            }
            i = j - carried;
        }

        chunks
    }
}
