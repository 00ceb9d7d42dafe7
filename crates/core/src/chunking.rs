use crate::error::IngestError;
use crate::models::{Chunk, PageDocument};
use regex::Regex;
use tracing::info;

/// Cut points preferred when a split is needed: after sentence terminators.
const SENTENCE_BOUNDARY: &str = r"[.!?]+\s+";

/// Bounds on retrieval units. `overlap` is the number of characters
/// consecutive chunks from one page may share.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap} must be smaller than chunk size {chunk_size}"
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 50,
        }
    }
}

/// Splits `text` into pieces of at most `chunk_size` characters, breaking at
/// paragraph, then sentence, then word boundaries before falling back to a
/// hard character cut. Consecutive pieces share at most `overlap` characters.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, IngestError> {
    let sentence_re = Regex::new(SENTENCE_BOUNDARY)?;
    let mut fragments = Vec::new();
    collect_fragments(text, config, &sentence_re, 0, &mut fragments);
    Ok(merge_fragments(fragments, config))
}

/// Splits every page into ordered chunks, assigning a global sequence index
/// across the whole load. Empty input yields empty output.
pub fn chunk_documents(
    documents: &[PageDocument],
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    if documents.is_empty() {
        info!("no documents to chunk");
        return Ok(Vec::new());
    }

    let sentence_re = Regex::new(SENTENCE_BOUNDARY)?;
    let mut chunks = Vec::new();
    let mut sequence = 0u64;

    for document in documents {
        let mut fragments = Vec::new();
        collect_fragments(&document.text, config, &sentence_re, 0, &mut fragments);

        for text in merge_fragments(fragments, config) {
            chunks.push(Chunk {
                document_id: document.document_id.clone(),
                source_path: document.source_path.clone(),
                page: document.page,
                sequence,
                text,
            });
            sequence = sequence.saturating_add(1);
        }
    }

    Ok(chunks)
}

/// Recursive descent through boundary levels. A piece that fits the chunk
/// size is emitted as-is; an oversized piece is split at the next-finer
/// boundary, down to the hard character cut.
fn collect_fragments(
    text: &str,
    config: &ChunkingConfig,
    sentence_re: &Regex,
    level: usize,
    out: &mut Vec<String>,
) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }

    if trimmed.chars().count() <= config.chunk_size {
        out.push(trimmed.to_string());
        return;
    }

    if level >= 3 {
        out.extend(hard_cut(trimmed, config));
        return;
    }

    let parts: Vec<String> = match level {
        0 => trimmed.split("\n\n").map(str::to_string).collect(),
        1 => split_sentences(trimmed, sentence_re),
        _ => trimmed.split_whitespace().map(str::to_string).collect(),
    };

    if parts.len() <= 1 {
        collect_fragments(trimmed, config, sentence_re, level + 1, out);
        return;
    }

    for part in parts {
        collect_fragments(&part, config, sentence_re, level + 1, out);
    }
}

fn split_sentences(text: &str, sentence_re: &Regex) -> Vec<String> {
    let mut parts = Vec::new();
    let mut last = 0;

    for found in sentence_re.find_iter(text) {
        parts.push(text[last..found.end()].to_string());
        last = found.end();
    }

    if last < text.len() {
        parts.push(text[last..].to_string());
    }

    parts
}

/// Fixed windows of `chunk_size` characters advancing by
/// `chunk_size - overlap`, so consecutive windows share `overlap` characters.
fn hard_cut(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        pieces.push(piece);
        if end == chars.len() {
            break;
        }
        start = start.saturating_add(config.chunk_size.saturating_sub(config.overlap));
    }

    pieces
}

fn joined_len(parts: &[String]) -> usize {
    if parts.is_empty() {
        return 0;
    }
    parts.iter().map(|part| part.chars().count()).sum::<usize>() + parts.len() - 1
}

/// Greedily packs fragments into chunks of at most `chunk_size` characters.
/// When a chunk is emitted, a tail of whole fragments totalling at most
/// `overlap` characters is carried into the next chunk.
fn merge_fragments(fragments: Vec<String>, config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<String> = Vec::new();
    let mut fresh = 0usize;

    for fragment in fragments {
        let fragment_len = fragment.chars().count();
        let projected = if window.is_empty() {
            fragment_len
        } else {
            joined_len(&window) + 1 + fragment_len
        };

        if projected > config.chunk_size && !window.is_empty() {
            chunks.push(window.join(" "));
            fresh = 0;

            while !window.is_empty()
                && (joined_len(&window) > config.overlap
                    || joined_len(&window) + 1 + fragment_len > config.chunk_size)
            {
                window.remove(0);
            }
        }

        window.push(fragment);
        fresh += 1;
    }

    if fresh > 0 && !window.is_empty() {
        chunks.push(window.join(" "));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::{chunk_documents, split_text, ChunkingConfig};
    use crate::models::PageDocument;
    use chrono::Utc;

    fn page(document_id: &str, page: u32, text: &str) -> PageDocument {
        PageDocument {
            document_id: document_id.to_string(),
            title: format!("{document_id}.pdf"),
            source_path: format!("/tmp/{document_id}.pdf"),
            checksum: "checksum".to_string(),
            page,
            text: text.to_string(),
            loaded_at: Utc::now(),
        }
    }

    fn shared_boundary_len(left: &str, right: &str) -> usize {
        let left: Vec<char> = left.chars().collect();
        let right: Vec<char> = right.chars().collect();
        (1..=left.len().min(right.len()))
            .rev()
            .find(|&length| left[left.len() - length..] == right[..length])
            .unwrap_or(0)
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(ChunkingConfig::new(100, 100).is_err());
        assert!(ChunkingConfig::new(100, 150).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(100, 99).is_ok());
    }

    #[test]
    fn continuous_text_of_2000_chars_yields_three_chunks() {
        let config = ChunkingConfig::new(800, 50).unwrap();
        let text: String = (0..500).map(|index| format!("{index:04}")).collect();
        assert_eq!(text.len(), 2000);

        let pieces = split_text(&text, &config).unwrap();

        assert_eq!(pieces.len(), 3);
        for piece in &pieces {
            assert!(piece.chars().count() <= 800);
        }
        assert_eq!(pieces[0], text[0..800]);
        assert_eq!(pieces[1], text[750..1550]);
        assert_eq!(pieces[2], text[1500..2000]);
        for pair in pieces.windows(2) {
            assert!(shared_boundary_len(&pair[0], &pair[1]) <= 50);
        }
    }

    #[test]
    fn chunks_never_exceed_chunk_size() {
        let config = ChunkingConfig::new(120, 20).unwrap();
        let words: Vec<String> = (0..200).map(|index| format!("w{index:04}")).collect();
        let text = words.join(" ");

        let pieces = split_text(&text, &config).unwrap();

        assert!(!pieces.is_empty());
        for piece in &pieces {
            assert!(piece.chars().count() <= 120, "oversized piece: {piece:?}");
        }
    }

    #[test]
    fn consecutive_chunks_share_at_most_overlap() {
        let config = ChunkingConfig::new(120, 20).unwrap();
        let words: Vec<String> = (0..200).map(|index| format!("w{index:04}")).collect();
        let text = words.join(" ");

        let pieces = split_text(&text, &config).unwrap();

        for pair in pieces.windows(2) {
            assert!(
                shared_boundary_len(&pair[0], &pair[1]) <= 20,
                "overlap too large between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn sentences_are_kept_whole_when_they_fit() {
        let config = ChunkingConfig::new(80, 10).unwrap();
        let text = "First sentence here. Second sentence follows on. Third one closes it out. \
                    Fourth sentence continues. Fifth sentence ends the block.";

        let pieces = split_text(text, &config).unwrap();

        assert!(pieces.len() > 1);
        for piece in &pieces[..pieces.len() - 1] {
            assert!(
                piece.ends_with('.'),
                "chunk should end at a sentence boundary: {piece:?}"
            );
        }
    }

    #[test]
    fn paragraphs_are_preferred_over_sentences() {
        let config = ChunkingConfig::new(60, 5).unwrap();
        let text = "Alpha paragraph body sits here fully.\n\nBeta paragraph body sits here fully.";

        let pieces = split_text(text, &config).unwrap();

        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].starts_with("Alpha"));
        assert!(pieces[1].starts_with("Beta"));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let config = ChunkingConfig::default();
        assert!(chunk_documents(&[], &config).unwrap().is_empty());
        assert!(split_text("   \n\n  ", &config).unwrap().is_empty());
    }

    #[test]
    fn sequence_is_global_across_documents() {
        let config = ChunkingConfig::new(40, 5).unwrap();
        let documents = vec![
            page("doc-a", 1, "One short page of text that needs a couple of chunks to hold."),
            page("doc-b", 1, "Another page with enough words to spill over the boundary too."),
        ];

        let chunks = chunk_documents(&documents, &config).unwrap();

        assert!(chunks.len() > 2);
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence, index as u64);
        }
        assert_eq!(chunks.first().unwrap().document_id, "doc-a");
        assert_eq!(chunks.last().unwrap().document_id, "doc-b");
    }
}
