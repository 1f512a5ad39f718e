use crate::error::IngestError;
use crate::models::{Document, DocumentChunk, IngestionOptions};
use sha2::{Digest, Sha256};

/// Split points in priority order. A window ends right after the last
/// separator of the highest level that occurs past the overlap region.
const SEPARATOR_LEVELS: [&[&str]; 4] = [&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self, IngestError> {
        let config = Self {
            max_chars,
            overlap_chars,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    pub start: usize,
    pub text: String,
}

/// Tidies extracted text without moving paragraph breaks: CRLF becomes LF,
/// trailing spaces are dropped from each line and runs of blank lines
/// collapse into a single blank line.
pub fn tidy_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n").replace('\u{a0}', " ");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;

    for line in unified.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = 0;
    }

    out
}

pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<TextWindow>, IngestError> {
    config.validate()?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let mut windows = Vec::new();
    let mut start = 0usize;

    loop {
        let limit = (start + config.max_chars).min(chars.len());
        let end = if limit == chars.len() {
            limit
        } else {
            // Ending past start + overlap keeps the next start moving forward.
            find_split(&chars, start, start + config.overlap_chars + 1, limit).unwrap_or(limit)
        };

        windows.push(TextWindow {
            start,
            text: chars[start..end].iter().collect(),
        });

        if end == chars.len() {
            break;
        }
        start = end - config.overlap_chars;
    }

    Ok(windows)
}

fn find_split(chars: &[char], start: usize, min_end: usize, max_end: usize) -> Option<usize> {
    for level in SEPARATOR_LEVELS {
        for end in (min_end..=max_end).rev() {
            let matched = level.iter().any(|separator| {
                let width = separator.chars().count();
                end >= start + width
                    && chars[end - width..end]
                        .iter()
                        .copied()
                        .eq(separator.chars())
            });
            if matched {
                return Some(end);
            }
        }
    }
    None
}

pub fn build_chunks(
    documents: &[Document],
    config: ChunkingConfig,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for document in documents {
        for window in split_text(&document.text, config)? {
            chunks.push(DocumentChunk {
                chunk_id: make_chunk_id(&document.document_id, cursor, &window.text),
                document_id: document.document_id.clone(),
                source_path: document.source_path.clone(),
                title: document.title.clone(),
                chunk_index: cursor,
                start_char: window.start,
                text: window.text,
            });
            cursor = cursor.saturating_add(1);
        }
    }

    Ok(chunks)
}

fn make_chunk_id(document_id: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
