use crate::error::LoadError;
use crate::models::Chunk;
use sha2::{Digest, Sha256};

pub const DEFAULT_CHUNK_MAX_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Soft budget in characters. A single word longer than this still
    /// becomes its own chunk.
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_MAX_CHARS,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.max_chars == 0 {
            return Err(LoadError::InvalidChunkConfig(
                "max_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Greedily packs whitespace-separated words into chunks of at most
/// `config.max_chars` characters, never splitting a word.
pub fn chunk_by_words(text: &str, config: ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_chars = word_chars;
            continue;
        }

        if current_chars + 1 + word_chars > config.max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_chars = word_chars;
        } else {
            current.push(' ');
            current.push_str(word);
            current_chars += 1 + word_chars;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

pub fn build_chunks(
    document_checksum: &str,
    text: &str,
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, LoadError> {
    config.validate()?;

    Ok(chunk_by_words(text, config)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            chunk_id: make_chunk_id(document_checksum, index, &text),
            index,
            text,
        })
        .collect())
}

fn make_chunk_id(document_checksum: &str, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_checksum.as_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
