use crate::chunking::{build_chunks, normalize_whitespace, ChunkingConfig};
use crate::error::LoadError;
use crate::extractor::{join_pages, LopdfExtractor, PdfExtractor};
use crate::models::{Chunk, DocumentFingerprint};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Debug)]
pub struct LoadedDocument {
    pub fingerprint: DocumentFingerprint,
    pub text: String,
    pub chunks: Vec<Chunk>,
}

/// Owns the single source document and its chunk sequence.
///
/// The first successful [`DocumentIndex::load`] populates both; concurrent
/// callers wait on the same in-flight load instead of parsing twice. A failed
/// load leaves the index empty so a later call can try again.
pub struct DocumentIndex {
    path: PathBuf,
    config: ChunkingConfig,
    extractor: Arc<dyn PdfExtractor>,
    loaded: OnceCell<Arc<LoadedDocument>>,
}

impl DocumentIndex {
    pub fn new(path: impl Into<PathBuf>, config: ChunkingConfig) -> Self {
        Self::with_extractor(path, config, Arc::new(LopdfExtractor))
    }

    pub fn with_extractor(
        path: impl Into<PathBuf>,
        config: ChunkingConfig,
        extractor: Arc<dyn PdfExtractor>,
    ) -> Self {
        Self {
            path: path.into(),
            config,
            extractor,
            loaded: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    pub fn document(&self) -> Option<Arc<LoadedDocument>> {
        self.loaded.get().cloned()
    }

    /// The cached chunk sequence, or an empty slice when nothing was loaded.
    pub fn chunks(&self) -> &[Chunk] {
        self.loaded
            .get()
            .map(|document| document.chunks.as_slice())
            .unwrap_or_default()
    }

    pub async fn load(&self) -> Result<Arc<LoadedDocument>, LoadError> {
        let document = self
            .loaded
            .get_or_try_init(|| async {
                let document = self.read_and_chunk().await?;
                info!(
                    path = %document.fingerprint.source_path,
                    checksum = %document.fingerprint.checksum,
                    pages = document.fingerprint.page_count,
                    chunk_count = document.chunks.len(),
                    "handbook loaded"
                );
                Ok::<_, LoadError>(Arc::new(document))
            })
            .await?;

        Ok(Arc::clone(document))
    }

    async fn read_and_chunk(&self) -> Result<LoadedDocument, LoadError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Err(LoadError::NotFound(self.path.clone()));
        }

        self.config.validate()?;
        let bytes = tokio::fs::read(&self.path).await?;
        let checksum = digest_bytes(&bytes);

        let extractor = Arc::clone(&self.extractor);
        let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&bytes))
            .await
            .map_err(|error| LoadError::Task(error.to_string()))??;

        let text = normalize_whitespace(&join_pages(&pages));
        let chunks = build_chunks(&checksum, &text, self.config)?;

        Ok(LoadedDocument {
            fingerprint: DocumentFingerprint {
                source_path: self.path.to_string_lossy().to_string(),
                checksum,
                page_count: pages.len(),
                loaded_at: Utc::now(),
            },
            text,
            chunks,
        })
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
