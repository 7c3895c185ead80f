pub mod chat;
pub mod chunking;
pub mod clients;
pub mod document;
pub mod error;
pub mod extractor;
pub mod models;
pub mod prompt;
pub mod retrieval;
pub mod session;
pub mod traits;

pub use chat::{ChatService, RetrievedContext, FALLBACK_REPLY};
pub use chunking::{build_chunks, chunk_by_words, normalize_whitespace, ChunkingConfig};
pub use clients::{DisabledWebSearch, OpenAiCompatibleClient, SerpApiSearch};
pub use document::{DocumentIndex, LoadedDocument};
pub use error::{ChatError, CompletionError, LoadError, SessionError, WebSearchError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use models::{
    ChatErrorResponse, ChatRequest, ChatResponse, Chunk, Completion, DocumentFingerprint,
    RagOptions, Role, ScoredChunk, Session, Turn, DEFAULT_SESSION_ID,
};
pub use prompt::{PromptAssembler, PromptTemplates};
pub use retrieval::{query_terms, KeywordScorer};
pub use session::InMemorySessionStore;
pub use traits::{CompletionClient, SessionStore, WebSearch};
