use crate::{Completion, CompletionError, Session, SessionError, Turn, WebSearchError};
use async_trait::async_trait;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[Turn]) -> Result<Completion, CompletionError>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Returns a short answer snippet for the query, if the provider has one.
    async fn search(&self, query: &str) -> Result<Option<String>, WebSearchError>;
}

/// Conversation memory keyed by session id.
///
/// Sessions are created on first reference. Transcripts are append-only;
/// `transcript` hands out a copy so callers can never reorder stored turns.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Session, SessionError>;

    async fn append(&self, session_id: &str, turn: Turn) -> Result<(), SessionError>;

    /// Appends a user turn and its reply with no other append in between.
    async fn append_exchange(
        &self,
        session_id: &str,
        user: Turn,
        assistant: Turn,
    ) -> Result<(), SessionError>;

    async fn transcript(&self, session_id: &str) -> Result<Vec<Turn>, SessionError>;

    async fn session_ids(&self) -> Result<Vec<String>, SessionError>;
}
