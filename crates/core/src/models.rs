use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub source_path: String,
    pub checksum: String,
    pub page_count: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation message. Serialises as an OpenAI-style chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "useRAG", default = "default_use_rag")]
    pub use_rag: bool,
    #[serde(rename = "sessionId", default = "default_session_id")]
    pub session_id: String,
}

fn default_use_rag() -> bool {
    true
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            use_rag: default_use_rag(),
            session_id: default_session_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatErrorResponse {
    pub error: String,
    pub message: String,
    pub reply: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RagOptions {
    pub document_path: PathBuf,
    pub chunk_max_chars: usize,
    pub top_k: usize,
    pub completion_timeout: Duration,
    pub search_timeout: Duration,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from("data/handbook.pdf"),
            chunk_max_chars: crate::chunking::DEFAULT_CHUNK_MAX_CHARS,
            top_k: crate::retrieval::DEFAULT_TOP_K,
            completion_timeout: Duration::from_secs(60),
            search_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatRequest, Role, Turn};

    #[test]
    fn chat_request_defaults_rag_and_session() -> Result<(), serde_json::Error> {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message":"How many vacation days?"}"#)?;
        assert!(request.use_rag);
        assert_eq!(request.session_id, "default");

        let request: ChatRequest = serde_json::from_str(
            r#"{"message":"hi","useRAG":false,"sessionId":"alice"}"#,
        )?;
        assert!(!request.use_rag);
        assert_eq!(request.session_id, "alice");
        Ok(())
    }

    #[test]
    fn turns_serialize_as_chat_messages() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(Turn::assistant("Hello"))?;
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "Hello");
        assert_eq!(Turn::system("x").role, Role::System);
        Ok(())
    }
}
