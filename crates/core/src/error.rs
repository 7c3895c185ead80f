use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("document load task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {details}")]
    Status { status: u16, details: String },

    #[error("malformed completion payload: {0}")]
    MalformedResponse(String),

    #[error("completion timed out after {0}s")]
    Timeout(u64),
}

impl CompletionError {
    /// Whether the caller may reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(error) => error.is_timeout() || error.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum WebSearchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("web search returned {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is required")]
    EmptyMessage,

    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("session store failed: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;
