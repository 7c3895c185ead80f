use crate::chunking::ChunkingConfig;
use crate::clients::DisabledWebSearch;
use crate::document::DocumentIndex;
use crate::prompt::PromptAssembler;
use crate::retrieval::KeywordScorer;
use crate::session::InMemorySessionStore;
use crate::traits::{CompletionClient, SessionStore, WebSearch};
use crate::{
    ChatError, ChatErrorResponse, ChatRequest, ChatResponse, CompletionError, LoadError,
    RagOptions, SessionError, Turn,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble answering right now. Please try again in a moment.";

impl ChatError {
    /// HTTP-equivalent status for the layer that serialises the error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyMessage => 400,
            Self::Completion(CompletionError::Timeout(_)) => 504,
            Self::Completion(_) => 502,
            Self::Session(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Completion(error) => error.is_retryable(),
            Self::EmptyMessage | Self::Session(_) => false,
        }
    }

    pub fn to_response(&self) -> ChatErrorResponse {
        let error = match self {
            Self::EmptyMessage => "invalid_request",
            Self::Completion(_) => "completion_failed",
            Self::Session(_) => "session_unavailable",
        };
        ChatErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            reply: FALLBACK_REPLY.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Context gathered for one RAG-enabled question.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub chunks: Vec<String>,
    pub web_snippet: Option<String>,
}

impl RetrievedContext {
    pub fn sources(&self) -> Vec<String> {
        self.chunks
            .iter()
            .cloned()
            .chain(self.web_snippet.clone())
            .collect()
    }
}

/// Owns every piece of per-process state: the handbook index, session memory
/// and the remote collaborators.
pub struct ChatService {
    options: RagOptions,
    documents: DocumentIndex,
    scorer: KeywordScorer,
    assembler: PromptAssembler,
    sessions: Arc<dyn SessionStore>,
    completion: Arc<dyn CompletionClient>,
    web_search: Arc<dyn WebSearch>,
    /// One lock per session, held from reading the transcript until the
    /// exchange is recorded, so every prompt sees all earlier exchanges.
    exchange_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ChatService {
    pub fn new(options: RagOptions, completion: Arc<dyn CompletionClient>) -> Self {
        let documents = DocumentIndex::new(
            options.document_path.clone(),
            ChunkingConfig {
                max_chars: options.chunk_max_chars,
            },
        );
        Self::with_documents(options, documents, completion)
    }

    pub fn with_documents(
        options: RagOptions,
        documents: DocumentIndex,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            scorer: KeywordScorer::new(options.top_k),
            options,
            documents,
            assembler: PromptAssembler::default(),
            sessions: Arc::new(InMemorySessionStore::new()),
            completion,
            web_search: Arc::new(DisabledWebSearch),
            exchange_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_web_search(mut self, web_search: Arc<dyn WebSearch>) -> Self {
        self.web_search = web_search;
        self
    }

    pub fn with_session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_prompt_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn documents(&self) -> &DocumentIndex {
        &self.documents
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Attempts the handbook load. Failures leave the service in
    /// context-free mode.
    pub async fn warm_up(&self) -> bool {
        self.ensure_document().await
    }

    async fn ensure_document(&self) -> bool {
        match self.documents.load().await {
            Ok(_) => true,
            Err(LoadError::NotFound(path)) => {
                warn!(
                    path = %path.display(),
                    "handbook not found, answering without document context"
                );
                false
            }
            Err(error) => {
                warn!(
                    %error,
                    "handbook could not be loaded, answering without document context"
                );
                false
            }
        }
    }

    pub async fn retrieve(&self, query: &str) -> Vec<String> {
        self.ensure_document().await;
        self.scorer.retrieve_texts(query, self.documents.chunks())
    }

    async fn search_web(&self, query: &str) -> Option<String> {
        match tokio::time::timeout(self.options.search_timeout, self.web_search.search(query)).await
        {
            Ok(Ok(snippet)) => snippet,
            Ok(Err(error)) => {
                warn!(%error, "web search failed, continuing without snippet");
                None
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.options.search_timeout.as_secs(),
                    "web search timed out, continuing without snippet"
                );
                None
            }
        }
    }

    pub async fn gather_context(&self, query: &str) -> RetrievedContext {
        let (chunks, web_snippet) = tokio::join!(self.retrieve(query), self.search_web(query));
        RetrievedContext {
            chunks,
            web_snippet,
        }
    }

    pub async fn assemble_prompt(
        &self,
        session_id: &str,
        user_message: &str,
        use_context: bool,
        retrieved_chunks: &[String],
        external_snippet: Option<&str>,
    ) -> Result<Vec<Turn>, SessionError> {
        let history = self.sessions.transcript(session_id).await?;
        Ok(self.assembler.assemble(
            &history,
            user_message,
            use_context,
            retrieved_chunks,
            external_snippet,
        ))
    }

    async fn complete(&self, messages: &[Turn]) -> Result<String, CompletionError> {
        let timeout = self.options.completion_timeout;
        match tokio::time::timeout(timeout, self.completion.complete(messages)).await {
            Ok(result) => result.map(|completion| completion.content),
            Err(_) => Err(CompletionError::Timeout(timeout.as_secs())),
        }
    }

    fn exchange_lock(
        &self,
        session_id: &str,
    ) -> Result<Arc<tokio::sync::Mutex<()>>, SessionError> {
        let mut locks = self
            .exchange_locks
            .lock()
            .map_err(|_| SessionError::Backend("exchange lock map poisoned".to_string()))?;
        Ok(Arc::clone(locks.entry(session_id.to_string()).or_default()))
    }

    /// Runs one chat exchange. The transcript only changes when the
    /// completion succeeds.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let context = if request.use_rag {
            self.gather_context(message).await
        } else {
            RetrievedContext::default()
        };

        let exchange_lock = self.exchange_lock(&request.session_id)?;
        let _exchange = exchange_lock.lock().await;

        let messages = self
            .assemble_prompt(
                &request.session_id,
                message,
                request.use_rag,
                &context.chunks,
                context.web_snippet.as_deref(),
            )
            .await?;

        let reply = match self.complete(&messages).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(session_id = %request.session_id, %error, "completion failed");
                return Err(error.into());
            }
        };

        self.sessions
            .append_exchange(
                &request.session_id,
                Turn::user(message),
                Turn::assistant(reply.clone()),
            )
            .await?;

        info!(
            session_id = %request.session_id,
            use_rag = request.use_rag,
            chunk_hits = context.chunks.len(),
            web_snippet = context.web_snippet.is_some(),
            "chat exchange completed"
        );

        Ok(ChatResponse {
            reply,
            sources: context.sources(),
        })
    }
}
