use crate::traits::SessionStore;
use crate::{Session, SessionError, Turn};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::debug;

struct SessionEntry {
    created_at: DateTime<Utc>,
    turns: Mutex<Vec<Turn>>,
}

/// Process-lifetime session memory. No eviction and no size cap.
///
/// The outer map lock is only held to look up or insert an entry; each
/// session's transcript sits behind its own mutex, so different sessions
/// never wait on each other while appends to one session stay ordered.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, session_id: &str) -> Result<Arc<SessionEntry>, SessionError> {
        if let Some(entry) = self.read_map()?.get(session_id) {
            return Ok(Arc::clone(entry));
        }

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::Backend("session map lock poisoned".to_string()))?;
        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| {
            debug!(session_id, "session created");
            Arc::new(SessionEntry {
                created_at: Utc::now(),
                turns: Mutex::new(Vec::new()),
            })
        });
        Ok(Arc::clone(entry))
    }

    fn read_map(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<SessionEntry>>>, SessionError>
    {
        self.sessions
            .read()
            .map_err(|_| SessionError::Backend("session map lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Session, SessionError> {
        let entry = self.entry(session_id)?;
        let turns = entry.turns.lock().await.clone();
        Ok(Session {
            id: session_id.to_string(),
            created_at: entry.created_at,
            turns,
        })
    }

    async fn append(&self, session_id: &str, turn: Turn) -> Result<(), SessionError> {
        let entry = self.entry(session_id)?;
        entry.turns.lock().await.push(turn);
        Ok(())
    }

    async fn append_exchange(
        &self,
        session_id: &str,
        user: Turn,
        assistant: Turn,
    ) -> Result<(), SessionError> {
        let entry = self.entry(session_id)?;
        let mut turns = entry.turns.lock().await;
        turns.push(user);
        turns.push(assistant);
        Ok(())
    }

    async fn transcript(&self, session_id: &str) -> Result<Vec<Turn>, SessionError> {
        let entry = self.entry(session_id)?;
        let turns = entry.turns.lock().await;
        Ok(turns.clone())
    }

    async fn session_ids(&self) -> Result<Vec<String>, SessionError> {
        let mut ids = self.read_map()?.keys().cloned().collect::<Vec<_>>();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_created_lazily() -> Result<(), SessionError> {
        let store = InMemorySessionStore::new();
        assert!(store.session_ids().await?.is_empty());

        let first = store.get("alice").await?;
        let second = store.get("alice").await?;

        assert!(first.turns.is_empty());
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.session_ids().await?, vec!["alice"]);
        Ok(())
    }

    #[tokio::test]
    async fn transcript_preserves_append_order() -> Result<(), SessionError> {
        let store = InMemorySessionStore::new();
        store.append("s", Turn::user("A")).await?;
        store.append("s", Turn::assistant("B")).await?;
        store.append("s", Turn::user("C")).await?;

        assert_eq!(
            store.transcript("s").await?,
            vec![Turn::user("A"), Turn::assistant("B"), Turn::user("C")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn sessions_are_isolated() -> Result<(), SessionError> {
        let store = InMemorySessionStore::new();
        store
            .append_exchange("alice", Turn::user("my badge broke"), Turn::assistant("call IT"))
            .await?;

        assert!(store.transcript("bob").await?.is_empty());
        assert_eq!(store.transcript("alice").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn returned_transcript_is_a_copy() -> Result<(), SessionError> {
        let store = InMemorySessionStore::new();
        store.append("s", Turn::user("hello")).await?;

        let mut copy = store.transcript("s").await?;
        copy.clear();

        assert_eq!(store.transcript("s").await?, vec![Turn::user("hello")]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_exchanges_stay_paired() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(InMemorySessionStore::new());

        let mut handles = Vec::new();
        for n in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append_exchange(
                        "shared",
                        Turn::user(format!("q{n}")),
                        Turn::assistant(format!("a{n}")),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        let transcript = store.transcript("shared").await?;
        assert_eq!(transcript.len(), 64);
        for pair in transcript.chunks(2) {
            assert_eq!(&pair[0].content[1..], &pair[1].content[1..]);
        }
        Ok(())
    }
}
