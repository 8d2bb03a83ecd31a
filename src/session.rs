//! Session-scoped conversation state
//!
//! In-memory only: sessions are created lazily on first use, live for the
//! process lifetime, and disappear only through explicit deletion. There is
//! no TTL or eviction.

use crate::error::AgentError;
use crate::models::{Checkpoint, ConversationTurn};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// One session's state: the visible turn history plus the reasoning
/// checkpoint the adapter resumes from.
#[derive(Debug, Default)]
struct SessionState {
    turns: Vec<ConversationTurn>,
    checkpoint: Checkpoint,
}

/// A single conversation session.
///
/// Two locks with different scopes: `gate` is held across a whole exchange
/// so messages within one session are strictly serialized, while `state` is
/// held only for short reads and writes so listing and history lookups never
/// wait behind a long reasoning call.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    gate: Mutex<()>,
    state: Mutex<SessionState>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            gate: Mutex::new(()),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Take the per-session exchange gate. Holding the returned guard keeps
    /// every other exchange on this session waiting; other sessions are
    /// unaffected.
    pub async fn begin_exchange(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Snapshot of the reasoning checkpoint. The caller works on the copy
    /// and commits it back only on success, so a failed exchange leaves no
    /// trace.
    pub async fn checkpoint(&self) -> Checkpoint {
        self.state.lock().await.checkpoint.clone()
    }

    /// Commit one completed exchange: both turns and the advanced checkpoint
    /// land under a single lock so readers never observe a half-recorded
    /// exchange.
    pub async fn commit_exchange(
        &self,
        user_turn: ConversationTurn,
        assistant_turn: ConversationTurn,
        checkpoint: Checkpoint,
    ) {
        let mut state = self.state.lock().await;
        state.turns.push(user_turn);
        state.turns.push(assistant_turn);
        state.checkpoint = checkpoint;
    }

    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.state.lock().await.turns.clone()
    }

    pub async fn turn_count(&self) -> usize {
        self.state.lock().await.turns.len()
    }

    async fn append(&self, turn: ConversationTurn) {
        self.state.lock().await.turns.push(turn);
    }
}

/// Process-wide store mapping session ids to live sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a session, creating an empty one on first use. Idempotent:
    /// repeated calls with the same id return the same session.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Session::new(session_id.to_string())))
            .clone()
    }

    pub async fn get(&self, session_id: &str) -> Result<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))
    }

    /// Append a turn to an existing session. Sessions are never created
    /// implicitly here; that is `get_or_create`'s job.
    pub async fn append(&self, session_id: &str, turn: ConversationTurn) -> Result<()> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions
                .get(session_id)
                .cloned()
                .ok_or_else(|| AgentError::UnknownSession(session_id.to_string()))?
        };
        session.append(turn).await;
        Ok(())
    }

    /// (session_id, turn_count) for every live session.
    pub async fn list(&self) -> Vec<(String, usize)> {
        let sessions: Vec<Arc<Session>> = {
            let map = self.sessions.read().await;
            map.values().cloned().collect()
        };

        let mut entries = Vec::with_capacity(sessions.len());
        for session in sessions {
            entries.push((session.id.clone(), session.turn_count().await));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let session = self.get(session_id).await?;
        Ok(session.turns().await)
    }

    /// Remove a session permanently. An exchange already running on it
    /// finishes against the detached session and is then dropped with it.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentMessage;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = SessionStore::new();
        let first = store.get_or_create("abc").await;
        let second = store.get_or_create("abc").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.turn_count().await, 0);
    }

    #[tokio::test]
    async fn append_requires_an_existing_session() {
        let store = SessionStore::new();
        let err = store
            .append("ghost", ConversationTurn::user("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownSession(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new();
        store.get_or_create("a").await;
        store.get_or_create("b").await;

        store
            .append("a", ConversationTurn::user("only in a"))
            .await
            .unwrap();

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert!(store.history("b").await.unwrap().is_empty());

        let listed = store.list().await;
        assert_eq!(listed, vec![("a".to_string(), 1), ("b".to_string(), 0)]);
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let store = SessionStore::new();
        store.get_or_create("keep").await;
        store.get_or_create("drop").await;
        store
            .append("keep", ConversationTurn::user("still here"))
            .await
            .unwrap();

        store.delete("drop").await.unwrap();

        assert!(matches!(
            store.history("drop").await.unwrap_err(),
            AgentError::SessionNotFound(_)
        ));
        assert_eq!(store.history("keep").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_of_unknown_session_fails() {
        let store = SessionStore::new();
        let err = store.delete("nope").await.unwrap_err();
        assert!(matches!(err, AgentError::SessionNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn commit_lands_both_turns_and_the_checkpoint() {
        let store = SessionStore::new();
        let session = store.get_or_create("s").await;

        let mut checkpoint = session.checkpoint().await;
        assert!(checkpoint.is_empty());
        checkpoint.push(AgentMessage::User {
            content: "hi".to_string(),
        });

        session
            .commit_exchange(
                ConversationTurn::user("hi"),
                ConversationTurn::assistant("hello", vec![]),
                checkpoint,
            )
            .await;

        let turns = session.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hi");
        assert_eq!(turns[1].content, "hello");
        assert_eq!(session.checkpoint().await.len(), 1);
    }

    #[tokio::test]
    async fn exchange_gate_serializes_one_session() {
        let store = SessionStore::new();
        let session = store.get_or_create("gated").await;

        let guard = session.begin_exchange().await;
        // While the gate is held the state lock stays free.
        assert_eq!(session.turn_count().await, 0);
        drop(guard);
        let _next = session.begin_exchange().await;
    }
}
