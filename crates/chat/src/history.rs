//! Session history store.
//!
//! Maps a session id to its transcript over an injected [`HistoryBackend`].
//! Each session also has an async gate that the orchestrator holds for a
//! whole turn, so turns on one session never interleave while turns on
//! different sessions run in parallel. The gate map lock is only held for
//! lookups, never across an await.

use crate::types::{Role, Transcript, Turn};
use async_trait::async_trait;
use chrono::Utc;
use reviewqa_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::OwnedMutexGuard;

/// Counts reported by `reviewqa stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub sessions: u64,
    pub turns: u64,
}

/// Storage behind the history store.
///
/// `append_turns` must be all-or-nothing: readers see either none or all of
/// the given turns.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Backend name for logs ("memory", "sqlite").
    fn name(&self) -> &str;

    /// Return the session's transcript, registering an empty one if absent.
    async fn get_or_create(&self, session_id: &str) -> AppResult<Transcript>;

    /// Append turns to a session, creating it if absent.
    async fn append_turns(&self, session_id: &str, turns: &[Turn]) -> AppResult<()>;

    async fn stats(&self) -> AppResult<HistoryStats>;
}

/// Process-local backing; history is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    sessions: RwLock<HashMap<String, Transcript>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> AppError {
    AppError::History("History lock poisoned".to_string())
}

#[async_trait]
impl HistoryBackend for InMemoryHistory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_or_create(&self, session_id: &str) -> AppResult<Transcript> {
        if let Some(transcript) = self.sessions.read().map_err(|_| poisoned())?.get(session_id) {
            return Ok(transcript.clone());
        }

        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        Ok(sessions.entry(session_id.to_string()).or_default().clone())
    }

    async fn append_turns(&self, session_id: &str, turns: &[Turn]) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let transcript = sessions.entry(session_id.to_string()).or_default();
        for turn in turns {
            transcript.push(turn.clone());
        }
        Ok(())
    }

    async fn stats(&self) -> AppResult<HistoryStats> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(HistoryStats {
            sessions: sessions.len() as u64,
            turns: sessions.values().map(|t| t.len() as u64).sum(),
        })
    }
}

/// Durable backing in a SQLite file, one row per turn.
pub struct SqliteHistory {
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::History(format!("Failed to create history directory: {}", e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::History(format!("Failed to open history database: {}", e)))?;
        init_schema(&conn)?;

        tracing::debug!("Opened SQLite history at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| poisoned())
    }
}

#[async_trait]
impl HistoryBackend for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_or_create(&self, session_id: &str) -> AppResult<Transcript> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO sessions (id, created_at) VALUES (?1, ?2)",
            params![session_id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| AppError::History(format!("Failed to register session: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT role, content FROM turns WHERE session_id = ?1 ORDER BY position")
            .map_err(|e| AppError::History(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| AppError::History(format!("Failed to load turns: {}", e)))?;

        let mut turns = Vec::new();
        for row in rows {
            let (role, content) =
                row.map_err(|e| AppError::History(format!("Failed to read turn: {}", e)))?;
            turns.push(Turn::new(role.parse::<Role>()?, content));
        }

        Ok(Transcript::from_turns(turns))
    }

    async fn append_turns(&self, session_id: &str, turns: &[Turn]) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::History(format!("Failed to begin transaction: {}", e)))?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT OR IGNORE INTO sessions (id, created_at) VALUES (?1, ?2)",
            params![session_id, now],
        )
        .map_err(|e| AppError::History(format!("Failed to register session: {}", e)))?;

        let next: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM turns WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::History(format!("Failed to read turn position: {}", e)))?;

        for (offset, turn) in turns.iter().enumerate() {
            tx.execute(
                "INSERT INTO turns (session_id, position, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session_id,
                    next + offset as i64,
                    turn.role().as_str(),
                    turn.content(),
                    now
                ],
            )
            .map_err(|e| AppError::History(format!("Failed to insert turn: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::History(format!("Failed to commit turns: {}", e)))
    }

    async fn stats(&self) -> AppResult<HistoryStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> AppResult<u64> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|v| v as u64)
                .map_err(|e| AppError::History(format!("Failed to count history: {}", e)))
        };

        Ok(HistoryStats {
            sessions: count("SELECT COUNT(*) FROM sessions")?,
            turns: count("SELECT COUNT(*) FROM turns")?,
        })
    }
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS turns (
            session_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (session_id, position),
            FOREIGN KEY (session_id) REFERENCES sessions(id)
        );
        "#,
    )
    .map_err(|e| AppError::History(format!("Failed to create history tables: {}", e)))
}

/// Exclusive access to one session for the duration of a turn.
pub type SessionGuard = OwnedMutexGuard<()>;

/// Process-wide session id to transcript mapping.
///
/// Session ids are compared as exact strings. Sessions are created lazily and
/// never expire.
pub struct SessionHistoryStore {
    backend: Arc<dyn HistoryBackend>,
    /// Gates of sessions with a turn in flight or waiting. Entries nobody
    /// else references are dropped on the next `lock_session`.
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionHistoryStore {
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self {
            backend,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Store over an [`InMemoryHistory`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryHistory::new()))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Snapshot of the session's transcript; registers an empty one if absent.
    pub async fn get_or_create(&self, session_id: &str) -> AppResult<Transcript> {
        self.backend.get_or_create(session_id).await
    }

    /// Append one turn, creating the session if absent.
    pub async fn append(&self, session_id: &str, turn: Turn) -> AppResult<()> {
        self.backend.append_turns(session_id, &[turn]).await
    }

    /// Append a user turn and its assistant reply as one unit.
    pub async fn append_exchange(
        &self,
        session_id: &str,
        user: Turn,
        assistant: Turn,
    ) -> AppResult<()> {
        if user.role() != Role::User || assistant.role() != Role::Assistant {
            return Err(AppError::History(format!(
                "Exchange must be user then assistant, got {} then {}",
                user.role(),
                assistant.role()
            )));
        }
        self.backend.append_turns(session_id, &[user, assistant]).await
    }

    /// Wait for exclusive access to a session.
    ///
    /// The returned guard is owned, so it can be held across awaits and
    /// released by dropping it.
    pub async fn lock_session(&self, session_id: &str) -> AppResult<SessionGuard> {
        let gate = {
            let mut gates = self.gates.lock().map_err(|_| poisoned())?;
            // Holders and waiters keep their own clone; the rest are idle
            gates.retain(|_, gate| Arc::strong_count(gate) > 1);
            Arc::clone(gates.entry(session_id.to_string()).or_default())
        };
        Ok(gate.lock_owned().await)
    }

    /// Number of session gates currently tracked.
    pub(crate) fn gate_count(&self) -> usize {
        self.gates.lock().map(|gates| gates.len()).unwrap_or(0)
    }

    pub async fn stats(&self) -> AppResult<HistoryStats> {
        self.backend.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_or_create_registers_empty_session() {
        let store = SessionHistoryStore::in_memory();
        assert!(store.get_or_create("s1").await.unwrap().is_empty());
        assert_eq!(store.stats().await.unwrap().sessions, 1);
    }

    #[tokio::test]
    async fn test_append_creates_session() {
        let store = SessionHistoryStore::in_memory();
        store.append("s1", Turn::user("hello")).await.unwrap();

        let transcript = store.get_or_create("s1").await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].content(), "hello");
    }

    #[tokio::test]
    async fn test_session_ids_are_exact() {
        let store = SessionHistoryStore::in_memory();
        store.append("Alice", Turn::user("hi")).await.unwrap();

        assert!(store.get_or_create("alice").await.unwrap().is_empty());
        assert!(store.get_or_create("Alice ").await.unwrap().is_empty());
        assert_eq!(store.get_or_create("Alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let store = SessionHistoryStore::in_memory();
        let before = store.get_or_create("s").await.unwrap();
        store
            .append_exchange("s", Turn::user("q"), Turn::assistant("a"))
            .await
            .unwrap();
        assert!(before.is_empty());
        assert_eq!(store.get_or_create("s").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_append_exchange_rejects_wrong_roles() {
        let store = SessionHistoryStore::in_memory();
        let result = store
            .append_exchange("s", Turn::assistant("a"), Turn::user("q"))
            .await;
        assert!(matches!(result, Err(AppError::History(_))));
        assert!(store.get_or_create("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lock_session_serializes_same_session() {
        let store = Arc::new(SessionHistoryStore::in_memory());
        let guard = store.lock_session("s").await.unwrap();

        let contender = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.lock_session("s").await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_lock_session_independent_sessions() {
        let store = SessionHistoryStore::in_memory();
        let _a = store.lock_session("a").await.unwrap();
        let b = tokio::time::timeout(Duration::from_millis(100), store.lock_session("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_gates_are_pruned() {
        let store = SessionHistoryStore::in_memory();
        for i in 0..10 {
            let _guard = store.lock_session(&format!("s{}", i)).await.unwrap();
        }
        assert_eq!(store.gate_count(), 1);

        let busy = store.lock_session("busy").await.unwrap();
        drop(store.lock_session("other").await.unwrap());
        assert_eq!(store.gate_count(), 2);

        drop(busy);
        drop(store.lock_session("next").await.unwrap());
        assert_eq!(store.gate_count(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.sqlite");

        {
            let store = SessionHistoryStore::new(Arc::new(SqliteHistory::open(&path).unwrap()));
            store
                .append_exchange("s1", Turn::user("How is the battery?"), Turn::assistant("Good."))
                .await
                .unwrap();
            store
                .append_exchange("s1", Turn::user("And the camera?"), Turn::assistant("Sharp."))
                .await
                .unwrap();
            store.get_or_create("s2").await.unwrap();
        }

        let store = SessionHistoryStore::new(Arc::new(SqliteHistory::open(&path).unwrap()));
        assert_eq!(store.backend_name(), "sqlite");

        let transcript = store.get_or_create("s1").await.unwrap();
        let roles: Vec<Role> = transcript.iter().map(|t| t.role()).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(transcript.turns()[2].content(), "And the camera?");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, HistoryStats { sessions: 2, turns: 4 });
    }
}
