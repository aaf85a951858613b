//! Entry store: schema-backed entries, features and per-model embeddings.
//!
//! The submodules are synchronous functions over a `rusqlite` connection.
//! [`EntryStore`] wraps them for async callers: each call runs on the blocking
//! pool, and a cancelled token aborts the statement in flight so its
//! transaction rolls back before the caller sees `Cancelled`.

pub mod read;
pub mod search;
pub mod split;
pub mod stats;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

use crate::db;
use crate::error::{Error, Result, StoreContext};
use stats::StatsResponse;
use store::AddEntryResult;
use types::{Feature, Model, NewEntry, SimilarEntry, StoredEntry, Vector};

/// VM instructions between cancellation checks inside a running statement.
const PROGRESS_OPS: i32 = 1000;

/// Shared, cancellable handle to the dictionary database.
///
/// Writes go through one connection. Reads use a second connection on the same
/// WAL file when the store is opened from disk, so a long ingest never holds up
/// a search.
#[derive(Clone)]
pub struct EntryStore {
    writer: Arc<Mutex<Connection>>,
    reader: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl EntryStore {
    /// Serve reads and writes from a single connection (in-memory databases).
    pub fn new(conn: Connection) -> Self {
        let conn = Arc::new(Mutex::new(conn));
        Self {
            writer: Arc::clone(&conn),
            reader: conn,
            db_path: None,
        }
    }

    /// Open the database at `path` with separate write and read connections.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let writer = db::open_database(path)?;
        let reader = db::open_database(path)?;
        reader.pragma_update(None, "query_only", true)?;
        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
            db_path: Some(path.to_path_buf()),
        })
    }

    async fn write<T, F>(&self, cancel: &CancellationToken, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        run(&self.writer, cancel, op).await
    }

    async fn read<T, F>(&self, cancel: &CancellationToken, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        run(&self.reader, cancel, op).await
    }

    pub async fn add_entry(
        &self,
        cancel: &CancellationToken,
        entry: NewEntry,
    ) -> Result<AddEntryResult> {
        self.write(cancel, move |conn| store::add_entry(conn, &entry)).await
    }

    pub async fn related_entries(
        &self,
        cancel: &CancellationToken,
        model: Model,
        query: Vector,
        limit: usize,
    ) -> Result<Vec<SimilarEntry>> {
        self.read(cancel, move |conn| search::related_entries(conn, model, &query, limit))
            .await
    }

    pub async fn compare_embeddings(
        &self,
        cancel: &CancellationToken,
        a: Vector,
        b: Vector,
    ) -> Result<f64> {
        self.read(cancel, move |conn| search::compare_embeddings(conn, &a, &b))
            .await
    }

    pub async fn random_entry(&self, cancel: &CancellationToken) -> Result<Option<StoredEntry>> {
        self.read(cancel, |conn| read::random_entry(conn)).await
    }

    pub async fn entry(&self, cancel: &CancellationToken, id: i64) -> Result<Option<StoredEntry>> {
        self.read(cancel, move |conn| read::entry_by_id(conn, id)).await
    }

    pub async fn entry_features(
        &self,
        cancel: &CancellationToken,
        entry_id: i64,
    ) -> Result<Vec<Feature>> {
        self.read(cancel, move |conn| read::entry_features(conn, entry_id))
            .await
    }

    pub async fn stats(&self, cancel: &CancellationToken) -> Result<StatsResponse> {
        let db_path = self.db_path.clone();
        self.read(cancel, move |conn| stats::dictionary_stats(conn, db_path.as_deref()))
            .await
    }
}

/// Run `op` on the blocking pool while holding `conn`.
///
/// A cancelled token aborts the running statement through SQLite's progress
/// handler and turns a pending commit into a rollback, so `Error::Cancelled` is
/// only returned once nothing from `op` can still land. A call cancelled before
/// it reaches the connection returns at once.
async fn run<T, F>(conn: &Arc<Mutex<Connection>>, cancel: &CancellationToken, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let conn = Arc::clone(conn);
    let started = Arc::new(AtomicBool::new(false));
    let started_in_task = Arc::clone(&started);
    let token = cancel.clone();

    let mut task = tokio::task::spawn_blocking(move || {
        let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
        started_in_task.store(true, Ordering::SeqCst);
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        with_cancel_hooks(&mut guard, &token, op)
    });

    let joined = tokio::select! {
        biased;
        joined = &mut task => joined,
        _ = cancel.cancelled() => {
            if !started.load(Ordering::SeqCst) {
                tracing::debug!("store call cancelled before it started");
                return Err(Error::Cancelled);
            }
            tracing::debug!("store call cancelled, waiting for rollback");
            task.await
        }
    };

    match joined {
        Ok(Err(_)) if cancel.is_cancelled() => Err(Error::Cancelled),
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(Error::Cancelled),
    }
}

fn with_cancel_hooks<T>(
    conn: &mut Connection,
    token: &CancellationToken,
    op: impl FnOnce(&mut Connection) -> Result<T>,
) -> Result<T> {
    let progress = token.clone();
    conn.progress_handler(PROGRESS_OPS, Some(move || progress.is_cancelled()))
        .store_context("installing progress handler")?;
    let commit = token.clone();
    conn.commit_hook(Some(move || commit.is_cancelled()))
        .store_context("installing commit hook")?;

    let result = op(conn);

    let cleared = conn
        .progress_handler(0, None::<fn() -> bool>)
        .and_then(|()| conn.commit_hook(None::<fn() -> bool>));
    if let Err(e) = cleared {
        tracing::warn!(error = %e, "failed to clear cancellation hooks");
    }
    result
}
