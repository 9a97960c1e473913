pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors a caller needs to tell apart. Everything else is `Other`.
#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// Only a UNIQUE violation is a `Conflict`. Other constraint failures
    /// (NOT NULL, primary key) are bugs and stay `Other`.
    fn classify(err: anyhow::Error) -> Self {
        match err.downcast_ref::<rusqlite::Error>() {
            Some(rusqlite::Error::SqliteFailure(e, msg))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                DbError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => DbError::Other(err),
        }
    }
}

/// SQLite handle with a single serialized writer and a small pool of
/// read-only connections. Every statement runs in autocommit mode, so each
/// write is applied entirely or not at all.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl Database {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        // Readers open only once the schema exists
        let readers = (0..READER_POOL_SIZE)
            .map(|_| open_reader(path).map(Mutex::new))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Database ready at {} ({} read connections)",
            path.display(),
            readers.len()
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Run `f` on one of the read-only connections.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let slot = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[slot]
            .lock()
            .map_err(|_| anyhow!("read connection {} poisoned", slot))?;
        f(&conn)
    }

    /// Run `f` on the writer. Callers queue here, one write at a time.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|_| anyhow!("write connection poisoned"))?;
        f(&conn)
    }
}

fn open_reader(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}
