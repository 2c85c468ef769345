pub mod migrations;
pub mod models;
pub mod queries;
pub mod transfer;

pub use transfer::{Receipt, TransferError};

use anyhow::{Result, anyhow};
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application database: one writer plus a small pool of read-only
/// connections. Every balance movement goes through the writer, so
/// transfers are serialized by the writer lock before SQLite sees them.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Private in-memory database. There is no reader pool: every
    /// connection to `:memory:` would be a separate database, so reads
    /// share the writer.
    pub fn open_in_memory() -> Result<Self> {
        let writer = Connection::open_in_memory()?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.readers.is_empty() {
            let conn = self
                .writer
                .lock()
                .map_err(|e| anyhow!("Writer lock poisoned: {}", e))?;
            return f(&conn);
        }

        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| anyhow!("Reader lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Writer lock poisoned: {}", e))?;
        f(&mut conn)
    }

    /// Runs `f` inside an IMMEDIATE transaction on the writer. The
    /// transaction commits only if `f` returns `Ok`; otherwise it is rolled
    /// back when dropped.
    pub fn with_tx<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<rusqlite::Error> + From<anyhow::Error>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Writer lock poisoned: {}", e))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!("Transaction rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_reads_see_writer_commits() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("irma.db");

        {
            let db = Database::open(&path).unwrap();
            assert_eq!(db.readers.len(), READER_POOL_SIZE);

            assert!(db.create_user("alice", "hash", "a@irma.test", 100).unwrap());
            db.create_session("s1", "alice", 1).unwrap();
            assert!(db.update_profile("alice", "alicia", "new@irma.test").unwrap());

            // Round-robin touches every reader at least once.
            for _ in 0..READER_POOL_SIZE * 2 {
                let user = db.get_user("alicia").unwrap().unwrap();
                assert_eq!(user.email, "new@irma.test");
                assert!(db.get_user("alice").unwrap().is_none());
                assert_eq!(db.session_user("s1").unwrap().as_deref(), Some("alicia"));
            }

            let err = db
                .with_conn(|conn| {
                    conn.execute("DELETE FROM users", [])?;
                    Ok(())
                })
                .unwrap_err();
            assert!(err.to_string().contains("readonly"), "{err}");
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_goods().unwrap().len(), 4);
        assert_eq!(db.get_user("alicia").unwrap().map(|u| u.balance), Some(100));
        let version: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(version, 1);
    }
}
