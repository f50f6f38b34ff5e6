//! Connection pool and scoped sessions.

use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use schemaforge_model::RegistryEntry;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::table::{self, Tx};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_IDLE: usize = 8;

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    /// Shared-cache in-memory database, identified by URI.
    Memory(String),
}

/// Handle to the record database.
///
/// Hands out [`Session`]s, each backed by its own connection. Idle
/// connections are kept for reuse; the pool lock is only held while a
/// connection is taken or returned, never while a session is in use.
pub struct Store {
    location: Location,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
    /// Keeps a shared in-memory database alive while the store exists.
    _anchor: Option<Mutex<Connection>>,
}

impl Store {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            location: Location::File(path),
            idle: Mutex::new(Vec::new()),
            max_idle: DEFAULT_MAX_IDLE,
            _anchor: None,
        };
        // Fail early on an unusable path.
        let conn = store.connect()?;
        store.release(conn);
        Ok(store)
    }

    /// Opens a private in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let uri = format!("file:schemaforge-{}?mode=memory&cache=shared", Uuid::new_v4());
        let mut store = Self {
            location: Location::Memory(uri),
            idle: Mutex::new(Vec::new()),
            max_idle: DEFAULT_MAX_IDLE,
            _anchor: None,
        };
        store._anchor = Some(Mutex::new(store.connect()?));
        Ok(store)
    }

    /// Acquires a session. Its connection goes back to the pool when the
    /// session is dropped.
    pub fn session(&self) -> StorageResult<Session<'_>> {
        let pooled = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let conn = match pooled {
            Some(conn) => conn,
            None => self.connect()?,
        };
        Ok(Session {
            store: self,
            conn: Some(conn),
        })
    }

    /// Creates the table for `entry` if it does not exist yet.
    ///
    /// Existing tables are left untouched; there is no migration.
    pub fn materialize(&self, entry: &RegistryEntry) -> StorageResult<()> {
        let sql = table::create_table_sql(entry);
        debug!(entity = %entry.key(), "materializing table");
        let session = self.session()?;
        session.connection()?.execute_batch(&sql)?;
        Ok(())
    }

    fn connect(&self) -> StorageResult<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = match &self.location {
            Location::File(path) => {
                let conn = Connection::open_with_flags(path, flags)?;
                conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
                conn
            }
            Location::Memory(uri) => Connection::open_with_flags(uri, flags)?,
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn release(&self, conn: Connection) {
        if !conn.is_autocommit() {
            // A transaction escaped its guard; do not hand this connection out again.
            warn!("dropping connection with an open transaction");
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(conn);
            }
        }
    }
}

/// A scoped claim on one database connection.
pub struct Session<'s> {
    store: &'s Store,
    conn: Option<Connection>,
}

impl Session<'_> {
    /// Starts a transaction. It rolls back when dropped unless
    /// [`Tx::commit`] is called.
    pub fn transaction(&mut self) -> StorageResult<Tx<'_>> {
        let conn = self.conn.as_mut().ok_or(StorageError::SessionClosed)?;
        Ok(Tx::new(conn.transaction()?))
    }

    /// Starts a transaction that takes the write lock up front.
    ///
    /// Use it for read-then-write work: a deferred transaction that has
    /// already read cannot wait for the lock and fails with `SQLITE_BUSY`
    /// if another writer committed in between.
    pub fn write_transaction(&mut self) -> StorageResult<Tx<'_>> {
        let conn = self.conn.as_mut().ok_or(StorageError::SessionClosed)?;
        Ok(Tx::new(
            conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
        ))
    }

    fn connection(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::SessionClosed)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.store.release(conn);
        }
    }
}
