//! SQLite storage implementation.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers do not block the writer
//! - `synchronous = FULL` so a committed mutation survives a crash
//! - `busy_timeout = 5s` so a second process waits instead of failing
//!
//! Every mutation runs inside a `BEGIN IMMEDIATE` transaction, which takes the
//! write lock up front and serializes read-modify-write sequences.

use crate::domain::{NewTicket, Ticket};
use crate::errors::{Result, TicketError};
use crate::storage::{TicketMutation, TicketStore};
use anyhow::{anyhow, Context};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Busy timeout used for ticket database connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tickets (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    title  TEXT NOT NULL CHECK (length(trim(title)) > 0),
    status TEXT NOT NULL CHECK (length(trim(status)) > 0)
);
";

/// SQLite-backed ticket store.
///
/// `AUTOINCREMENT` keeps ids monotonic across deletes and restarts.
/// Clones share one connection.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if opening, configuring, or migrating the database fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open ticket database {}", path.display()))?;
        configure_connection(&conn).context("Failed to configure SQLite pragmas")?;
        debug!(path = %path.display(), "Opened ticket database");

        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create tickets table")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TicketError::Storage(anyhow!("SQLite connection lock poisoned")))
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    let id: i64 = row.get(0)?;
    let id = u64::try_from(id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;
    Ok(Ticket {
        id,
        title: row.get(1)?,
        status: row.get(2)?,
    })
}

/// Ids above `i64::MAX` cannot exist in the table.
fn sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| TicketError::NotFound(id))
}

impl TicketStore for SqliteStorage {
    fn init(&self) -> Result<()> {
        self.conn()?
            .execute_batch(SCHEMA)
            .context("Failed to create tickets table")?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, title, status FROM tickets ORDER BY id ASC")?;
        let tickets = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tickets)
    }

    fn load_ticket(&self, id: u64) -> Result<Ticket> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, title, status FROM tickets WHERE id = ?1",
            params![sql_id(id)?],
            map_row,
        )
        .optional()?
        .ok_or(TicketError::NotFound(id))
    }

    fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO tickets (title, status) VALUES (?1, ?2)",
            params![ticket.title, ticket.status],
        )?;
        let id = u64::try_from(tx.last_insert_rowid())
            .map_err(|_| TicketError::Storage(anyhow!("SQLite assigned a negative ticket id")))?;
        tx.commit()?;

        Ok(ticket.into_ticket(id))
    }

    fn update_with(&self, id: u64, mutate: TicketMutation<'_>) -> Result<Ticket> {
        let key = sql_id(id)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut ticket = tx
            .query_row(
                "SELECT id, title, status FROM tickets WHERE id = ?1",
                params![key],
                map_row,
            )
            .optional()?
            .ok_or(TicketError::NotFound(id))?;

        // Dropping `tx` on error rolls back
        mutate(&mut ticket)?;

        tx.execute(
            "UPDATE tickets SET title = ?1, status = ?2 WHERE id = ?3",
            params![ticket.title, ticket.status, key],
        )?;
        tx.commit()?;

        Ok(ticket)
    }

    fn delete_ticket(&self, id: u64) -> Result<()> {
        let key = sql_id(id)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM tickets WHERE id = ?1", params![key])?;
        tx.commit()?;

        if removed == 0 {
            return Err(TicketError::NotFound(id));
        }
        Ok(())
    }
}
