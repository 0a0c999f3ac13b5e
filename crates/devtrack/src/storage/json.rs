//! JSON file-based storage implementation.
//!
//! The whole collection lives in one JSON document. Every mutation re-reads
//! the document, applies the change, and rewrites it atomically (temp file,
//! fsync, rename) while holding both an in-process mutex and an exclusive
//! advisory lock on `<file>.lock`.

use crate::domain::{NewTicket, Ticket};
use crate::errors::{Result, TicketError};
use crate::storage::lock::{FileLocker, LockGuard};
use crate::storage::{next_id_after, TicketMutation, TicketStore};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// On-disk layout of the ticket file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TicketDocument {
    /// Next id to hand out; persisted so deleting the newest ticket never
    /// lets its id come back after a restart
    #[serde(default)]
    next_id: u64,
    tickets: Vec<Ticket>,
}

/// Accepted input layouts. Older files are a bare array of tickets.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDocument {
    Current(TicketDocument),
    Legacy(Vec<Ticket>),
}

impl TicketDocument {
    fn from_stored(stored: StoredDocument) -> Self {
        let mut doc = match stored {
            StoredDocument::Current(doc) => doc,
            StoredDocument::Legacy(tickets) => TicketDocument {
                next_id: 0,
                tickets,
            },
        };
        doc.next_id = doc.next_id.max(next_id_after(&doc.tickets));
        doc
    }

    fn position(&self, id: u64) -> Result<usize> {
        self.tickets
            .iter()
            .position(|t| t.id == id)
            .ok_or(TicketError::NotFound(id))
    }
}

/// JSON file storage for tickets.
///
/// Clones share the same in-process lock, so one `JsonFileStorage` can be
/// handed to many request handlers.
///
/// # Examples
///
/// ```no_run
/// use devtrack::storage::{JsonFileStorage, TicketStore};
///
/// let storage = JsonFileStorage::new("data/tickets.json");
/// storage.init().unwrap();
/// storage.create_ticket("Build Docker container", "Testing").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    lock_path: PathBuf,
    locker: FileLocker,
    guard: Arc<Mutex<()>>,
}

impl JsonFileStorage {
    /// Create a new JSON file storage backed by the file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_locker(path, FileLocker::default())
    }

    /// Like [`JsonFileStorage::new`] with a custom lock wait.
    pub fn with_lock_timeout<P: AsRef<Path>>(path: P, timeout: Duration) -> Self {
        Self::with_locker(path, FileLocker::new(timeout))
    }

    fn with_locker<P: AsRef<Path>>(path: P, locker: FileLocker) -> Self {
        let path = path.as_ref().to_path_buf();
        let lock_path = sibling_with_suffix(&path, "lock");
        Self {
            path,
            lock_path,
            locker,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the ticket document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn local_guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|_| TicketError::Storage(anyhow!("Ticket file lock poisoned")))
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }

    fn file_lock(&self, exclusive: bool) -> Result<LockGuard> {
        self.ensure_parent_dir()?;
        let guard = if exclusive {
            self.locker.lock_exclusive(&self.lock_path)?
        } else {
            self.locker.lock_shared(&self.lock_path)?
        };
        Ok(guard)
    }

    fn read_document(&self) -> Result<TicketDocument> {
        if !self.path.exists() {
            return Ok(TicketDocument::from_stored(StoredDocument::Legacy(Vec::new())));
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read file: {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(TicketDocument::from_stored(StoredDocument::Legacy(Vec::new())));
        }

        let stored: StoredDocument = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse ticket file: {}", self.path.display()))?;
        Ok(TicketDocument::from_stored(stored))
    }

    fn write_document(&self, doc: &TicketDocument) -> Result<()> {
        self.ensure_parent_dir()?;
        let json = serde_json::to_string_pretty(doc).context("Failed to serialize tickets")?;

        // Atomic write: write to temp file, flush to disk, then rename
        let temp_path = sibling_with_suffix(&self.path, "tmp");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        file.write_all(json.as_bytes())
            .context("Failed to write temporary file")?;
        file.sync_all().context("Failed to sync temporary file")?;
        fs::rename(&temp_path, &self.path).context("Failed to rename temporary file")?;
        sync_parent_dir(&self.path)?;

        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(TicketDocument) -> Result<T>) -> Result<T> {
        let _local = self.local_guard()?;
        let _file = self.file_lock(false)?;
        f(self.read_document()?)
    }

    /// Run the read-modify-write critical section. `f` failing skips the write.
    fn write<T>(&self, f: impl FnOnce(&mut TicketDocument) -> Result<T>) -> Result<T> {
        let _local = self.local_guard()?;
        let _file = self.file_lock(true)?;
        let mut doc = self.read_document()?;
        let value = f(&mut doc)?;
        self.write_document(&doc)?;
        Ok(value)
    }
}

/// `tickets.json` + `lock` -> `tickets.json.lock`, in the same directory.
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tickets.json".into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Flush the directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .with_context(|| format!("Failed to sync directory {}", dir.display()))?;
    Ok(())
}

// Directory handles cannot be synced through `File` on Windows.
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

impl TicketStore for JsonFileStorage {
    fn init(&self) -> Result<()> {
        let count = self.write(|doc| Ok(doc.tickets.len()))?;
        debug!(path = %self.path.display(), tickets = count, "Loaded ticket file");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn list_tickets(&self) -> Result<Vec<Ticket>> {
        self.read(|doc| Ok(doc.tickets))
    }

    fn load_ticket(&self, id: u64) -> Result<Ticket> {
        self.read(|mut doc| {
            let index = doc.position(id)?;
            Ok(doc.tickets.swap_remove(index))
        })
    }

    fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        self.write(|doc| {
            let ticket = ticket.into_ticket(doc.next_id);
            doc.next_id += 1;
            doc.tickets.push(ticket.clone());
            Ok(ticket)
        })
    }

    fn update_with(&self, id: u64, mutate: TicketMutation<'_>) -> Result<Ticket> {
        self.write(|doc| {
            let index = doc.position(id)?;
            mutate(&mut doc.tickets[index])?;
            Ok(doc.tickets[index].clone())
        })
    }

    fn delete_ticket(&self, id: u64) -> Result<()> {
        self.write(|doc| {
            let index = doc.position(id)?;
            doc.tickets.remove(index);
            Ok(())
        })
    }
}
