//! Advisory file locking for the JSON ticket file.
//!
//! The server and the CLI may open the same ticket file at once. Writers take
//! an exclusive lock on a sidecar `.lock` file for the whole
//! read-modify-write; readers take a shared lock so they never observe a
//! half-finished rewrite.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt as Fs4FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default time to wait for a contended lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

impl LockMode {
    fn describe(self) -> &'static str {
        match self {
            LockMode::Shared => "shared",
            LockMode::Exclusive => "exclusive",
        }
    }
}

/// Lock guard that releases the lock when dropped (RAII pattern)
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Get the path of the locked file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the file would release it too; unlock eagerly anyway
        let _ = Fs4FileExt::unlock(&self.file);
    }
}

/// Acquires advisory locks (flock on Unix, LockFileEx on Windows) with a
/// bounded wait.
///
/// # Examples
///
/// ```no_run
/// use devtrack::storage::lock::FileLocker;
/// use std::path::Path;
/// use std::time::Duration;
///
/// let locker = FileLocker::new(Duration::from_secs(5));
///
/// let guard = locker.lock_exclusive(Path::new("tickets.json.lock")).unwrap();
/// // ... rewrite tickets.json ...
/// drop(guard);
/// ```
#[derive(Debug, Clone)]
pub struct FileLocker {
    timeout: Duration,
}

impl Default for FileLocker {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl FileLocker {
    /// Create a new FileLocker with the specified timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Acquire an exclusive (write) lock, waiting up to the timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be opened or the lock is not
    /// acquired within the timeout.
    pub fn lock_exclusive(&self, path: &Path) -> Result<LockGuard> {
        self.acquire(path, LockMode::Exclusive)
    }

    /// Acquire a shared (read) lock, waiting up to the timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be opened or the lock is not
    /// acquired within the timeout.
    pub fn lock_shared(&self, path: &Path) -> Result<LockGuard> {
        self.acquire(path, LockMode::Shared)
    }

    fn acquire(&self, path: &Path, mode: LockMode) -> Result<LockGuard> {
        let file = open_or_create(path)?;
        let start = Instant::now();

        loop {
            if try_lock(&file, mode, path)? {
                return Ok(LockGuard {
                    file,
                    path: path.to_path_buf(),
                });
            }
            if start.elapsed() >= self.timeout {
                anyhow::bail!(
                    "Lock timeout: could not acquire {} lock on {} after {:?}",
                    mode.describe(),
                    path.display(),
                    self.timeout
                );
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

fn try_lock(file: &File, mode: LockMode, path: &Path) -> Result<bool> {
    let attempt = match mode {
        LockMode::Shared => Fs4FileExt::try_lock_shared(file),
        LockMode::Exclusive => Fs4FileExt::try_lock_exclusive(file),
    };
    attempt.with_context(|| format!("IO error while trying to lock {}", path.display()))
}

/// Open file for locking, creating it if it doesn't exist
fn open_or_create(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open file for locking: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_exclusive_lock_acquired() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("tickets.json.lock");

        let locker = FileLocker::new(Duration::from_millis(100));
        let guard = locker.lock_exclusive(&file_path).unwrap();

        assert_eq!(guard.path(), file_path);
        assert!(file_path.exists());
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("tickets.json.lock");

        let locker = FileLocker::new(Duration::from_millis(100));

        {
            let _guard = locker.lock_exclusive(&file_path).unwrap();
        }

        let _guard2 = locker.lock_exclusive(&file_path).unwrap();
    }

    #[test]
    fn test_exclusive_lock_times_out_while_held() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("tickets.json.lock");

        let holder = FileLocker::new(Duration::from_millis(100));
        let _guard = holder.lock_exclusive(&file_path).unwrap();

        let waiter = FileLocker::new(Duration::from_millis(50));
        let err = waiter.lock_shared(&file_path).unwrap_err();
        assert!(err.to_string().contains("Lock timeout"));
        assert!(err.to_string().contains("shared"));
    }

    #[test]
    fn test_shared_locks_allow_concurrent_reads() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("tickets.json.lock");

        let path = Arc::new(file_path);
        let barrier = Arc::new(Barrier::new(3));
        let success_count = Arc::new(Mutex::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                let success_count = Arc::clone(&success_count);

                thread::spawn(move || {
                    barrier.wait();

                    let locker = FileLocker::new(Duration::from_millis(500));
                    if let Ok(_guard) = locker.lock_shared(&path) {
                        thread::sleep(Duration::from_millis(100));
                        *success_count.lock().unwrap() += 1;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let count = *success_count.lock().unwrap();
        assert_eq!(count, 3, "All threads should acquire shared lock");
    }
}
