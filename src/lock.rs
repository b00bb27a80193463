//! Exclusive write locking for inventories.
//!
//! Each base path has one lock file inside the store. Writers (`populate`, `apply`) hold the
//! lock across load-verify-save; readers never take it. Locks are released when dropped.

use crate::error::{InventoryError, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Kinds of write operations that take the inventory lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    /// Initial population from a scan
    Populate,
    /// Applying a report
    Apply,
}

impl WriteOperation {
    /// Get the string representation of the operation
    const fn as_str(self) -> &'static str {
        match self {
            Self::Populate => "populate",
            Self::Apply => "apply",
        }
    }
}

/// Holds the exclusive write lock for one base path.
///
/// The lock file itself is left in place on release: deleting it would let a waiting process
/// lock an unlinked inode while a third process locks a fresh file.
pub struct InventoryLock {
    /// Lock file handle
    lock_file: File,
    /// Path to the lock file (for error messages)
    lock_path: PathBuf,
    /// Base path this lock protects
    base_path: PathBuf,
}

impl InventoryLock {
    /// Acquire the exclusive lock stored at `lock_path` for `base_path`.
    ///
    /// Retries until `timeout` elapses, then fails with
    /// [`InventoryError::StoreWriteConflict`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The lock directory cannot be created
    /// - Another writer holds the lock for longer than `timeout`
    pub fn acquire(
        lock_path: &Path,
        base_path: &Path,
        operation: WriteOperation,
        timeout: Duration,
    ) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| InventoryError::io(parent, e))?;
        }

        let lock_file = Self::try_acquire_lock(lock_path, base_path, operation, timeout)?;
        debug!(
            lock = %lock_path.display(),
            operation = operation.as_str(),
            "acquired inventory lock"
        );

        Ok(Self {
            lock_file,
            lock_path: lock_path.to_path_buf(),
            base_path: base_path.to_path_buf(),
        })
    }

    /// Try to acquire the lock file
    fn try_acquire_lock(
        lock_path: &Path,
        base_path: &Path,
        operation: WriteOperation,
        timeout: Duration,
    ) -> Result<File> {
        let retry_interval = (timeout / 50)
            .max(Duration::from_millis(10))
            .min(Duration::from_millis(100));
        let start = Instant::now();

        loop {
            // Open without truncating: the current holder's diagnostics stay intact
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(lock_path)
                .map_err(|e| InventoryError::io(lock_path, e))?;

            match file.try_lock_exclusive() {
                Ok(true) => {
                    Self::write_holder_info(&file, base_path, operation);
                    return Ok(file);
                }
                Ok(false) | Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(retry_interval);
                }
                Ok(false) | Err(_) => {
                    return Err(InventoryError::StoreWriteConflict {
                        base_path: base_path.to_path_buf(),
                        lock_path: lock_path.to_path_buf(),
                    });
                }
            }
        }
    }

    /// Record who holds the lock, for operators inspecting a stuck lock file
    fn write_holder_info(file: &File, base_path: &Path, operation: WriteOperation) {
        let mut file_ref = file;
        let written = file
            .set_len(0)
            .and_then(|()| {
                writeln!(
                    file_ref,
                    "operation={}\nbase_path={}\npid={}\ntime={}",
                    operation.as_str(),
                    base_path.display(),
                    std::process::id(),
                    humantime::format_rfc3339(SystemTime::now())
                )
            });
        if let Err(e) = written {
            warn!(error = %e, "failed to write lock holder info");
        }
    }

    /// Base path this lock protects
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the underlying lock file
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Release the lock explicitly (normally handled by Drop)
    ///
    /// # Errors
    ///
    /// Returns an error if the unlock operation fails
    pub fn release(self) -> Result<()> {
        FileExt::unlock(&self.lock_file).map_err(|e| InventoryError::io(&self.lock_path, e))
    }
}

impl Drop for InventoryLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock too; unlocking here makes it immediate
        let _ = FileExt::unlock(&self.lock_file);
    }
}
