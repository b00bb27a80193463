use crate::error::{InventoryError, Result};
use crate::lock::{InventoryLock, WriteOperation};
use crate::storage::Snapshot;
use crate::utils::{codec, write_atomic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// On-disk format version of inventory files
pub const STORE_FORMAT_VERSION: u32 = 1;

const CURRENT_FILE: &str = "current.inv";
const HISTORY_DIR: &str = "history";
const LOCK_FILE: &str = "inventory.lock";

/// Persisted inventory envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredInventory {
    version: u32,
    base_path: String,
    saved_at: DateTime<Utc>,
    digest: String,
    snapshot: Snapshot,
}

/// Summary of the inventory currently committed for a base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredInventoryInfo {
    pub base_path: String,
    pub digest: String,
    pub saved_at: DateTime<Utc>,
    pub record_count: usize,
    pub total_size: u64,
}

impl StoredInventory {
    fn info(&self) -> StoredInventoryInfo {
        StoredInventoryInfo {
            base_path: self.base_path.clone(),
            digest: self.digest.clone(),
            saved_at: self.saved_at,
            record_count: self.snapshot.len(),
            total_size: self.snapshot.total_size(),
        }
    }
}

/// Durable mapping from base path to its last committed snapshot.
///
/// Layout under the store root:
///
/// ```text
/// <root>/<h[..2]>/<h>/
///   current.inv            # latest committed snapshot
///   history/<digest>.inv   # every snapshot ever committed, by content digest
///   inventory.lock         # exclusive writer lock
/// ```
///
/// where `h` is the SHA-256 of the base path. Every file is written atomically, so readers
/// never observe a partially written inventory.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    root: PathBuf,
    compression_level: i32,
    lock_timeout: Duration,
}

impl InventoryStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression_level: 3,
            lock_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding everything stored for `base_path`
    #[must_use]
    pub fn inventory_dir(&self, base_path: &Path) -> PathBuf {
        let key = hex::encode(Sha256::digest(base_path.to_string_lossy().as_bytes()));
        self.root.join(&key[..2]).join(&key)
    }

    fn current_path(&self, base_path: &Path) -> PathBuf {
        self.inventory_dir(base_path).join(CURRENT_FILE)
    }

    fn history_path(&self, base_path: &Path, digest: &str) -> PathBuf {
        self.inventory_dir(base_path)
            .join(HISTORY_DIR)
            .join(format!("{digest}.inv"))
    }

    /// Lock file guarding writes for `base_path`
    #[must_use]
    pub fn lock_path(&self, base_path: &Path) -> PathBuf {
        self.inventory_dir(base_path).join(LOCK_FILE)
    }

    /// Whether an inventory has ever been committed for `base_path`
    #[must_use]
    pub fn exists(&self, base_path: &Path) -> bool {
        self.current_path(base_path).is_file()
    }

    /// Loads the current snapshot, or an empty one if the base path was never populated.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory file exists but cannot be read or decoded.
    pub fn load(&self, base_path: &Path) -> Result<Snapshot> {
        let path = self.current_path(base_path);
        if !path.exists() {
            debug!(base = %base_path.display(), "no inventory stored yet");
            return Ok(Snapshot::new());
        }
        Ok(self.read_file(&path)?.snapshot)
    }

    /// Loads the snapshot committed with the given digest.
    ///
    /// The digest of the empty snapshot always resolves, so reports generated before the first
    /// populate can still be applied.
    ///
    /// # Errors
    ///
    /// Returns an error if no snapshot with that digest was ever committed for `base_path`, or
    /// if its file cannot be decoded.
    pub fn load_at(&self, base_path: &Path, digest: &str) -> Result<Snapshot> {
        let path = self.history_path(base_path, digest);
        if !path.exists() && digest == Snapshot::new().digest() {
            return Ok(Snapshot::new());
        }
        let stored = self.read_file(&path)?;
        Ok(stored.snapshot)
    }

    /// Metadata about the current inventory, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory file exists but cannot be decoded.
    pub fn stored(&self, base_path: &Path) -> Result<Option<StoredInventoryInfo>> {
        let path = self.current_path(base_path);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_file(&path)?.info()))
    }

    /// Takes the exclusive write lock for `base_path`.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::StoreWriteConflict`] if another writer keeps the lock past
    /// the configured timeout.
    pub fn lock(&self, base_path: &Path, operation: WriteOperation) -> Result<InventoryLock> {
        InventoryLock::acquire(
            &self.lock_path(base_path),
            base_path,
            operation,
            self.lock_timeout,
        )
    }

    /// Commits `snapshot` as the current inventory of the locked base path.
    ///
    /// The snapshot is archived under its digest first and then atomically replaces
    /// `current.inv`. If anything fails the previous current inventory is left intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock belongs to a different store, or if encoding or writing
    /// fails.
    pub fn save(&self, lock: &InventoryLock, snapshot: &Snapshot) -> Result<StoredInventoryInfo> {
        let base_path = lock.base_path();
        if lock.lock_path() != self.lock_path(base_path) {
            return Err(InventoryError::StoreWriteConflict {
                base_path: base_path.to_path_buf(),
                lock_path: lock.lock_path().to_path_buf(),
            });
        }

        let stored = StoredInventory {
            version: STORE_FORMAT_VERSION,
            base_path: base_path.to_string_lossy().into_owned(),
            saved_at: Utc::now(),
            digest: snapshot.digest(),
            snapshot: snapshot.clone(),
        };
        let bytes = self.encode(&stored)?;

        let history = self.history_path(base_path, &stored.digest);
        write_atomic(&history, &bytes).map_err(|e| InventoryError::io(&history, e))?;
        let current = self.current_path(base_path);
        write_atomic(&current, &bytes).map_err(|e| InventoryError::io(&current, e))?;

        info!(
            base = %base_path.display(),
            digest = %stored.digest,
            records = snapshot.len(),
            "inventory saved"
        );
        Ok(stored.info())
    }

    fn encode(&self, stored: &StoredInventory) -> Result<Vec<u8>> {
        codec::encode(stored, Some(self.compression_level))
    }

    fn read_file(&self, path: &Path) -> Result<StoredInventory> {
        let corrupt = |detail: String| InventoryError::Corrupt {
            path: path.to_path_buf(),
            detail,
        };

        let bytes = std::fs::read(path).map_err(|e| InventoryError::io(path, e))?;
        let stored: StoredInventory = codec::decode(&bytes, true, path)?;

        if stored.version != STORE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                stored.version
            )));
        }
        let actual = stored.snapshot.digest();
        if actual != stored.digest {
            return Err(corrupt(format!(
                "digest mismatch (recorded {}, computed {actual})",
                stored.digest
            )));
        }
        Ok(stored)
    }
}
