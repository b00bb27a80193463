//! Content fingerprints for individual files.
//!
//! A fixity is the SHA-256 of a file's complete content. Files are streamed through the hasher
//! in fixed-size chunks, so memory use does not depend on file size, and the size and
//! modification time are checked before and after hashing to catch files that change
//! underneath the read.

use crate::error::{InventoryError, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::{self, File, Metadata};
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Default read buffer for hashing
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Fixity of the empty byte string
pub const EMPTY_FIXITY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Size, modification time and content digest of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFixity {
    pub size_bytes: u64,
    pub mtime: DateTime<Utc>,
    /// Lowercase hex SHA-256
    pub fixity: String,
}

/// Hashes `data` the same way files are hashed.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Computes the fixity of `path` with the default buffer size.
///
/// # Errors
///
/// See [`compute_with_buffer`].
pub fn compute(path: &Path) -> Result<FileFixity> {
    compute_with_buffer(path, DEFAULT_BUFFER_SIZE)
}

/// Computes the fixity of `path`, reading `buffer_size` bytes at a time.
///
/// # Errors
///
/// Returns [`InventoryError::Io`] if the file cannot be opened or read, and
/// [`InventoryError::Integrity`] if its size or modification time changed while it was being
/// hashed.
pub fn compute_with_buffer(path: &Path, buffer_size: usize) -> Result<FileFixity> {
    let before = fs::metadata(path).map_err(|e| InventoryError::io(path, e))?;
    let mut file = File::open(path).map_err(|e| InventoryError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut hashed: u64 = 0;
    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(InventoryError::io(path, e)),
        };
        hasher.update(&buffer[..read]);
        hashed += read as u64;
    }

    let after = fs::metadata(path).map_err(|e| InventoryError::io(path, e))?;
    verify_unchanged(path, &before, &after, hashed)?;

    Ok(FileFixity {
        size_bytes: before.len(),
        mtime: modified_time(path, &before)?,
        fixity: hex::encode(hasher.finalize()),
    })
}

/// Modification time of `metadata` in UTC
///
/// # Errors
///
/// Returns [`InventoryError::Io`] if the platform does not report modification times.
pub fn modified_time(path: &Path, metadata: &Metadata) -> Result<DateTime<Utc>> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| InventoryError::io(path, e))
}

fn verify_unchanged(path: &Path, before: &Metadata, after: &Metadata, hashed: u64) -> Result<()> {
    let integrity = |detail: String| InventoryError::Integrity {
        path: path.to_path_buf(),
        detail,
    };

    if before.len() != after.len() {
        return Err(integrity(format!(
            "size changed from {} to {} bytes",
            before.len(),
            after.len()
        )));
    }
    if hashed != before.len() {
        return Err(integrity(format!(
            "read {hashed} bytes but metadata reports {}",
            before.len()
        )));
    }
    if modified_time(path, before)? != modified_time(path, after)? {
        return Err(integrity("modification time changed".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        assert_eq!(hash_bytes(b""), EMPTY_FIXITY);
        assert_eq!(
            hash_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_compute_matches_hash_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.bin");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        // Small buffer forces many chunks
        let fixity = compute_with_buffer(&path, 4096).unwrap();
        assert_eq!(fixity.fixity, hash_bytes(&content));
        assert_eq!(fixity.size_bytes, content.len() as u64);
    }

    #[test]
    fn test_fixity_ignores_path_and_mtime() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a.txt");
        let second = temp.path().join("nested/b.txt");
        fs::create_dir_all(second.parent().unwrap()).unwrap();
        fs::write(&first, "same").unwrap();
        fs::write(&second, "same").unwrap();
        filetime::set_file_mtime(&second, filetime::FileTime::from_unix_time(1_000_000, 0))
            .unwrap();

        let a = compute(&first).unwrap();
        let b = compute(&second).unwrap();
        assert_eq!(a.fixity, b.fixity);
        assert_ne!(a.mtime, b.mtime);
    }

    #[test]
    fn test_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty");
        fs::write(&path, "").unwrap();

        let fixity = compute(&path).unwrap();
        assert_eq!(fixity.fixity, EMPTY_FIXITY);
        assert_eq!(fixity.size_bytes, 0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = compute(&temp.path().join("absent"));
        assert!(matches!(result, Err(InventoryError::Io { .. })));
    }

    #[test]
    fn test_size_change_during_hash_is_integrity_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("growing.log");
        fs::write(&path, "short").unwrap();
        let before = fs::metadata(&path).unwrap();
        fs::write(&path, "much longer content").unwrap();
        let after = fs::metadata(&path).unwrap();

        let err = verify_unchanged(&path, &before, &after, before.len()).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Integrity { ref detail, .. } if detail.contains("size changed")
        ));
    }

    #[test]
    fn test_mtime_change_during_hash_is_integrity_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("touched.dat");
        fs::write(&path, "stable").unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_000_000, 0))
            .unwrap();
        let before = fs::metadata(&path).unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(2_000_000, 0))
            .unwrap();
        let after = fs::metadata(&path).unwrap();

        let err = verify_unchanged(&path, &before, &after, before.len()).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Integrity { ref detail, .. } if detail.contains("modification time")
        ));
        assert!(err.is_per_file());
    }

    #[test]
    fn test_short_read_is_integrity_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.bin");
        fs::write(&path, "0123456789").unwrap();
        let metadata = fs::metadata(&path).unwrap();

        assert!(verify_unchanged(&path, &metadata, &metadata, 10).is_ok());
        assert!(matches!(
            verify_unchanged(&path, &metadata, &metadata, 4),
            Err(InventoryError::Integrity { .. })
        ));
    }
}
