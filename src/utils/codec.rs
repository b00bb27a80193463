//! Binary encoding of persisted state: bincode, optionally wrapped in a zstd frame.

use crate::error::{InventoryError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Upper bound on any single decoded length; a corrupt length prefix fails instead of
/// allocating
const DECODE_LIMIT: usize = 512 * 1024 * 1024;

fn config() -> impl bincode::config::Config {
    bincode::config::legacy().with_limit::<DECODE_LIMIT>()
}

/// Encodes `value`, compressing with zstd at `level` when one is given.
///
/// # Errors
///
/// Returns [`InventoryError::Encode`] if serialization or compression fails
pub fn encode<T: Serialize>(value: &T, level: Option<i32>) -> Result<Vec<u8>> {
    let raw = bincode::serde::encode_to_vec(value, config())
        .map_err(|e| InventoryError::Encode(e.to_string()))?;
    match level {
        Some(level) => zstd::encode_all(raw.as_slice(), level)
            .map_err(|e| InventoryError::Encode(e.to_string())),
        None => Ok(raw),
    }
}

/// Decodes bytes produced by [`encode`]; `source` names the file in errors.
///
/// # Errors
///
/// Returns [`InventoryError::Corrupt`] if the frame or the payload cannot be decoded
pub fn decode<T: DeserializeOwned>(bytes: &[u8], compressed: bool, source: &Path) -> Result<T> {
    let corrupt = |detail: String| InventoryError::Corrupt {
        path: source.to_path_buf(),
        detail,
    };

    let inflated;
    let raw = if compressed {
        inflated = zstd::decode_all(bytes).map_err(|e| corrupt(format!("zstd: {e}")))?;
        inflated.as_slice()
    } else {
        bytes
    };
    let (value, _read) =
        bincode::serde::decode_from_slice(raw, config()).map_err(|e| corrupt(e.to_string()))?;
    Ok(value)
}
