//! Shared file primitives: per-path write locks and atomic JSON writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use domains::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

/// Per-path async locks serializing read-modify-write cycles within the
/// process. Entries are kept for the lifetime of the store; the table grows
/// with the number of distinct documents touched since startup.
#[derive(Default)]
pub(crate) struct LockTable {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl LockTable {
    pub(crate) fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Reads and parses a JSON document. `Ok(None)` when the file is missing.
pub(crate) async fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Serializes compactly and writes atomically: a hidden temp sibling first,
/// then a rename over the target, so readers never observe a half-written
/// document.
pub(crate) async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Internal(format!("unusable path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
