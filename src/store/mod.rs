//! Entry storage
//!
//! The whole collection lives in a single JSON snapshot, newest entry
//! first. Reads tolerate a missing or damaged file by treating it as
//! empty; writes replace the file atomically (temporary sibling file,
//! fsync, rename) so a reader never sees a half-written snapshot.
//!
//! [`EntryStore`] serializes every load → mutate → save sequence behind a
//! single async mutex, so concurrent requests cannot lose each other's
//! updates.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod entry;

pub use entry::{generate_id, Entry, EntryType, UnknownEntryType, ID_LEN};

/// Retention cap; older entries are dropped on save
pub const MAX_ENTRIES: usize = 100;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while writing the snapshot
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Blocking storage task panicked or was cancelled
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result of a mutation passed to [`EntryStore::update`]
#[derive(Debug)]
pub enum Change<T> {
    /// Persist the mutated entries, then return the value
    Persist(T),
    /// Leave the snapshot untouched
    Discard(T),
}

/// Persistent, bounded, newest-first entry collection
#[derive(Debug)]
pub struct EntryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EntryStore {
    /// Create a store backed by the snapshot at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Snapshot file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; see [`load_snapshot`]
    pub fn load(&self) -> Vec<Entry> {
        load_snapshot(&self.path)
    }

    /// Write the snapshot; see [`save_snapshot`]
    pub fn save(&self, entries: &[Entry]) -> Result<(), StoreError> {
        save_snapshot(&self.path, entries)
    }

    /// Current entries, newest first
    pub async fn snapshot(&self) -> Result<Vec<Entry>, StoreError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        Ok(tokio::task::spawn_blocking(move || load_snapshot(&path)).await?)
    }

    /// Run a load → mutate → save sequence under the store lock.
    ///
    /// The snapshot is rewritten only when `mutate` returns
    /// [`Change::Persist`]; it has been durably replaced by the time this
    /// returns.
    pub async fn update<T, F>(&self, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<Entry>) -> Change<T>,
    {
        let _guard = self.lock.lock().await;

        let path = self.path.clone();
        let mut entries = tokio::task::spawn_blocking(move || load_snapshot(&path)).await?;

        match mutate(&mut entries) {
            Change::Persist(value) => {
                let path = self.path.clone();
                tokio::task::spawn_blocking(move || save_snapshot(&path, &entries)).await??;
                Ok(value)
            }
            Change::Discard(value) => Ok(value),
        }
    }
}

/// Read the snapshot at `path`.
///
/// Never fails: a missing, unreadable, or malformed file yields an empty
/// collection.
pub fn load_snapshot(path: &Path) -> Vec<Entry> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No snapshot at {:?}, starting empty", path);
            return Vec::new();
        }
        Err(e) => {
            warn!("Failed to read snapshot {:?}: {}", path, e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Entry>>(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Snapshot {:?} is malformed, treating as empty: {}", path, e);
            Vec::new()
        }
    }
}

/// Atomically replace the snapshot at `path` with the first
/// [`MAX_ENTRIES`] of `entries`.
pub fn save_snapshot(path: &Path, entries: &[Entry]) -> Result<(), StoreError> {
    let kept = &entries[..entries.len().min(MAX_ENTRIES)];
    let content = serde_json::to_string_pretty(kept)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let tmp_path = dir.join(format!(".{}-{}.tmp", file_name, Uuid::new_v4()));

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    debug!("Saved {} entries to {:?}", kept.len(), path);
    Ok(())
}

/// Prepend `entry`; the cap is applied when saving
pub fn insert_newest(mut entries: Vec<Entry>, entry: Entry) -> Vec<Entry> {
    entries.insert(0, entry);
    entries
}

/// Remove the entry with `id`, reporting whether one was found
pub fn remove_by_id(entries: Vec<Entry>, id: &str) -> (Vec<Entry>, bool) {
    let before = entries.len();
    let remaining: Vec<Entry> = entries.into_iter().filter(|e| e.id != id).collect();
    let removed = remaining.len() < before;
    (remaining, removed)
}

/// Generate an id not used by any of `entries`
pub fn fresh_id(entries: &[Entry]) -> String {
    loop {
        let id = generate_id();
        if !entries.iter().any(|e| e.id == id) {
            return id;
        }
    }
}
