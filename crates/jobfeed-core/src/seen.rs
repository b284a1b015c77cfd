//! Persisted per-destination record of links already delivered.
//!
//! The whole store is one JSON document:
//!
//! ```text
//! { "destinations": { "<id>": { "links": ["https://...", ...] } } }
//! ```
//!
//! Links are only ever added. Every commit rewrites the file through a
//! temporary file in the same directory followed by an atomic rename, so a
//! crash mid-save leaves the previous snapshot intact.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::AppError;
use crate::models::Job;

/// Links delivered to one destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    #[serde(default)]
    pub links: BTreeSet<String>,
}

/// On-disk shape of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenSnapshot {
    #[serde(alias = "channels")]
    pub destinations: BTreeMap<String, SeenRecord>,
}

/// Jobs not yet delivered to a destination, plus their links for a later commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterResult {
    pub fresh: Vec<Job>,
    pub links: Vec<String>,
}

/// Shared dedup store. Wrap in an `Arc` and hand clones to every trigger.
pub struct SeenStore {
    path: PathBuf,
    state: Mutex<SeenSnapshot>,
    destination_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SeenStore {
    /// Load the store from `path`.
    ///
    /// Never fails: a missing or empty file gives an empty store, and a
    /// corrupted one is logged and replaced by an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match read_snapshot(&path).await {
            Ok(snapshot) => {
                tracing::info!(
                    path = %path.display(),
                    destinations = snapshot.destinations.len(),
                    "Loaded seen store"
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Seen store unreadable, starting fresh");
                SeenSnapshot::default()
            }
        };
        Self::with_snapshot(path, snapshot)
    }

    /// Create an empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::with_snapshot(path.into(), SeenSnapshot::default())
    }

    fn with_snapshot(path: PathBuf, snapshot: SeenSnapshot) -> Self {
        Self {
            path,
            state: Mutex::new(snapshot),
            destination_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire exclusive access to one destination's seen set.
    ///
    /// Hold the guard from `filter_new` through `commit` so that two
    /// overlapping runs for the same destination cannot both treat the same
    /// links as new and then overwrite each other's additions. Other
    /// destinations are not blocked.
    pub async fn lock(self: &Arc<Self>, destination: &str) -> SeenGuard {
        let lock = {
            let mut locks = self
                .destination_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(destination.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        SeenGuard {
            store: Arc::clone(self),
            destination: destination.to_string(),
            _guard: guard,
        }
    }

    /// Split `jobs` into those not yet delivered to `destination`. Read-only.
    pub async fn filter_new(self: &Arc<Self>, destination: &str, jobs: &[Job]) -> FilterResult {
        self.lock(destination).await.filter_new(jobs).await
    }

    /// Mark `links` as delivered to `destination` and persist the store.
    pub async fn commit(self: &Arc<Self>, destination: &str, links: &[String]) -> Result<usize, AppError> {
        self.lock(destination).await.commit(links).await
    }

    pub async fn seen_count(&self, destination: &str) -> usize {
        let state = self.state.lock().await;
        state
            .destinations
            .get(destination)
            .map_or(0, |r| r.links.len())
    }

    pub async fn snapshot(&self) -> SeenSnapshot {
        self.state.lock().await.clone()
    }

    async fn filter_unlocked(&self, destination: &str, jobs: &[Job]) -> FilterResult {
        let state = self.state.lock().await;
        let seen = state.destinations.get(destination).map(|r| &r.links);

        let mut emitted = HashSet::new();
        let mut result = FilterResult::default();
        for job in jobs {
            let already = seen.is_some_and(|links| links.contains(&job.link));
            if already || !emitted.insert(job.link.as_str()) {
                continue;
            }
            result.links.push(job.link.clone());
            result.fresh.push(job.clone());
        }
        result
    }

    async fn commit_unlocked(&self, destination: &str, links: &[String]) -> Result<usize, AppError> {
        let mut state = self.state.lock().await;
        let record = state.destinations.entry(destination.to_string()).or_default();
        let before = record.links.len();
        record.links.extend(links.iter().cloned());
        let added = record.links.len() - before;

        // Serialize and write while still holding the lock so saves land in order.
        let body = serde_json::to_vec_pretty(&*state)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &body))
            .await
            .map_err(|e| AppError::StoreError(format!("persist task failed: {e}")))??;

        tracing::debug!(%destination, added, total = record_len(&state, destination), "Committed seen links");
        Ok(added)
    }
}

fn record_len(state: &SeenSnapshot, destination: &str) -> usize {
    state
        .destinations
        .get(destination)
        .map_or(0, |r| r.links.len())
}

/// Exclusive handle on one destination's seen set. See [`SeenStore::lock`].
pub struct SeenGuard {
    store: Arc<SeenStore>,
    destination: String,
    _guard: OwnedMutexGuard<()>,
}

impl SeenGuard {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Jobs whose link is not in the seen set, first occurrence only.
    pub async fn filter_new(&self, jobs: &[Job]) -> FilterResult {
        self.store.filter_unlocked(&self.destination, jobs).await
    }

    /// Union `links` into the seen set and persist. Returns how many were new.
    pub async fn commit(&self, links: &[String]) -> Result<usize, AppError> {
        self.store.commit_unlocked(&self.destination, links).await
    }
}

async fn read_snapshot(path: &Path) -> Result<SeenSnapshot, AppError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(SeenSnapshot::default()),
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| AppError::StoreCorrupted(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SeenSnapshot::default()),
        Err(e) => Err(AppError::StoreCorrupted(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

fn write_atomic(path: &Path, body: &[u8]) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| AppError::StoreError(format!("failed to create {}: {e}", dir.display())))?;

    let mut tmp = NamedTempFile::new_in(&dir)
        .map_err(|e| AppError::StoreError(format!("failed to create temp file: {e}")))?;
    tmp.write_all(body)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| AppError::StoreError(format!("failed to write temp file: {e}")))?;
    tmp.persist(path).map_err(|e| {
        AppError::StoreError(format!("failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}
