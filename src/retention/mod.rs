//! Bounded document cache
//!
//! After each successful print the cache directory is pruned down to the
//! policy's limit, oldest modification time first. Pruning is two-phase like
//! the rest of our cleanup code: snapshot the directory, decide, then remove.
//! The whole pass runs under one lock so concurrent jobs cannot double-delete
//! or under-count.

pub mod policy;

pub use policy::{CacheEntry, RetentionPolicy};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs, sync::Mutex};
use tracing::debug;

use crate::journal::LogJournal;

/// Outcome of one prune pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// Managed files found before removal
    pub scanned: usize,
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

pub struct RetentionStore {
    policy: RetentionPolicy,
    journal: Arc<LogJournal>,
    prune_lock: Mutex<()>,
}

impl RetentionStore {
    pub fn new(policy: RetentionPolicy, journal: Arc<LogJournal>) -> Self {
        Self {
            policy,
            journal,
            prune_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Delete the oldest managed files in `dir` until the policy limit remains.
    ///
    /// Each failed deletion is journaled as a warning; the remaining deletions still run.
    pub async fn prune(&self, dir: &Path) -> PruneReport {
        let _guard = self.prune_lock.lock().await;

        let snapshot = match self.collect_snapshot(dir).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.journal
                    .warning(format!(
                        "⚠️ Could not scan cache directory {}: {}",
                        dir.display(),
                        e
                    ))
                    .await;
                return PruneReport::default();
            }
        };

        let scanned = snapshot.len();
        let evictions = self.policy.select_evictions(snapshot);
        let mut report = self
            .remove_evictions(evictions, |path| async move { fs::remove_file(path).await })
            .await;
        report.scanned = scanned;

        debug!(
            "Prune of {}: scanned={}, removed={}, failed={}",
            dir.display(),
            report.scanned,
            report.removed.len(),
            report.failed.len()
        );
        report
    }

    /// Phase 2: remove each eviction, journaling every outcome. A failure never
    /// stops the remaining removals.
    async fn remove_evictions<F, Fut>(&self, evictions: Vec<CacheEntry>, remove: F) -> PruneReport
    where
        F: Fn(PathBuf) -> Fut,
        Fut: Future<Output = std::io::Result<()>>,
    {
        let mut report = PruneReport::default();

        for entry in evictions {
            let name = display_name(&entry.path);
            match remove(entry.path.clone()).await {
                Ok(()) => {
                    self.journal
                        .warning(format!("🗑️ Removed old cached file: {name}"))
                        .await;
                    report.removed.push(entry.path);
                }
                Err(e) => {
                    self.journal
                        .warning(format!("⚠️ Failed to remove old cached file {name}: {e}"))
                        .await;
                    report.failed.push(entry.path);
                }
            }
        }
        report
    }

    /// Phase 1: list managed regular files with their modification times.
    async fn collect_snapshot(&self, dir: &Path) -> std::io::Result<Vec<CacheEntry>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut snapshot = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !self.policy.matches(file_name) {
                continue;
            }

            // Follows symlinks, like the listing the operator sees
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata.modified().unwrap_or(std::time::UNIX_EPOCH);
            snapshot.push(CacheEntry { path, modified });
        }

        Ok(snapshot)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
