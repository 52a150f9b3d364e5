//! Count-based retention policy for the document cache.

use std::path::PathBuf;
use std::time::SystemTime;

/// A managed file considered for eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Keep the `max_files` most recently modified files carrying `extension`.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// How many managed files survive a prune
    pub max_files: usize,
    /// Managed extension without the leading dot, matched case-insensitively
    pub extension: String,
}

impl RetentionPolicy {
    /// Default: keep the 10 newest `.pdf` files.
    pub fn new() -> Self {
        Self {
            max_files: 10,
            extension: "pdf".to_string(),
        }
    }

    /// Set how many files are retained.
    pub fn keep_latest(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Set the managed extension (a leading dot is ignored).
    pub fn extension<S: AsRef<str>>(mut self, extension: S) -> Self {
        self.extension = extension.as_ref().trim_start_matches('.').to_ascii_lowercase();
        self
    }

    /// Whether `file_name` is managed by this policy.
    pub fn matches(&self, file_name: &str) -> bool {
        let suffix = format!(".{}", self.extension.to_lowercase());
        file_name.to_lowercase().ends_with(&suffix)
    }

    /// Order `entries` oldest first and return the ones beyond the retention limit.
    ///
    /// The sort is stable, so entries with equal timestamps keep their listing order.
    pub fn select_evictions(&self, mut entries: Vec<CacheEntry>) -> Vec<CacheEntry> {
        if entries.len() <= self.max_files {
            return Vec::new();
        }
        entries.sort_by_key(|entry| entry.modified);
        let excess = entries.len() - self.max_files;
        entries.truncate(excess);
        entries
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new()
    }
}
