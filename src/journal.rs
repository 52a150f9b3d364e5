//! Operator-facing activity journal
//!
//! Every [`LogJournal::record`] call does two things:
//!
//! 1. Renders `[<timestamp>] <text>` to the live surface (a broadcast channel
//!    that a UI or console can subscribe to). With nobody subscribed, the line
//!    goes to `tracing` instead, at a level matching the severity.
//! 2. Rewrites the journal file so it holds at most `max_lines` most-recent
//!    entries. The read-modify-write runs under one lock so concurrent jobs
//!    never lose each other's lines, and the new content is persisted via a
//!    temp file + rename so a crash mid-write leaves the previous file intact.
//!
//! Journal I/O failures are reported through `tracing` and never fail the caller.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, broadcast};
use tracing::{error, info, warn};

use crate::models::{LogEntry, Severity};

/// Capacity of the live surface channel; slow subscribers drop old entries
pub const LIVE_BUFFER_SIZE: usize = 256;

#[derive(Debug)]
pub struct LogJournal {
    path: PathBuf,
    max_lines: usize,
    live: broadcast::Sender<LogEntry>,
    file_lock: Mutex<()>,
}

impl LogJournal {
    pub fn new<P: Into<PathBuf>>(path: P, max_lines: usize) -> Self {
        let (live, _) = broadcast::channel(LIVE_BUFFER_SIZE);
        Self {
            path: path.into(),
            max_lines: max_lines.max(1),
            live,
            file_lock: Mutex::new(()),
        }
    }

    /// Attach a live surface. While at least one receiver exists, display
    /// lines are delivered here instead of the `tracing` fallback.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.live.subscribe()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub async fn record<S: AsRef<str>>(&self, text: S, severity: Severity) {
        let entry = LogEntry::now(text, severity);
        let line = entry.display_line();

        if self.live.receiver_count() > 0 {
            // Receivers may drop between the check and the send; the line is then lost
            // for display only, the file below still gets it.
            let _ = self.live.send(entry);
        } else {
            emit_fallback(severity, &line);
        }

        let _guard = self.file_lock.lock().await;
        let path = self.path.clone();
        let max_lines = self.max_lines;
        let span = tracing::Span::current();
        match tokio::task::spawn_blocking(move || {
            span.in_scope(|| append_bounded(&path, line, max_lines))
        })
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                "Failed to write journal file {}: {}",
                self.path.display(),
                e
            ),
            Err(e) => warn!("Journal writer task failed: {}", e),
        }
    }

    pub async fn info<S: AsRef<str>>(&self, text: S) {
        self.record(text, Severity::Info).await;
    }

    pub async fn success<S: AsRef<str>>(&self, text: S) {
        self.record(text, Severity::Success).await;
    }

    pub async fn warning<S: AsRef<str>>(&self, text: S) {
        self.record(text, Severity::Warning).await;
    }

    pub async fn error<S: AsRef<str>>(&self, text: S) {
        self.record(text, Severity::Error).await;
    }

    pub async fn system<S: AsRef<str>>(&self, text: S) {
        self.record(text, Severity::System).await;
    }

    /// Current persisted lines, oldest first. A missing file reads as empty.
    pub async fn persisted_lines(&self) -> io::Result<Vec<String>> {
        let _guard = self.file_lock.lock().await;
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(split_lines(&bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn emit_fallback(severity: Severity, line: &str) {
    match severity {
        Severity::Error => error!("{}", line),
        Severity::Warning => warn!("{}", line),
        Severity::Info | Severity::Success | Severity::System => info!("{}", line),
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Read existing lines, append `line`, keep the last `max_lines`, persist atomically.
fn append_bounded(path: &Path, line: String, max_lines: usize) -> io::Result<()> {
    let mut lines = match std::fs::read(path) {
        Ok(bytes) => split_lines(&bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!(
                "Failed to read journal file {}, starting fresh: {}",
                path.display(),
                e
            );
            Vec::new()
        }
    };

    lines.push(line);
    if lines.len() > max_lines {
        lines = lines.split_off(lines.len() - max_lines);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = io::BufWriter::new(tmp.as_file_mut());
        for line in &lines {
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_file_is_truncated_to_most_recent_lines() {
        let dir = tempfile::tempdir().unwrap();
        let journal = LogJournal::new(dir.path().join("journal.txt"), 10);

        for i in 0..25 {
            journal.info(format!("entry {i}")).await;
        }

        let lines = journal.persisted_lines().await.unwrap();
        assert_eq!(lines.len(), 10);
        for (offset, line) in lines.iter().enumerate() {
            assert!(
                line.ends_with(&format!("] entry {}", 15 + offset)),
                "unexpected line {line}"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let journal = LogJournal::new(dir.path().join("nested/logs/journal.txt"), 5);

        journal.system("started").await;

        let lines = journal.persisted_lines().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("] started"));
    }

    #[tokio::test]
    async fn test_existing_non_utf8_content_is_kept_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.txt");
        std::fs::write(&path, b"[old] caf\xe9\n").unwrap();
        let journal = LogJournal::new(&path, 5);

        journal.info("new").await;

        let lines = journal.persisted_lines().await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[old] caf"));
    }

    #[tokio::test]
    async fn test_live_surface_receives_entries() {
        let dir = tempfile::tempdir().unwrap();
        let journal = LogJournal::new(dir.path().join("journal.txt"), 5);
        let mut surface = journal.subscribe();

        journal.success("printed").await;

        let entry = surface.recv().await.unwrap();
        assert_eq!(entry.severity, Severity::Success);
        assert_eq!(entry.text, "printed");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_fallback_channel_without_surface() {
        let dir = tempfile::tempdir().unwrap();
        let journal = LogJournal::new(dir.path().join("journal.txt"), 5);

        journal.warning("cache entry removed").await;

        assert!(logs_contain("cache entry removed"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unreadable_journal_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the journal file should be: reads and the final rename both fail
        let path = dir.path().join("journal.txt");
        std::fs::create_dir(&path).unwrap();
        let journal = LogJournal::new(&path, 5);

        journal.error("print failed").await;

        assert!(logs_contain("Failed to read journal file"));
        assert!(logs_contain("Failed to write journal file"));
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(LogJournal::new(dir.path().join("journal.txt"), 100));

        let mut handles = Vec::new();
        for writer in 0..4 {
            let journal = journal.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    journal.info(format!("writer {writer} entry {i}")).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let lines = journal.persisted_lines().await.unwrap();
        assert_eq!(lines.len(), 40);
        assert!(lines.iter().all(|l| l.starts_with('[') && l.contains("] writer ")));
    }
}
