//! Core data types flowing through the job pipeline

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{JobError, JobResult};

/// Timestamp format used in display lines and the persisted journal
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single print request, parsed from `"<job_id>,<source_url>"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: String,
    pub source_url: String,
}

impl Job {
    /// Split on the first comma only; the URL may itself contain commas.
    pub fn parse(raw: &str) -> JobResult<Self> {
        let Some((job_id, source_url)) = raw.split_once(',') else {
            return Err(JobError::malformed(raw));
        };

        if job_id.is_empty() {
            return Err(JobError::invalid_job_id(job_id, "job id is empty"));
        }
        if job_id.contains(['/', '\\', '\0']) || job_id == "." || job_id == ".." {
            return Err(JobError::invalid_job_id(
                job_id,
                "job id must be a plain file name",
            ));
        }

        Ok(Self {
            job_id: job_id.to_string(),
            source_url: source_url.to_string(),
        })
    }

    /// `<cache_dir>/<job_id>.<extension>`
    pub fn cache_path(&self, cache_dir: &Path, extension: &str) -> PathBuf {
        cache_dir.join(format!(
            "{}.{}",
            self.job_id,
            extension.trim_start_matches('.')
        ))
    }
}

/// Printer selection as supplied by the operator, read fresh for every job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSettings {
    /// Empty means "system default printer"
    pub printer_name: String,
    pub paper_width_mm: String,
    pub paper_height_mm: String,
    pub cache_dir: PathBuf,
}

/// Validated paper dimensions in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PaperSize {
    /// Both values must parse as finite numbers greater than zero.
    pub fn parse(width: &str, height: &str) -> JobResult<Self> {
        let width_mm = parse_dimension("width", width)?;
        let height_mm = parse_dimension("height", height)?;
        Ok(Self {
            width_mm,
            height_mm,
        })
    }

    /// Value for the executable's `-print-settings` flag, e.g. `paperSize=100.0x150.0mm`
    pub fn print_setting(&self) -> String {
        format!(
            "paperSize={}x{}mm",
            format_mm(self.width_mm),
            format_mm(self.height_mm)
        )
    }
}

fn parse_dimension(name: &str, raw: &str) -> JobResult<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        JobError::invalid_paper_size(format!("{name} '{raw}' is not a number"))
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(JobError::invalid_paper_size(format!(
            "{name} must be greater than 0, got '{raw}'"
        )));
    }
    Ok(value)
}

// Whole numbers keep one decimal place: 100 -> "100.0", 80.5 -> "80.5"
fn format_mm(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Severity tag carried by every journal entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    System,
}

/// One journal event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub text: String,
}

impl LogEntry {
    /// Build an entry stamped now. Line breaks in `text` are folded so the entry
    /// occupies exactly one line when persisted.
    pub fn now<S: AsRef<str>>(text: S, severity: Severity) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            text: single_line(text.as_ref()),
        }
    }

    /// `[<timestamp>] <text>`
    pub fn display_line(&self) -> String {
        format!("[{}] {}", self.timestamp.format(TIMESTAMP_FORMAT), self.text)
    }
}

fn single_line(text: &str) -> String {
    if !text.contains(['\n', '\r']) {
        return text.to_string();
    }
    text.split(['\r', '\n'])
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
