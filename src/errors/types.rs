//! Error type definitions for the print intake service

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures that abort a single print job
#[derive(Error, Debug)]
pub enum JobError {
    /// The frame had no `,` separating job id from URL
    #[error("malformed message (expected \"<job_id>,<url>\"): {raw}")]
    MalformedMessage { raw: String },

    /// The job id cannot be used as a cache file name
    #[error("invalid job id '{job_id}': {reason}")]
    InvalidJobId { job_id: String, reason: String },

    /// Network or storage failure while fetching the document
    #[error("download of {url} failed: {message}")]
    RetrievalFailure { url: String, message: String },

    /// A bounded operation did not finish in time
    #[error("{operation} timed out after {}", humantime::format_duration(*.after))]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Paper width/height are not positive numbers
    #[error("invalid paper size: {message}")]
    InvalidPaperSize { message: String },

    /// The print executable is not where the configuration says it is
    #[error("print executable not found: {}", .path.display())]
    PrintExecutableMissing { path: PathBuf },

    /// The print executable could not be started at all
    #[error("failed to launch print executable: {source}")]
    PrintLaunch {
        #[source]
        source: std::io::Error,
    },

    /// The print executable ran and exited non-zero
    #[error("print failed with exit code {exit_code}: {output}")]
    PrintFailure {
        exit_code: i32,
        output: String,
        printer: String,
        paper_setting: String,
    },
}

impl JobError {
    pub fn malformed<S: Into<String>>(raw: S) -> Self {
        Self::MalformedMessage { raw: raw.into() }
    }

    pub fn invalid_job_id<J: Into<String>, R: Into<String>>(job_id: J, reason: R) -> Self {
        Self::InvalidJobId {
            job_id: job_id.into(),
            reason: reason.into(),
        }
    }

    pub fn retrieval<U: Into<String>, M: std::fmt::Display>(url: U, message: M) -> Self {
        Self::RetrievalFailure {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_paper_size<S: Into<String>>(message: S) -> Self {
        Self::InvalidPaperSize {
            message: message.into(),
        }
    }

    /// Stable classification name, used as the journal prefix
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedMessage { .. } => "MalformedMessage",
            Self::InvalidJobId { .. } => "InvalidJobId",
            Self::RetrievalFailure { .. } => "RetrievalFailure",
            Self::Timeout { .. } => "Timeout",
            Self::InvalidPaperSize { .. } => "InvalidPaperSize",
            Self::PrintExecutableMissing { .. } => "PrintExecutableMissing",
            Self::PrintLaunch { .. } => "PrintLaunch",
            Self::PrintFailure { .. } => "PrintFailure",
        }
    }
}

/// Failures that prevent the service from starting or serving
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Listener could not be bound
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O failure during setup
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction failure
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ServiceError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ServiceError {
    fn from(err: figment::Error) -> Self {
        Self::configuration(err.to_string())
    }
}
