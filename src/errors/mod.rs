//! Error types for the print intake service
//!
//! Two families live here:
//!
//! - **Job errors**: everything that can abort a single print job. These never
//!   escape [`JobProcessor::execute`](crate::services::JobProcessor::execute);
//!   they are rendered into the journal and the job is abandoned.
//! - **Service errors**: configuration, bind and I/O failures that stop the
//!   service from starting.
//!
//! # Usage
//!
//! ```rust
//! use silent_print::errors::{JobError, JobResult};
//!
//! fn parse_width(raw: &str) -> JobResult<f64> {
//!     raw.parse().map_err(|_| JobError::invalid_paper_size("width is not a number"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Result alias for per-job operations
pub type JobResult<T> = Result<T, JobError>;

/// Result alias for service setup operations
pub type ServiceResult<T> = Result<T, ServiceError>;
