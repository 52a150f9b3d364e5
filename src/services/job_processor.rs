//! Print job pipeline
//!
//! One inbound frame becomes one job: parse, download, validate paper size,
//! print, and prune the cache on success. Every step is journaled. Errors and
//! panics are contained here so one bad job never affects the connection or
//! any other job.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::errors::{JobError, JobResult};
use crate::journal::LogJournal;
use crate::models::{Job, PaperSize};
use crate::retention::{PruneReport, RetentionStore};
use crate::services::fetcher::DocumentFetcher;
use crate::services::notifier::OperatorNotifier;
use crate::services::print_invoker::PrintInvoker;
use crate::services::settings::PrinterSettingsProvider;
use crate::utils::UrlUtils;

/// Result of a job that printed successfully
#[derive(Debug, Clone)]
pub struct PrintedJob {
    pub job: Job,
    pub document: PathBuf,
    pub bytes: u64,
    pub pruned: PruneReport,
}

pub struct JobProcessor {
    settings: Arc<dyn PrinterSettingsProvider>,
    fetcher: Arc<dyn DocumentFetcher>,
    invoker: PrintInvoker,
    retention: Arc<RetentionStore>,
    journal: Arc<LogJournal>,
    notifier: Arc<dyn OperatorNotifier>,
    download_timeout: Duration,
}

impl JobProcessor {
    pub fn new(
        settings: Arc<dyn PrinterSettingsProvider>,
        fetcher: Arc<dyn DocumentFetcher>,
        invoker: PrintInvoker,
        retention: Arc<RetentionStore>,
        journal: Arc<LogJournal>,
        notifier: Arc<dyn OperatorNotifier>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            settings,
            fetcher,
            invoker,
            retention,
            journal,
            notifier,
            download_timeout,
        }
    }

    pub fn journal(&self) -> &Arc<LogJournal> {
        &self.journal
    }

    pub fn invoker(&self) -> &PrintInvoker {
        &self.invoker
    }

    /// Run one job to completion. Never fails: every error ends up in the journal.
    pub async fn execute(&self, raw: &str) {
        match AssertUnwindSafe(self.try_execute(raw)).catch_unwind().await {
            Ok(Ok(printed)) => debug!(
                "Job {} printed ({} bytes, {} cached files removed)",
                printed.job.job_id,
                printed.bytes,
                printed.pruned.removed.len()
            ),
            Ok(Err(e)) => self.report_failure(&e).await,
            Err(panic) => {
                self.journal
                    .error(format!(
                        "⚠️ Print job aborted unexpectedly: {}",
                        panic_message(panic.as_ref())
                    ))
                    .await;
            }
        }
    }

    /// Run one job and hand the error back instead of journaling it.
    ///
    /// Progress steps are journaled either way.
    pub async fn try_execute(&self, raw: &str) -> JobResult<PrintedJob> {
        if !self.invoker.executable_exists().await {
            return Err(JobError::PrintExecutableMissing {
                path: self.invoker.executable().to_path_buf(),
            });
        }

        let job = Job::parse(raw)?;
        let settings = self.settings.current().await;
        let log_url = UrlUtils::obfuscate_credentials(&job.source_url);

        tokio::fs::create_dir_all(&settings.cache_dir)
            .await
            .map_err(|e| {
                JobError::retrieval(
                    &log_url,
                    format!(
                        "cannot create cache directory {}: {e}",
                        settings.cache_dir.display()
                    ),
                )
            })?;
        let document = job.cache_path(&settings.cache_dir, &self.retention.policy().extension);

        self.journal
            .info(format!("⬇️ Downloading PDF: {log_url}"))
            .await;
        let bytes = tokio::time::timeout(
            self.download_timeout,
            self.fetcher.fetch(&job.source_url, &document),
        )
        .await
        .map_err(|_| JobError::Timeout {
            operation: "download",
            after: self.download_timeout,
        })??;
        self.journal
            .success(format!("✅ Saved to: {}", document.display()))
            .await;

        self.journal.info("🖨️ Printing...").await;
        let paper = match PaperSize::parse(&settings.paper_width_mm, &settings.paper_height_mm) {
            Ok(paper) => paper,
            Err(e) => {
                self.notifier.notify_error(
                    "Invalid paper size",
                    &format!("Paper width and height must be positive numbers.\n{e}"),
                );
                return Err(e);
            }
        };

        let command = self
            .invoker
            .command_line(&document, &settings.printer_name, &paper);
        self.journal
            .info(format!("📋 Running command: {}", command.join(" ")))
            .await;

        let output = self
            .invoker
            .invoke(&document, &settings.printer_name, &paper)
            .await?;
        if !output.success() {
            return Err(JobError::PrintFailure {
                exit_code: output.exit_code,
                output: output.combined_output.trim().to_string(),
                printer: settings.printer_name,
                paper_setting: paper.print_setting(),
            });
        }

        self.journal.success("✅ Print complete").await;
        let pruned = self.retention.prune(&settings.cache_dir).await;

        Ok(PrintedJob {
            job,
            document,
            bytes,
            pruned,
        })
    }

    async fn report_failure(&self, err: &JobError) {
        self.journal
            .error(format!("⚠️ [{}] {}", err.kind(), err))
            .await;

        match err {
            JobError::PrintFailure {
                printer,
                paper_setting,
                ..
            } => {
                let printer = if printer.is_empty() {
                    "(system default)"
                } else {
                    printer.as_str()
                };
                self.journal
                    .info(format!(
                        "   Make sure the print executable exists and printer '{printer}' is available."
                    ))
                    .await;
                self.journal
                    .info(format!(
                        "   Check that the paper size setting '{paper_setting}' is supported by the printer."
                    ))
                    .await;
                self.journal
                    .info("   Command-line printing sometimes requires running this service with administrator privileges.")
                    .await;
            }
            JobError::PrintExecutableMissing { path } => {
                self.journal
                    .info(format!(
                        "   Copy the print executable to {} (portable SumatraPDF: https://www.sumatrapdfreader.org/download-free-pdf-viewer)",
                        path.display()
                    ))
                    .await;
            }
            _ => {}
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
