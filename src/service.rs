//! Wiring of configuration into a runnable print service

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::errors::ServiceResult;
use crate::journal::LogJournal;
use crate::retention::{RetentionPolicy, RetentionStore};
use crate::server::JobServer;
use crate::services::{
    HttpFetcher, JobProcessor, LogNotifier, OperatorNotifier, PrintInvoker,
    PrinterSettingsProvider, ProcessRunner,
};

pub struct PrintService {
    config: Config,
    settings: Arc<dyn PrinterSettingsProvider>,
    journal: Arc<LogJournal>,
    processor: Arc<JobProcessor>,
}

impl PrintService {
    /// Build the production pipeline: HTTP downloads, real child processes,
    /// and notices reported through `tracing`.
    pub fn from_config(
        config: Config,
        settings: Arc<dyn PrinterSettingsProvider>,
    ) -> ServiceResult<Self> {
        Self::with_notifier(config, settings, Arc::new(LogNotifier))
    }

    pub fn with_notifier(
        config: Config,
        settings: Arc<dyn PrinterSettingsProvider>,
        notifier: Arc<dyn OperatorNotifier>,
    ) -> ServiceResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.storage.cache_dir)?;

        let journal = Arc::new(LogJournal::new(
            config.storage.log_file.clone(),
            config.storage.max_log_lines,
        ));
        let retention = Arc::new(RetentionStore::new(
            RetentionPolicy::new()
                .keep_latest(config.storage.max_cached_files)
                .extension(&config.storage.managed_extension),
            journal.clone(),
        ));
        let fetcher = Arc::new(HttpFetcher::new(config.download.connect_timeout)?);
        let invoker = PrintInvoker::new(
            &config.print.executable,
            Arc::new(ProcessRunner),
            config.print.timeout,
        );

        let processor = Arc::new(JobProcessor::new(
            settings.clone(),
            fetcher,
            invoker,
            retention,
            journal.clone(),
            notifier,
            config.download.timeout,
        ));

        Ok(Self {
            config,
            settings,
            journal,
            processor,
        })
    }

    pub fn journal(&self) -> &Arc<LogJournal> {
        &self.journal
    }

    pub fn processor(&self) -> &Arc<JobProcessor> {
        &self.processor
    }

    /// Bind the listener, announce the service, and serve until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> ServiceResult<()> {
        let server = JobServer::bind(&self.config.server.bind_addr(), self.processor.clone()).await?;
        let addr = server.local_addr()?;
        info!("Job server listening on {}", addr);

        self.announce_startup(&format!("ws://{addr}")).await;
        server.serve(shutdown).await;
        Ok(())
    }

    async fn announce_startup(&self, listen_url: &str) {
        let journal = &self.journal;
        let executable = self.processor.invoker().executable();

        journal.system("🖨️ Silent print service starting...").await;
        journal.system(format!("📡 Listening on: {listen_url}")).await;
        journal
            .info(format!("🗃️ Print executable: {}", executable.display()))
            .await;

        let settings = self.settings.current().await;
        journal
            .info(format!(
                "📄 Paper size: width {}mm x height {}mm",
                settings.paper_width_mm, settings.paper_height_mm
            ))
            .await;

        if !self.processor.invoker().executable_exists().await {
            journal
                .error(format!(
                    "❗ Print executable not found: {}. Jobs will fail until it is installed.",
                    executable.display()
                ))
                .await;
            journal
                .info("   Download SumatraPDF (portable recommended): https://www.sumatrapdfreader.org/download-free-pdf-viewer")
                .await;
        }
    }
}
