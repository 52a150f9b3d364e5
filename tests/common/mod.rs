#![allow(dead_code)]

use async_trait::async_trait;
use silent_print::errors::{JobError, JobResult};
use silent_print::journal::LogJournal;
use silent_print::models::PrinterSettings;
use silent_print::retention::{RetentionPolicy, RetentionStore};
use silent_print::services::{
    CommandOutput, CommandRunner, DocumentFetcher, JobProcessor, OperatorNotifier, PrintInvoker,
    SharedPrinterSettings,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const FAKE_PDF: &[u8] = b"%PDF-1.4 fake document";

/// What the fake fetcher does on each call
#[derive(Clone)]
pub enum FetchBehavior {
    Succeed,
    Fail(&'static str),
    Hang(Duration),
    Panic,
}

/// Writes a fixed document and stamps strictly increasing modification times
pub struct FakeFetcher {
    behavior: Mutex<FetchBehavior>,
    calls: Mutex<Vec<(String, PathBuf)>>,
    sequence: AtomicU64,
}

impl FakeFetcher {
    pub fn new(behavior: FetchBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: FetchBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> JobResult<u64> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), dest.to_path_buf()));
        let behavior = self.behavior.lock().unwrap().clone();

        match behavior {
            FetchBehavior::Succeed => {}
            FetchBehavior::Fail(message) => return Err(JobError::retrieval(url, message)),
            FetchBehavior::Hang(delay) => tokio::time::sleep(delay).await,
            FetchBehavior::Panic => panic!("fetcher exploded"),
        }

        std::fs::write(dest, FAKE_PDF).map_err(|e| JobError::retrieval(url, e))?;
        let n = self.sequence.fetch_add(1, Ordering::SeqCst);
        let stamp = SystemTime::now() - Duration::from_secs(86_400) + Duration::from_secs(n);
        std::fs::File::options()
            .write(true)
            .open(dest)
            .and_then(|f| f.set_modified(stamp))
            .map_err(|e| JobError::retrieval(url, e))?;
        Ok(FAKE_PDF.len() as u64)
    }
}

/// Records command lines and tracks how many runs overlap
pub struct FakeRunner {
    exit_code: Mutex<i32>,
    output: &'static str,
    delay: Duration,
    calls: Mutex<Vec<Vec<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRunner {
    pub fn new(exit_code: i32, output: &'static str, delay: Duration) -> Self {
        Self {
            exit_code: Mutex::new(exit_code),
            output,
            delay,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(0, "", Duration::ZERO)
    }

    pub fn set_exit_code(&self, code: i32) {
        *self.exit_code.lock().unwrap() = code;
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, argv: &[String]) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(argv.to_vec());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(CommandOutput {
            exit_code: *self.exit_code.lock().unwrap(),
            combined_output: self.output.to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(String, String)> {
        self.notices.lock().unwrap().clone()
    }
}

impl OperatorNotifier for RecordingNotifier {
    fn notify_error(&self, title: &str, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

pub struct HarnessBuilder {
    max_cached_files: usize,
    max_log_lines: usize,
    install_executable: bool,
    fetcher: FakeFetcher,
    document_fetcher: Option<Arc<dyn DocumentFetcher>>,
    runner: FakeRunner,
    download_timeout: Duration,
}

impl HarnessBuilder {
    pub fn max_cached_files(mut self, n: usize) -> Self {
        self.max_cached_files = n;
        self
    }

    pub fn max_log_lines(mut self, n: usize) -> Self {
        self.max_log_lines = n;
        self
    }

    pub fn without_executable(mut self) -> Self {
        self.install_executable = false;
        self
    }

    pub fn fetcher(mut self, fetcher: FakeFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Use a real fetcher in place of the fake one
    pub fn document_fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.document_fetcher = Some(fetcher);
        self
    }

    pub fn runner(mut self, runner: FakeRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let executable = dir.path().join("SumatraPDF.exe");
        if self.install_executable {
            std::fs::write(&executable, b"stub").unwrap();
        }

        let journal = Arc::new(LogJournal::new(
            dir.path().join("printer_log.txt"),
            self.max_log_lines,
        ));
        let retention = Arc::new(RetentionStore::new(
            RetentionPolicy::new().keep_latest(self.max_cached_files),
            journal.clone(),
        ));
        let settings = SharedPrinterSettings::new(PrinterSettings {
            printer_name: "Label Printer".to_string(),
            paper_width_mm: "100".to_string(),
            paper_height_mm: "150".to_string(),
            cache_dir: cache_dir.clone(),
        });
        let fetcher = Arc::new(self.fetcher);
        let runner = Arc::new(self.runner);
        let notifier = Arc::new(RecordingNotifier::default());

        let invoker = PrintInvoker::new(&executable, runner.clone(), Duration::from_secs(30));
        let document_fetcher: Arc<dyn DocumentFetcher> = match self.document_fetcher {
            Some(document_fetcher) => document_fetcher,
            None => fetcher.clone(),
        };
        let processor = Arc::new(JobProcessor::new(
            Arc::new(settings.clone()),
            document_fetcher,
            invoker,
            retention,
            journal.clone(),
            notifier.clone(),
            self.download_timeout,
        ));

        Harness {
            dir,
            cache_dir,
            journal,
            settings,
            fetcher,
            runner,
            notifier,
            processor,
        }
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub cache_dir: PathBuf,
    pub journal: Arc<LogJournal>,
    pub settings: SharedPrinterSettings,
    pub fetcher: Arc<FakeFetcher>,
    pub runner: Arc<FakeRunner>,
    pub notifier: Arc<RecordingNotifier>,
    pub processor: Arc<JobProcessor>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            max_cached_files: 3,
            max_log_lines: 1000,
            install_executable: true,
            fetcher: FakeFetcher::new(FetchBehavior::Succeed),
            document_fetcher: None,
            runner: FakeRunner::succeeding(),
            download_timeout: Duration::from_secs(30),
        }
    }

    pub async fn log(&self) -> Vec<String> {
        self.journal.persisted_lines().await.unwrap()
    }

    pub async fn log_contains(&self, needle: &str) -> bool {
        self.log().await.iter().any(|line| line.contains(needle))
    }

    pub fn cached_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Poll `condition` until it holds or five seconds pass
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
