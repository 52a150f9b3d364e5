//! Print executable invocation
//!
//! Builds the SumatraPDF-style command line for a document and runs it as a
//! child process with captured output. Process execution goes through the
//! [`CommandRunner`] seam so the pipeline can be exercised without a printer.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{JobError, JobResult};
use crate::models::PaperSize;

/// Exit status and merged stdout/stderr of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `-1` when the process was terminated without an exit code
    pub exit_code: i32,
    pub combined_output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv[0]` with the remaining arguments and wait for it to exit.
    async fn run(&self, argv: &[String]) -> io::Result<CommandOutput>;
}

/// Runs commands as real child processes, without a console window on Windows
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String]) -> io::Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // A timed-out invocation drops this future; the child must not outlive it
        cmd.kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let output = cmd.output().await?;
        let mut combined_output = String::from_utf8_lossy(&output.stdout).into_owned();
        combined_output.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            combined_output,
        })
    }
}

/// Builds print command lines for a fixed executable
#[derive(Debug, Clone)]
pub struct PrintCommandBuilder {
    executable: PathBuf,
}

impl PrintCommandBuilder {
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// `<exe> -print-to <printer> -print-settings paperSize=WxHmm -silent <file>`
    ///
    /// An empty printer name targets the system default printer.
    pub fn build_args(&self, file: &Path, printer_name: &str, paper: &PaperSize) -> Vec<String> {
        let mut args = vec![self.executable.to_string_lossy().into_owned()];

        if printer_name.trim().is_empty() {
            args.push("-print-to-default".to_string());
        } else {
            args.extend(["-print-to".to_string(), printer_name.to_string()]);
        }

        args.extend([
            "-print-settings".to_string(),
            paper.print_setting(),
            "-silent".to_string(),
            file.to_string_lossy().into_owned(),
        ]);

        debug!("Built print command with {} arguments", args.len());
        args
    }
}

pub struct PrintInvoker {
    executable: PathBuf,
    builder: PrintCommandBuilder,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl PrintInvoker {
    /// Relative executable paths resolve against the current working directory.
    pub fn new<P: AsRef<Path>>(
        executable: P,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
    ) -> Self {
        let executable = resolve_executable(executable.as_ref());
        Self {
            builder: PrintCommandBuilder::new(&executable),
            executable,
            runner,
            timeout,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub async fn executable_exists(&self) -> bool {
        matches!(tokio::fs::metadata(&self.executable).await, Ok(meta) if meta.is_file())
    }

    pub fn command_line(&self, file: &Path, printer_name: &str, paper: &PaperSize) -> Vec<String> {
        self.builder.build_args(file, printer_name, paper)
    }

    /// Run the print command and wait for it, bounded by the configured timeout.
    ///
    /// A non-zero exit is returned as `Ok`; callers decide how to classify it.
    pub async fn invoke(
        &self,
        file: &Path,
        printer_name: &str,
        paper: &PaperSize,
    ) -> JobResult<CommandOutput> {
        let argv = self.command_line(file, printer_name, paper);

        match tokio::time::timeout(self.timeout, self.runner.run(&argv)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(JobError::PrintLaunch { source }),
            Err(_) => Err(JobError::Timeout {
                operation: "print",
                after: self.timeout,
            }),
        }
    }
}

fn resolve_executable(executable: &Path) -> PathBuf {
    if executable.is_absolute() {
        return executable.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(executable))
        .unwrap_or_else(|_| executable.to_path_buf())
}
