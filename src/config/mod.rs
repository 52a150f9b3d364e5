use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::PrinterSettings;
use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub print: PrintConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Loopback listener for inbound job frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Operator-selected printer and paper size
///
/// Paper dimensions are kept as entered; they are only validated when a job runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterConfig {
    /// Empty means "system default printer"
    #[serde(default = "default_printer_name")]
    pub printer_name: String,
    #[serde(
        default = "default_paper_width_mm",
        with = "duration_serde::lenient_string"
    )]
    pub paper_width_mm: String,
    #[serde(
        default = "default_paper_height_mm",
        with = "duration_serde::lenient_string"
    )]
    pub paper_height_mm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Documents kept in `cache_dir` after each successful print
    #[serde(default = "default_max_cached_files")]
    pub max_cached_files: usize,
    /// Lines kept in `log_file`
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,
    #[serde(default = "default_managed_extension")]
    pub managed_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintConfig {
    /// Relative paths resolve against the working directory
    #[serde(default = "default_print_executable")]
    pub executable: PathBuf,
    #[serde(default = "default_print_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
}

// Server defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Printer defaults
fn default_printer_name() -> String {
    DEFAULT_PRINTER_NAME.to_string()
}

fn default_paper_width_mm() -> String {
    DEFAULT_PAPER_WIDTH_MM.to_string()
}

fn default_paper_height_mm() -> String {
    DEFAULT_PAPER_HEIGHT_MM.to_string()
}

// Storage defaults
fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_max_cached_files() -> usize {
    DEFAULT_MAX_CACHED_FILES
}

fn default_max_log_lines() -> usize {
    DEFAULT_MAX_LOG_LINES
}

fn default_managed_extension() -> String {
    DEFAULT_MANAGED_EXTENSION.to_string()
}

// Print defaults
fn default_print_executable() -> PathBuf {
    PathBuf::from(DEFAULT_PRINT_EXECUTABLE)
}

fn default_print_timeout() -> Duration {
    humantime::parse_duration(DEFAULT_PRINT_TIMEOUT).unwrap_or(Duration::from_secs(120))
}

// Download defaults
fn default_download_timeout() -> Duration {
    humantime::parse_duration(DEFAULT_DOWNLOAD_TIMEOUT).unwrap_or(Duration::from_secs(60))
}

fn default_connect_timeout() -> Duration {
    humantime::parse_duration(DEFAULT_CONNECT_TIMEOUT).unwrap_or(Duration::from_secs(10))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            printer_name: default_printer_name(),
            paper_width_mm: default_paper_width_mm(),
            paper_height_mm: default_paper_height_mm(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            log_file: default_log_file(),
            max_cached_files: default_max_cached_files(),
            max_log_lines: default_max_log_lines(),
            managed_extension: default_managed_extension(),
        }
    }
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            executable: default_print_executable(),
            timeout: default_print_timeout(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: default_download_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            printer: PrinterConfig::default(),
            storage: StorageConfig::default(),
            print: PrintConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `config_file`, writing the defaults there first if it is missing.
    ///
    /// Layering: built-in defaults, then the TOML file, then `SILENT_PRINT_*` environment
    /// variables (`__` separates section and key).
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> ServiceResult<Self> {
        let config_file = config_file.as_ref();
        if !config_file.exists() {
            let contents = toml::to_string_pretty(&Self::default())
                .map_err(|e| ServiceError::configuration(e.to_string()))?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file.display());
        }

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string on top of the defaults (no environment layer).
    pub fn from_toml_str(contents: &str) -> ServiceResult<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(contents))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as [`Config::load_from_file`], for file contents already in memory.
    pub fn from_toml_str_with_env(contents: &str) -> ServiceResult<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(contents))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        self.server.validate()?;
        if self.storage.max_cached_files == 0 {
            return Err(ServiceError::configuration(
                "storage.max_cached_files must be at least 1",
            ));
        }
        if self.storage.max_log_lines == 0 {
            return Err(ServiceError::configuration(
                "storage.max_log_lines must be at least 1",
            ));
        }
        if self.storage.managed_extension.trim_start_matches('.').is_empty() {
            return Err(ServiceError::configuration(
                "storage.managed_extension must not be empty",
            ));
        }
        Ok(())
    }

    /// Current printer selection as the job pipeline consumes it
    pub fn printer_settings(&self) -> PrinterSettings {
        PrinterSettings {
            printer_name: self.printer.printer_name.clone(),
            paper_width_mm: self.printer.paper_width_mm.clone(),
            paper_height_mm: self.printer.paper_height_mm.clone(),
            cache_dir: self.storage.cache_dir.clone(),
        }
    }
}

impl ServerConfig {
    /// Only loopback listeners are allowed; the protocol has no authentication.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(());
        }
        match self.host.parse::<IpAddr>() {
            Ok(ip) if ip.is_loopback() => Ok(()),
            Ok(ip) => Err(ServiceError::configuration(format!(
                "server.host must be a loopback address, got {ip}"
            ))),
            Err(_) => Err(ServiceError::configuration(format!(
                "server.host is not an IP address: {}",
                self.host
            ))),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
