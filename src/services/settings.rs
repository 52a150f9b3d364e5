//! Live printer settings
//!
//! The operator may change printer or paper size between jobs, so the job
//! pipeline asks a [`PrinterSettingsProvider`] at the start of every job
//! instead of capturing values once at startup.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::Config;
use crate::models::PrinterSettings;

#[async_trait]
pub trait PrinterSettingsProvider: Send + Sync {
    /// Settings in effect for the job about to run. Providers always have an
    /// answer; a source that cannot be read falls back to its last known values.
    async fn current(&self) -> PrinterSettings;
}

/// In-memory settings an embedding shell updates directly
#[derive(Clone)]
pub struct SharedPrinterSettings {
    inner: Arc<RwLock<PrinterSettings>>,
}

impl SharedPrinterSettings {
    pub fn new(settings: PrinterSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub async fn update(&self, settings: PrinterSettings) {
        *self.inner.write().await = settings;
    }

    pub async fn set_paper_size<W: Into<String>, H: Into<String>>(&self, width: W, height: H) {
        let mut guard = self.inner.write().await;
        guard.paper_width_mm = width.into();
        guard.paper_height_mm = height.into();
    }

    pub async fn set_printer<S: Into<String>>(&self, printer_name: S) {
        self.inner.write().await.printer_name = printer_name.into();
    }
}

#[async_trait]
impl PrinterSettingsProvider for SharedPrinterSettings {
    async fn current(&self) -> PrinterSettings {
        self.inner.read().await.clone()
    }
}

/// Settings re-read from the configuration file on every job
///
/// Edits to `[printer]` or `storage.cache_dir` apply to the next job. If the
/// file becomes unreadable or invalid, the last good values are used.
pub struct ConfigFileSettings {
    path: PathBuf,
    last_good: RwLock<PrinterSettings>,
}

impl ConfigFileSettings {
    pub fn new<P: Into<PathBuf>>(path: P, initial: PrinterSettings) -> Self {
        Self {
            path: path.into(),
            last_good: RwLock::new(initial),
        }
    }
}

#[async_trait]
impl PrinterSettingsProvider for ConfigFileSettings {
    async fn current(&self) -> PrinterSettings {
        let loaded = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Config::from_toml_str_with_env(&contents)
                .map(|config| config.printer_settings())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match loaded {
            Ok(settings) => {
                *self.last_good.write().await = settings.clone();
                settings
            }
            Err(e) => {
                warn!(
                    "Could not reload printer settings from {}, using last known values: {}",
                    self.path.display(),
                    e
                );
                self.last_good.read().await.clone()
            }
        }
    }
}
