/// Configuration default values
///
/// All defaults live here so the TOML written on first start and the values
/// used when a key is omitted can never drift apart.
// Server defaults
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 1972;

// Printer defaults
pub const DEFAULT_PRINTER_NAME: &str = "";
pub const DEFAULT_PAPER_WIDTH_MM: &str = "100";
pub const DEFAULT_PAPER_HEIGHT_MM: &str = "150";

// Storage defaults
pub const DEFAULT_CACHE_DIR: &str = "cache_pdfs";
pub const DEFAULT_LOG_FILE: &str = "printer_log.txt";
pub const DEFAULT_MAX_CACHED_FILES: usize = 10;
pub const DEFAULT_MAX_LOG_LINES: usize = 10;
pub const DEFAULT_MANAGED_EXTENSION: &str = "pdf";

// Print executable defaults
pub const DEFAULT_PRINT_EXECUTABLE: &str = "SumatraPDF.exe";
pub const DEFAULT_PRINT_TIMEOUT: &str = "2m";

// Download defaults
pub const DEFAULT_DOWNLOAD_TIMEOUT: &str = "60s";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";

// Environment overrides, e.g. SILENT_PRINT_SERVER__PORT=2000
pub const ENV_PREFIX: &str = "SILENT_PRINT_";
