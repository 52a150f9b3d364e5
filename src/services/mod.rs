pub mod fetcher;
pub mod job_processor;
pub mod notifier;
pub mod print_invoker;
pub mod settings;

pub use fetcher::{DocumentFetcher, HttpFetcher};
pub use job_processor::{JobProcessor, PrintedJob};
pub use notifier::{LogNotifier, OperatorNotifier};
pub use print_invoker::{CommandOutput, CommandRunner, PrintCommandBuilder, PrintInvoker, ProcessRunner};
pub use settings::{ConfigFileSettings, PrinterSettingsProvider, SharedPrinterSettings};
