//! Blocking operator notices
//!
//! Some failures (an unusable paper size) need the operator's attention beyond
//! a journal line. A desktop shell implements [`OperatorNotifier`] with a
//! dialog; headless deployments use [`LogNotifier`].

use tracing::error;

pub trait OperatorNotifier: Send + Sync {
    fn notify_error(&self, title: &str, message: &str);
}

/// Reports notices through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl OperatorNotifier for LogNotifier {
    fn notify_error(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
    }
}
