//! Notifier trait and the in-process implementations.

use crate::error::{NotifyError, NotifyResult};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Delivers a rendered alert message somewhere a human will see it.
pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, NotifyResult<()>>;

    /// Short name for logs and metric labels.
    fn name(&self) -> &'static str;
}

/// Arc wrapper for Notifier trait objects.
pub type DynNotifier = Arc<dyn Notifier>;

/// Writes the message to the log instead of sending it. Used for dry runs
/// and when provider credentials are not configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, NotifyResult<()>> {
        Box::pin(async move {
            info!(notifier = "log", %message, "Notification");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Mock notifier for testing.
#[derive(Debug, Default)]
pub struct MockNotifier {
    /// Recorded messages, including ones that were made to fail.
    messages: parking_lot::Mutex<Vec<String>>,
    failing: AtomicBool,
    delay: parking_lot::Mutex<Option<Duration>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sleep this long inside every call.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Notifier for MockNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, NotifyResult<()>> {
        Box::pin(async move {
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.messages.lock().push(message.to_string());
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifyError::Failed("mock failure".to_string()));
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_messages() {
        let mock = MockNotifier::new();
        mock.notify("one").await.unwrap();
        mock.notify("two").await.unwrap();
        assert_eq!(mock.messages(), vec!["one", "two"]);

        mock.clear();
        assert!(mock.messages().is_empty());
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockNotifier::new();
        mock.set_failing(true);
        assert!(matches!(
            mock.notify("boom").await,
            Err(NotifyError::Failed(_))
        ));
        assert_eq!(mock.messages().len(), 1);
    }

    #[test]
    fn test_log_notifier_always_succeeds() {
        let notifier: DynNotifier = Arc::new(LogNotifier::new());
        assert_eq!(notifier.name(), "log");
        assert!(tokio_test::block_on(notifier.notify("hello")).is_ok());
    }
}
