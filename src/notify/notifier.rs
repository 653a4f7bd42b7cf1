//! The `Notifier` seam and a log-only implementation.

use async_trait::async_trait;
use tracing::info;

use crate::error::NotifyError;

/// Delivers a text message to a configured recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message.
    async fn send(&self, text: &str) -> Result<(), NotifyError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Writes alerts to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "alerts", "\n{}", text);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier;
        assert!(notifier.send("hello").await.is_ok());
        assert_eq!(notifier.name(), "log");
    }

    #[test]
    fn notifier_is_object_safe() {
        let notifier: std::sync::Arc<dyn Notifier> = std::sync::Arc::new(LogNotifier);
        assert!(tokio_test::block_on(notifier.send("boxed")).is_ok());
    }
}
