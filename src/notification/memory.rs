//! In-memory notification sink

use super::{Notification, NotificationService};
use crate::domain::{CustodianError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Collects notifications; can be told to fail every delivery
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of delivered notifications, oldest first
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationService for MemoryNotifier {
    async fn send_notification(&self, notification: Notification) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CustodianError::Notification(
                "Notification delivery disabled".to_string(),
            ));
        }
        self.sent
            .lock()
            .map_err(|_| CustodianError::Other("Notification sink poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRef;

    fn notification() -> Notification {
        Notification {
            recipient: UserRef::new("admin"),
            title: "t".into(),
            body: "b".into(),
            related: None,
        }
    }

    #[tokio::test]
    async fn test_collects_notifications() {
        let notifier = MemoryNotifier::new();
        notifier.send_notification(notification()).await.unwrap();
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_notifier() {
        let notifier = MemoryNotifier::new();
        notifier.set_failing(true);
        let err = notifier.send_notification(notification()).await.unwrap_err();
        assert!(matches!(err, CustodianError::Notification(_)));
        assert!(notifier.sent().is_empty());
    }
}
