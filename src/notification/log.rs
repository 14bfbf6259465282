//! Notifications emitted as structured log events

use super::{Notification, NotificationService};
use crate::domain::Result;
use async_trait::async_trait;

/// Writes each notification as an `info` event on the `custodian::notification` target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationService for LogNotifier {
    async fn send_notification(&self, notification: Notification) -> Result<()> {
        let (related_id, related_type) = notification
            .related
            .as_ref()
            .map(|r| (Some(r.id), Some(r.entity_type.as_str())))
            .unwrap_or((None, None));

        tracing::info!(
            target: "custodian::notification",
            recipient = %notification.recipient,
            title = %notification.title,
            body = %notification.body,
            related_id = ?related_id,
            related_type = ?related_type,
            "Notification"
        );
        Ok(())
    }
}
