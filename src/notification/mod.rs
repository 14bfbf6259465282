//! User-facing notifications
//!
//! The runner addresses one notification to the acting user when a batch
//! finishes and one when it fails. Titles and bodies are localized through
//! [`messages`].

pub mod log;
pub mod memory;
pub mod messages;

use crate::domain::{Result, UserRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use log::LogNotifier;
pub use memory::MemoryNotifier;

/// Entity a notification links to, e.g. `(3, "ProcessingRegister")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub id: i64,
    pub entity_type: String,
}

impl RelatedEntity {
    pub fn new(id: i64, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserRef,
    pub title: String,
    pub body: String,
    pub related: Option<RelatedEntity>,
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Delivers one notification
    ///
    /// # Errors
    ///
    /// Returns [`CustodianError::Notification`](crate::domain::CustodianError::Notification)
    /// or a backend error when delivery fails.
    async fn send_notification(&self, notification: Notification) -> Result<()>;
}
