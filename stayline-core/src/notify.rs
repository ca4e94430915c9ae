use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BoxError;

/// Job handed to the external task runner when a payment is confirmed.
/// Delivery is at-least-once and happens after the fact; this core only
/// guarantees the enqueue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationJob {
    pub recipient_email: String,
    pub booking_id: Uuid,
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn enqueue_confirmation(&self, job: ConfirmationJob) -> Result<(), BoxError>;
}
