use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payment record, one-to-one with a booking. Created in `Pending` at
/// initiation, finalized to `Completed` or `Failed` at verification, never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub booking_id: Uuid,
    /// Transaction identifier assigned by the gateway.
    pub transaction_id: String,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(PaymentStatus::Pending),
            "Completed" => Some(PaymentStatus::Completed),
            "Failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the gateway hands back when a checkout is created.
#[derive(Debug, Clone)]
pub struct GatewayCheckout {
    pub transaction_id: String,
    pub checkout_url: String,
}

/// Failures from the remote payment gateway. Transport, bad HTTP status and
/// unparseable bodies are distinct so callers can decide what is retryable;
/// `Rejected` is the gateway processing the request and refusing it.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("gateway returned HTTP {code}")]
    Status { code: u16, body: serde_json::Value },

    #[error("gateway response did not parse: {0}")]
    Malformed(String),

    #[error("gateway rejected the request")]
    Rejected { details: serde_json::Value },
}

impl GatewayError {
    /// Transport-level trouble is worth retrying; a refusal is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::Malformed(_) => true,
            GatewayError::Status { code, .. } => *code >= 500,
            GatewayError::Rejected { .. } => false,
        }
    }
}

/// Boundary to the remote payment service. Implementations must not retry
/// internally; retry policy belongs to the caller.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout for `tx_ref` and return the gateway's transaction id
    /// plus the URL the guest completes payment at.
    async fn initiate(
        &self,
        tx_ref: &str,
        amount_minor: i64,
        currency: &str,
        email: &str,
        callback_url: &str,
    ) -> Result<GatewayCheckout, GatewayError>;

    /// Fetch the remote status string for a previously initiated transaction.
    async fn verify(&self, tx_ref: &str) -> Result<String, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_the_failure_class() {
        assert!(GatewayError::Transport("timeout".into()).is_retryable());
        assert!(GatewayError::Malformed("not json".into()).is_retryable());
        assert!(GatewayError::Status { code: 503, body: serde_json::Value::Null }.is_retryable());
        assert!(!GatewayError::Status { code: 402, body: serde_json::Value::Null }.is_retryable());
        assert!(!GatewayError::Rejected { details: serde_json::Value::Null }.is_retryable());
    }
}
