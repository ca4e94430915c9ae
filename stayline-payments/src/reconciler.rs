use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use stayline_core::booking::BookingStatus;
use stayline_core::notify::{ConfirmationJob, NotificationQueue};
use stayline_core::payment::{GatewayError, Payment, PaymentGateway, PaymentStatus};
use stayline_core::repository::{BookingRepository, PaymentRepository};
use stayline_core::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("booking not found: {0}")]
    UnknownBooking(Uuid),

    #[error("unknown transaction: {0}")]
    UnknownTransaction(String),

    /// The gateway could not be reached or answered garbage. Retryable.
    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(#[source] GatewayError),

    /// The gateway processed the request and refused it. Not retryable; the
    /// remote details are echoed to the caller.
    #[error("gateway refused the request: {details}")]
    GatewayRefused { details: serde_json::Value },

    #[error("storage failure: {0}")]
    Storage(#[source] BoxError),
}

impl ReconcileError {
    fn from_gateway(err: GatewayError) -> Self {
        if err.is_retryable() {
            return ReconcileError::GatewayUnavailable(err);
        }
        let details = match err {
            GatewayError::Rejected { details } => details,
            GatewayError::Status { body, .. } => body,
            other => serde_json::json!({ "error": other.to_string() }),
        };
        ReconcileError::GatewayRefused { details }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiateOutcome {
    /// Checkout created; redirect the guest to this URL.
    Initiated { checkout_url: String },
    /// A completed payment already exists for the booking. The gateway was
    /// not called again; reporting success keeps retries harmless.
    AlreadyCompleted,
}

/// Owns the booking/payment state machine. Payment rows move
/// NoPayment -> Pending -> Completed | Failed; a booking is confirmed
/// exactly when its payment completes. All gateway access and payment
/// persistence goes through here.
pub struct PaymentReconciler {
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Arc<dyn NotificationQueue>,
    callback_url: String,
}

impl PaymentReconciler {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<dyn NotificationQueue>,
        callback_url: String,
    ) -> Self {
        Self {
            bookings,
            payments,
            gateway,
            notifications,
            callback_url,
        }
    }

    /// Start a payment for `booking_id` and return the checkout URL.
    ///
    /// Idempotency guard: a booking whose payment already completed is
    /// reported as such without another gateway call, so a duplicate
    /// initiation can never double-charge. Gateway failure leaves local
    /// state untouched.
    pub async fn initiate_payment(
        &self,
        booking_id: Uuid,
    ) -> Result<InitiateOutcome, ReconcileError> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await
            .map_err(ReconcileError::Storage)?
            .ok_or(ReconcileError::UnknownBooking(booking_id))?;

        if let Some(existing) = self
            .payments
            .get_by_booking(booking_id)
            .await
            .map_err(ReconcileError::Storage)?
        {
            if existing.status == PaymentStatus::Completed {
                info!(%booking_id, "payment already completed, skipping gateway call");
                return Ok(InitiateOutcome::AlreadyCompleted);
            }
        }

        let tx_ref = booking_id.to_string();
        let checkout = self
            .gateway
            .initiate(
                &tx_ref,
                booking.amount_minor,
                &booking.currency,
                booking.guest_email.reveal(),
                &self.callback_url,
            )
            .await
            .map_err(ReconcileError::from_gateway)?;

        let now = Utc::now();
        let payment = Payment {
            booking_id,
            transaction_id: checkout.transaction_id.clone(),
            amount_minor: booking.amount_minor,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.payments
            .upsert(&payment)
            .await
            .map_err(ReconcileError::Storage)?;

        info!(%booking_id, transaction_id = %checkout.transaction_id, "payment initiated");
        Ok(InitiateOutcome::Initiated {
            checkout_url: checkout.checkout_url,
        })
    }

    /// Reconcile local state with the gateway's verdict for `tx_ref`.
    ///
    /// Remote status "success" maps to Completed and confirms the booking;
    /// anything else maps to Failed and leaves the booking alone. Repeat
    /// calls for an already-completed payment re-confirm without error and
    /// without enqueueing a second notification.
    pub async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentStatus, ReconcileError> {
        // The transaction reference is the booking id the payment was
        // initiated under.
        let booking_id = Uuid::parse_str(tx_ref)
            .map_err(|_| ReconcileError::UnknownTransaction(tx_ref.to_string()))?;
        let mut payment = self
            .payments
            .get_by_booking(booking_id)
            .await
            .map_err(ReconcileError::Storage)?
            .ok_or_else(|| ReconcileError::UnknownTransaction(tx_ref.to_string()))?;

        let remote_status = self
            .gateway
            .verify(tx_ref)
            .await
            .map_err(ReconcileError::from_gateway)?;

        let mapped = if remote_status == "success" {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        let newly_completed = mapped == PaymentStatus::Completed && payment.status != mapped;
        payment.status = mapped;
        payment.updated_at = Utc::now();

        if mapped == PaymentStatus::Completed {
            let booking = self
                .bookings
                .get_booking(booking_id)
                .await
                .map_err(ReconcileError::Storage)?
                .ok_or(ReconcileError::UnknownBooking(booking_id))?;

            self.bookings
                .set_booking_status(booking_id, BookingStatus::Confirmed)
                .await
                .map_err(ReconcileError::Storage)?;
            self.payments
                .upsert(&payment)
                .await
                .map_err(ReconcileError::Storage)?;

            if newly_completed {
                let job = ConfirmationJob {
                    recipient_email: booking.guest_email.reveal().clone(),
                    booking_id,
                };
                // Fire and forget: the payment is final whether or not the
                // enqueue lands.
                if let Err(e) = self.notifications.enqueue_confirmation(job).await {
                    error!(%booking_id, error = %e, "confirmation enqueue failed");
                }
            }
        } else {
            self.payments
                .upsert(&payment)
                .await
                .map_err(ReconcileError::Storage)?;
        }

        info!(%booking_id, status = %payment.status, remote_status = %remote_status, "payment verified");
        Ok(payment.status)
    }
}
