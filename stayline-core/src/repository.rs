use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::payment::Payment;
use crate::BoxError;

/// Read/update access to bookings. Creation and the rest of the booking
/// lifecycle belong to the business layer.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BoxError>;

    async fn set_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<(), BoxError>;
}

/// Payment rows, at most one per booking.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, BoxError>;

    /// Insert-or-update keyed on the booking id. Must be atomic per booking
    /// so concurrent initiations cannot produce a second row.
    async fn upsert(&self, payment: &Payment) -> Result<(), BoxError>;
}
