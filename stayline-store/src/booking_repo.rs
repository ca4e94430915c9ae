use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stayline_core::booking::{Booking, BookingStatus};
use stayline_core::pii::Masked;
use stayline_core::repository::BookingRepository;
use stayline_core::BoxError;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_id: Uuid,
    guest_email: String,
    amount_minor: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, BoxError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("unrecognized booking status: {}", self.status))?;
        Ok(Booking {
            booking_id: self.booking_id,
            guest_email: Masked(self.guest_email),
            amount_minor: self.amount_minor,
            currency: self.currency,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BoxError> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT booking_id, guest_email, amount_minor, currency, status, created_at, updated_at
            FROM bookings
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn set_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<(), BoxError> {
        sqlx::query("UPDATE bookings SET status = $1, updated_at = NOW() WHERE booking_id = $2")
            .bind(status.as_str())
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
