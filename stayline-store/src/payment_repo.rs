use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stayline_core::payment::{Payment, PaymentStatus};
use stayline_core::repository::PaymentRepository;
use stayline_core::BoxError;

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    booking_id: Uuid,
    transaction_id: String,
    amount_minor: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, BoxError> {
        let status = PaymentStatus::parse(&self.status)
            .ok_or_else(|| format!("unrecognized payment status: {}", self.status))?;
        Ok(Payment {
            booking_id: self.booking_id,
            transaction_id: self.transaction_id,
            amount_minor: self.amount_minor,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>, BoxError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT booking_id, transaction_id, amount_minor, status, created_at, updated_at
            FROM payments
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn upsert(&self, payment: &Payment) -> Result<(), BoxError> {
        // Single statement so concurrent initiations for the same booking
        // race on the conflict target instead of inserting twice.
        sqlx::query(
            r#"
            INSERT INTO payments (booking_id, transaction_id, amount_minor, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (booking_id) DO UPDATE
            SET transaction_id = EXCLUDED.transaction_id,
                amount_minor = EXCLUDED.amount_minor,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(payment.booking_id)
        .bind(&payment.transaction_id)
        .bind(payment.amount_minor)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
