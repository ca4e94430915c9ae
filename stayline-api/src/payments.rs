use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use stayline_payments::InitiateOutcome;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/{booking_id}", post(initiate_payment))
        .route("/api/payments/verify/{tx_ref}", get(verify_payment))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum InitiateResponse {
    Checkout { payment_url: String },
    AlreadyCompleted { status: &'static str, detail: &'static str },
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    status: &'static str,
}

/// POST /api/payments/{booking_id}
/// Start a checkout for the booking and hand back the payment URL.
async fn initiate_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<InitiateResponse>, AppError> {
    let response = match state.reconciler.initiate_payment(booking_id).await? {
        InitiateOutcome::Initiated { checkout_url } => InitiateResponse::Checkout {
            payment_url: checkout_url,
        },
        InitiateOutcome::AlreadyCompleted => InitiateResponse::AlreadyCompleted {
            status: "Completed",
            detail: "payment already completed",
        },
    };
    Ok(Json(response))
}

/// GET /api/payments/verify/{tx_ref}
/// Reconcile local payment state against the gateway's verdict. Also the
/// callback target the gateway redirects guests to after checkout.
async fn verify_payment(
    State(state): State<AppState>,
    Path(tx_ref): Path<String>,
) -> Result<Json<VerifyResponse>, AppError> {
    let status = state.reconciler.verify_payment(&tx_ref).await?;
    Ok(Json(VerifyResponse {
        status: status.as_str(),
    }))
}
