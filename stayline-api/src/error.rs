use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use stayline_payments::ReconcileError;

#[derive(Debug)]
pub enum AppError {
    RateLimited { retry_after: u64 },
    NotFound(String),
    /// Transport-level gateway trouble; the client should retry later.
    GatewayUnavailable(String),
    /// The gateway refused the request; remote details are echoed.
    GatewayRefused(serde_json::Value),
    InternalServerError(String),
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::UnknownBooking(id) => {
                AppError::NotFound(format!("booking {} not found", id))
            }
            ReconcileError::UnknownTransaction(tx_ref) => {
                AppError::NotFound(format!("unknown transaction {}", tx_ref))
            }
            ReconcileError::GatewayUnavailable(e) => AppError::GatewayUnavailable(e.to_string()),
            ReconcileError::GatewayRefused { details } => AppError::GatewayRefused(details),
            ReconcileError::Storage(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::RateLimited { retry_after } => {
                let body = Json(json!({
                    "error": "Too many requests. Try again later.",
                    "retry_after": retry_after,
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                response
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            AppError::GatewayUnavailable(msg) => {
                tracing::error!("Gateway unavailable: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Payment gateway unavailable, try again later" })),
                )
                    .into_response()
            }
            AppError::GatewayRefused(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Payment request refused", "details": details })),
            )
                .into_response(),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
