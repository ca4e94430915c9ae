use axum::{
    extract::{ConnectInfo, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod payments;
pub mod state;

pub use state::AppState;

use error::AppError;
use stayline_core::governor::Admission;
use stayline_core::identity::ClientIdentity;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(payments::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            governor_middleware,
        ))
        .with_state(state)
}

/// Outermost layer: every request clears the rate governor before anything
/// else runs. Payment endpoints are additionally held to their own tighter
/// scopes.
async fn governor_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    let identity = ClientIdentity::from(addr);
    let path = req.uri().path().to_string();
    let now = Utc::now();

    for governor in state.governors.chain_for(&path) {
        if let Admission::Blocked { retry_after } = governor.admit(&identity, &path, now).await {
            return AppError::RateLimited { retry_after }.into_response();
        }
    }

    next.run(req).await
}
