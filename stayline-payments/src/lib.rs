pub mod gateway;
pub mod reconciler;

pub use gateway::{ChapaGateway, GatewayConfig};
pub use reconciler::{InitiateOutcome, PaymentReconciler, ReconcileError};
