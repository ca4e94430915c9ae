use std::sync::Arc;

use stayline_core::counter::CounterStore;
use stayline_core::governor::RateGovernor;
use stayline_payments::PaymentReconciler;
use stayline_store::app_config::RateLimits;
use stayline_store::{DbClient, RedisClient};

/// Named governor instances, one per policy scope, all sharing the same
/// counter store.
pub struct Governors {
    pub default: RateGovernor,
    pub payments_init: RateGovernor,
    pub payments_verify: RateGovernor,
}

impl Governors {
    pub fn new(store: Arc<dyn CounterStore>, limits: &RateLimits) -> Self {
        Self {
            default: RateGovernor::new(store.clone(), limits.default.clone()),
            payments_init: RateGovernor::new(store.clone(), limits.payments_init.clone()),
            payments_verify: RateGovernor::new(store, limits.payments_verify.clone()),
        }
    }

    /// Governors consulted for `path`, in order. Every request passes the
    /// default scope; the payment endpoints stack their tighter scope on
    /// top of it.
    pub fn chain_for(&self, path: &str) -> Vec<&RateGovernor> {
        let mut chain = vec![&self.default];
        if path.starts_with("/api/payments/verify/") {
            chain.push(&self.payments_verify);
        } else if path.starts_with("/api/payments/") {
            chain.push(&self.payments_init);
        }
        chain
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub redis: Arc<RedisClient>,
    pub governors: Arc<Governors>,
    pub reconciler: Arc<PaymentReconciler>,
}
