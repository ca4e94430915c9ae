use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::counter::CounterStore;
use crate::identity::ClientIdentity;

/// Fixed-window rate policy for one scope of endpoints.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RatePolicy {
    pub scope: String,
    pub window_seconds: u64,
    pub max_requests: u64,
    pub block_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Rejected; the caller may retry after this many seconds.
    Blocked { retry_after: u64 },
}

/// Per-identity fixed-window request counter with a temporary block once the
/// window limit is breached.
///
/// Counts reset at window expiry rather than sliding, so a burst spanning a
/// window boundary can transiently exceed the limit. A block is released only
/// by its TTL expiring; there is no unblock path.
pub struct RateGovernor {
    store: Arc<dyn CounterStore>,
    policy: RatePolicy,
}

impl RateGovernor {
    pub fn new(store: Arc<dyn CounterStore>, policy: RatePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    /// Decide whether a request from `identity` may proceed.
    ///
    /// Every request is logged before the decision is evaluated, admitted or
    /// not. When the counter store is unreachable the governor admits the
    /// request and logs a warning; the gateway boundary stays strict, this
    /// one does not.
    pub async fn admit(
        &self,
        identity: &ClientIdentity,
        path: &str,
        now: DateTime<Utc>,
    ) -> Admission {
        info!(identity = %identity, path, timestamp = %now, scope = %self.policy.scope, "request received");

        let block_key = block_key(identity);
        // The block check comes before any counter mutation and never
        // refreshes the block TTL: the duration is fixed from first trigger.
        match self.store.get(&block_key).await {
            Ok(Some(_)) => {
                let retry_after = match self.store.remaining_ttl(&block_key).await {
                    Ok(Some(ttl)) => ttl.as_secs().max(1),
                    _ => self.policy.block_seconds,
                };
                return Admission::Blocked { retry_after };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(identity = %identity, error = %e, "counter store unavailable, admitting request");
                return Admission::Allowed;
            }
        }

        let counter_key = format!("rate:{}:{}", self.policy.scope, identity);
        let window = Duration::from_secs(self.policy.window_seconds);
        let count = match self.store.incr_with_window(&counter_key, window).await {
            Ok(count) => count,
            Err(e) => {
                warn!(identity = %identity, error = %e, "counter store unavailable, admitting request");
                return Admission::Allowed;
            }
        };

        if count > self.policy.max_requests {
            warn!(
                identity = %identity,
                path,
                count,
                scope = %self.policy.scope,
                "request limit exceeded, blocking for {}s",
                self.policy.block_seconds
            );
            let block_ttl = Duration::from_secs(self.policy.block_seconds);
            if let Err(e) = self.store.set_with_ttl(&block_key, "1", block_ttl).await {
                warn!(identity = %identity, error = %e, "failed to persist block entry");
            }
            return Admission::Blocked {
                retry_after: self.policy.block_seconds,
            };
        }

        Admission::Allowed
    }
}

fn block_key(identity: &ClientIdentity) -> String {
    format!("blocked:{}", identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::BoxError;

    /// In-memory stand-in for the expiring counter service, with a manually
    /// advanced clock so window and block expiry can be exercised.
    struct MemoryStore {
        now_secs: Mutex<u64>,
        entries: Mutex<HashMap<String, (String, u64)>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                now_secs: Mutex::new(0),
                entries: Mutex::new(HashMap::new()),
            }
        }

        fn advance(&self, secs: u64) {
            *self.now_secs.lock().unwrap() += secs;
        }

        fn now(&self) -> u64 {
            *self.now_secs.lock().unwrap()
        }

        fn live_entry(&self, key: &str) -> Option<(String, u64)> {
            let now = self.now();
            let mut entries = self.entries.lock().unwrap();
            match entries.get(key) {
                Some((_, expires_at)) if *expires_at <= now => {
                    entries.remove(key);
                    None
                }
                Some(entry) => Some(entry.clone()),
                None => None,
            }
        }
    }

    #[async_trait]
    impl CounterStore for MemoryStore {
        async fn incr_with_window(&self, key: &str, window: Duration) -> Result<u64, BoxError> {
            let current = self.live_entry(key);
            let now = self.now();
            let mut entries = self.entries.lock().unwrap();
            let (count, expires_at) = match current {
                Some((value, expires_at)) => (value.parse::<u64>().unwrap() + 1, expires_at),
                None => (1, now + window.as_secs()),
            };
            entries.insert(key.to_string(), (count.to_string(), expires_at));
            Ok(count)
        }

        async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
            Ok(self.live_entry(key).map(|(value, _)| value))
        }

        async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BoxError> {
            let expires_at = self.now() + ttl.as_secs();
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), expires_at));
            Ok(())
        }

        async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>, BoxError> {
            let now = self.now();
            Ok(self
                .live_entry(key)
                .map(|(_, expires_at)| Duration::from_secs(expires_at - now)))
        }
    }

    /// Store that is down. The governor must admit rather than reject.
    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn incr_with_window(&self, _: &str, _: Duration) -> Result<u64, BoxError> {
            Err("connection refused".into())
        }

        async fn get(&self, _: &str) -> Result<Option<String>, BoxError> {
            Err("connection refused".into())
        }

        async fn set_with_ttl(&self, _: &str, _: &str, _: Duration) -> Result<(), BoxError> {
            Err("connection refused".into())
        }

        async fn remaining_ttl(&self, _: &str) -> Result<Option<Duration>, BoxError> {
            Err("connection refused".into())
        }
    }

    fn policy(scope: &str, window: u64, max: u64, block: u64) -> RatePolicy {
        RatePolicy {
            scope: scope.to_string(),
            window_seconds: window,
            max_requests: max,
            block_seconds: block,
        }
    }

    #[tokio::test]
    async fn burst_over_limit_is_blocked_then_released_by_expiry() {
        let store = Arc::new(MemoryStore::new());
        let governor = RateGovernor::new(store.clone(), policy("default", 60, 20, 300));
        let identity = ClientIdentity::new("10.0.0.1");

        // 21 requests inside ten seconds: the first twenty pass.
        for i in 0..20 {
            if i > 0 && i % 2 == 0 {
                store.advance(1);
            }
            let admission = governor.admit(&identity, "/api/listings", Utc::now()).await;
            assert_eq!(admission, Admission::Allowed, "request {} should pass", i + 1);
        }
        let admission = governor.admit(&identity, "/api/listings", Utc::now()).await;
        assert_eq!(admission, Admission::Blocked { retry_after: 300 });

        // One second later the block is still standing, with the remaining
        // TTL reported instead of the full duration.
        store.advance(1);
        let admission = governor.admit(&identity, "/api/listings", Utc::now()).await;
        assert_eq!(admission, Admission::Blocked { retry_after: 299 });

        // Past the block TTL the same request goes through again; the stale
        // window counter expired long before and does not resurrect a block.
        store.advance(300);
        let admission = governor.admit(&identity, "/api/listings", Utc::now()).await;
        assert_eq!(admission, Admission::Allowed);
    }

    #[tokio::test]
    async fn blocked_requests_do_not_touch_the_counter() {
        let store = Arc::new(MemoryStore::new());
        let governor = RateGovernor::new(store.clone(), policy("default", 60, 2, 300));
        let identity = ClientIdentity::new("10.0.0.2");

        for _ in 0..3 {
            governor.admit(&identity, "/api/listings", Utc::now()).await;
        }
        let counted = store.live_entry("rate:default:10.0.0.2").unwrap().0;
        assert_eq!(counted, "3");

        // Rejections while blocked must not increment the window counter.
        for _ in 0..5 {
            let admission = governor.admit(&identity, "/api/listings", Utc::now()).await;
            assert!(matches!(admission, Admission::Blocked { .. }));
        }
        let counted = store.live_entry("rate:default:10.0.0.2").unwrap().0;
        assert_eq!(counted, "3");
    }

    #[tokio::test]
    async fn block_ttl_is_not_refreshed_by_further_requests() {
        let store = Arc::new(MemoryStore::new());
        let governor = RateGovernor::new(store.clone(), policy("default", 60, 1, 100));
        let identity = ClientIdentity::new("10.0.0.3");

        governor.admit(&identity, "/", Utc::now()).await;
        governor.admit(&identity, "/", Utc::now()).await; // triggers the block

        store.advance(40);
        governor.admit(&identity, "/", Utc::now()).await; // rejected, no refresh
        let remaining = store
            .remaining_ttl("blocked:10.0.0.3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remaining, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn window_expiry_resets_the_count() {
        let store = Arc::new(MemoryStore::new());
        let governor = RateGovernor::new(store.clone(), policy("default", 10, 3, 300));
        let identity = ClientIdentity::new("192.168.1.9");

        for _ in 0..3 {
            assert_eq!(
                governor.admit(&identity, "/", Utc::now()).await,
                Admission::Allowed
            );
        }
        store.advance(11);
        for _ in 0..3 {
            assert_eq!(
                governor.admit(&identity, "/", Utc::now()).await,
                Admission::Allowed
            );
        }
    }

    #[tokio::test]
    async fn scopes_count_independently_but_share_the_block() {
        let store = Arc::new(MemoryStore::new());
        let init = RateGovernor::new(store.clone(), policy("payments-init", 60, 2, 300));
        let verify = RateGovernor::new(store.clone(), policy("payments-verify", 60, 5, 300));
        let identity = ClientIdentity::new("10.1.1.1");

        for _ in 0..2 {
            assert_eq!(
                init.admit(&identity, "/api/payments/x", Utc::now()).await,
                Admission::Allowed
            );
        }
        // Third initiation trips its scope and blocks the identity globally.
        assert!(matches!(
            init.admit(&identity, "/api/payments/x", Utc::now()).await,
            Admission::Blocked { .. }
        ));
        assert!(matches!(
            verify
                .admit(&identity, "/api/payments/verify/x", Utc::now())
                .await,
            Admission::Blocked { .. }
        ));
    }

    #[tokio::test]
    async fn store_outage_fails_open() {
        let governor = RateGovernor::new(Arc::new(BrokenStore), policy("default", 60, 1, 300));
        let identity = ClientIdentity::new("10.0.0.4");

        for _ in 0..10 {
            assert_eq!(
                governor.admit(&identity, "/", Utc::now()).await,
                Admission::Allowed
            );
        }
    }
}
