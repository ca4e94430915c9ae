use async_trait::async_trait;
use std::time::Duration;

use crate::BoxError;

/// Contract over the shared expiring-counter service the governor runs on.
///
/// The store is external and shared across instances, so every mutation must
/// go through its native atomic primitives; read-modify-write sequences from
/// the process side are not acceptable.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key` and return the post-increment count.
    /// When the increment creates the key its TTL is set to `window`; an
    /// existing key keeps its original expiry so the window boundary is
    /// fixed by the first request, not refreshed by later ones.
    async fn incr_with_window(&self, key: &str, window: Duration) -> Result<u64, BoxError>;

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BoxError>;

    /// Remaining time before `key` expires; `None` when the key is absent.
    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>, BoxError>;
}
