use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

use stayline_core::counter::CounterStore;
use stayline_core::BoxError;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CounterStore for RedisClient {
    async fn incr_with_window(&self, key: &str, window: Duration) -> Result<u64, BoxError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // INCR and the conditional EXPIRE must land as one atomic unit so
        // concurrent requests neither double-count nor extend an in-flight
        // window. EXPIRE fires only when INCR created the key.
        let script = redis::Script::new(
            r#"
            local count = redis.call("INCR", KEYS[1])
            if count == 1 then
                redis.call("EXPIRE", KEYS[1], ARGV[1])
            end
            return count
        "#,
        );

        let count: u64 = script
            .key(key)
            .arg(window.as_secs())
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BoxError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>, BoxError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // TTL returns -2 for a missing key and -1 for a key with no expiry;
        // neither is a live countdown.
        let ttl: i64 = conn.ttl(key).await?;
        if ttl > 0 {
            Ok(Some(Duration::from_secs(ttl as u64)))
        } else {
            Ok(None)
        }
    }
}
