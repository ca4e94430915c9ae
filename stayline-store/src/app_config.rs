use serde::Deserialize;
use std::env;

use stayline_core::governor::RatePolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub gateway: GatewaySettings,
    pub rate_limits: RateLimits,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub confirmation_topic: String,
}

/// Payment gateway endpoints and credentials. The secret should come from
/// the environment (STAYLINE__GATEWAY__SECRET_KEY), not a checked-in file.
#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    pub init_url: String,
    pub verify_url: String,
    pub secret_key: String,
    /// Public URL the gateway redirects the guest back to after checkout.
    pub callback_url: String,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_seconds: u64,
}

fn default_gateway_timeout() -> u64 {
    10
}

/// One fixed-window policy per governed scope. The default scope fronts
/// every request; the payment scopes stack on top for their endpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimits {
    pub default: RatePolicy,
    pub payments_init: RatePolicy,
    pub payments_verify: RatePolicy,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("STAYLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
