use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use stayline_core::payment::{GatewayCheckout, GatewayError, PaymentGateway};

/// Connection settings for the Chapa transaction API.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GatewayConfig {
    /// e.g. https://api.chapa.co/v1/transaction/initialize
    pub init_url: String,
    /// e.g. https://api.chapa.co/v1/transaction/verify
    pub verify_url: String,
    pub secret_key: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct InitiateRequest<'a> {
    amount: String,
    currency: &'a str,
    email: &'a str,
    tx_ref: &'a str,
    callback_url: &'a str,
}

/// HTTP client for the gateway. One request per call, no internal retries:
/// the reconciler (or an external scheduler) owns retry policy. Every
/// ambiguous outcome is an error, never a fabricated success.
pub struct ChapaGateway {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl ChapaGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Transport(Box::new(e)))?;
        Ok(Self { http, config })
    }

    async fn read_envelope(&self, response: reqwest::Response) -> Result<Value, GatewayError> {
        let code = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(Box::new(e)))?;
        classify_envelope(code, &bytes)
    }
}

/// Sort a raw gateway response into the error taxonomy: non-2xx, body that
/// does not parse, and a parsed envelope whose outer status is not
/// "success" are all distinct failures.
fn classify_envelope(code: u16, bytes: &[u8]) -> Result<Value, GatewayError> {
    if !(200..300).contains(&code) {
        let body = serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()));
        return Err(GatewayError::Status { code, body });
    }
    let body: Value =
        serde_json::from_slice(bytes).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    if body.get("status").and_then(Value::as_str) != Some("success") {
        return Err(GatewayError::Rejected { details: body });
    }
    Ok(body)
}

/// Gateway amounts are decimal strings in major units.
fn format_amount(amount_minor: i64) -> String {
    format!("{}.{:02}", amount_minor / 100, amount_minor % 100)
}

fn string_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    async fn initiate(
        &self,
        tx_ref: &str,
        amount_minor: i64,
        currency: &str,
        email: &str,
        callback_url: &str,
    ) -> Result<GatewayCheckout, GatewayError> {
        let payload = InitiateRequest {
            amount: format_amount(amount_minor),
            currency,
            email,
            tx_ref,
            callback_url,
        };

        let response = self
            .http
            .post(&self.config.init_url)
            .bearer_auth(&self.config.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(Box::new(e)))?;

        let body = self.read_envelope(response).await?;
        let data = body
            .get("data")
            .ok_or_else(|| GatewayError::Malformed("data object missing".into()))?;
        let transaction_id = data
            .get("id")
            .and_then(string_field)
            .ok_or_else(|| GatewayError::Malformed("data.id missing".into()))?;
        let checkout_url = data
            .get("checkout_url")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::Malformed("data.checkout_url missing".into()))?;

        debug!(tx_ref, transaction_id = %transaction_id, "checkout created");
        Ok(GatewayCheckout {
            transaction_id,
            checkout_url,
        })
    }

    async fn verify(&self, tx_ref: &str) -> Result<String, GatewayError> {
        let url = format!("{}/{}", self.config.verify_url.trim_end_matches('/'), tx_ref);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(Box::new(e)))?;

        let body = self.read_envelope(response).await?;
        body.get("data")
            .and_then(|data| data.get("status"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::Malformed("data.status missing".into()))
    }
}
