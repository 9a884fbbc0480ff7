//! PayMongo REST client and webhook envelope parsing.
//!
//! Requests and responses use the JSON:API style envelope
//! `{"data": {"id": ..., "attributes": {...}}}`; errors come back as
//! `{"errors": [{"code": ..., "detail": ...}]}`.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::errors::GatewayError;
use crate::domain::payment::{
    BillingDetails, GatewayEvent, GatewayEventKind, IntentSnapshot, QRPH,
};
use crate::domain::ports::PaymentGateway;

pub const DEFAULT_BASE_URL: &str = "https://api.paymongo.com/v1";

#[derive(Debug, Clone)]
pub struct PaymongoClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl PaymongoClient {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> Result<Value, GatewayError> {
        let response = request
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&text)
                .map_err(|e| GatewayError::Decode(format!("invalid JSON body: {}", e)))
        } else {
            Err(api_error(status.as_u16(), error_body(text)))
        }
    }

    fn post(&self, path: &str, attributes: Value) -> Result<Value, GatewayError> {
        self.send(
            self.http
                .post(self.url(path))
                .json(&json!({ "data": { "attributes": attributes } })),
        )
    }
}

/// Error replies from proxies in front of the gateway are often HTML; keep
/// them as raw text.
fn error_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn api_error(status: u16, body: Value) -> GatewayError {
    let first = body.get("errors").and_then(|e| e.get(0));
    let code = first
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let detail = first
        .and_then(|e| e.get("detail"))
        .and_then(Value::as_str)
        .unwrap_or("no detail provided")
        .to_string();
    GatewayError::Api {
        status,
        code,
        detail,
        body,
    }
}

fn resource_id(body: &Value) -> Result<String, GatewayError> {
    body.pointer("/data/id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Decode("response is missing data.id".to_string()))
}

fn intent_snapshot(body: &Value) -> Result<IntentSnapshot, GatewayError> {
    let attributes = body.pointer("/data/attributes");
    Ok(IntentSnapshot {
        id: resource_id(body)?,
        status: attributes
            .and_then(|a| a.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string),
        next_action: attributes
            .and_then(|a| a.get("next_action"))
            .filter(|v| !v.is_null())
            .cloned(),
    })
}

impl PaymentGateway for PaymongoClient {
    fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        description: &str,
    ) -> Result<String, GatewayError> {
        let body = self.post(
            "/payment_intents",
            json!({
                "amount": amount_minor,
                "currency": currency,
                "description": description,
                "payment_method_allowed": [QRPH],
                "capture_type": "automatic",
            }),
        )?;
        resource_id(&body)
    }

    fn create_method(&self, billing: &BillingDetails) -> Result<String, GatewayError> {
        let mut details = json!({
            "name": billing.name,
            "email": billing.email,
        });
        if let Some(phone) = billing.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            details["phone"] = json!(phone);
        }
        let body = self.post(
            "/payment_methods",
            json!({ "type": QRPH, "billing": details }),
        )?;
        resource_id(&body)
    }

    fn attach(&self, intent_id: &str, method_id: &str) -> Result<IntentSnapshot, GatewayError> {
        let body = self.post(
            &format!("/payment_intents/{}/attach", intent_id),
            json!({ "payment_method": method_id }),
        )?;
        intent_snapshot(&body)
    }

    fn get_intent(&self, intent_id: &str) -> Result<IntentSnapshot, GatewayError> {
        let body = self.send(
            self.http
                .get(self.url(&format!("/payment_intents/{}", intent_id))),
        )?;
        intent_snapshot(&body)
    }
}

// ── Webhook envelope ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    id: Option<String>,
    attributes: EventAttributes,
}

#[derive(Debug, Deserialize)]
struct EventAttributes {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

/// Parse a webhook body into a [`GatewayEvent`]. Only a malformed envelope is
/// an error; missing resource fields come back as `None`.
pub fn parse_webhook(body: &[u8]) -> Result<GatewayEvent, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    let resource = envelope.data.attributes.data;
    let resource_id = resource.get("id").and_then(Value::as_str);
    let attr = |name: &str| {
        resource
            .pointer(&format!("/attributes/{}", name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    // Payment resources reference their intent; intent resources are the intent.
    let payment_intent_id = attr("payment_intent_id").or_else(|| {
        resource_id
            .filter(|id| id.starts_with("pi_"))
            .map(str::to_string)
    });
    let payment_id = resource_id
        .filter(|id| id.starts_with("pay_"))
        .map(str::to_string);

    Ok(GatewayEvent {
        id: envelope.data.id,
        kind: GatewayEventKind::from_type(&envelope.data.attributes.event_type),
        payment_intent_id,
        payment_id,
        failed_code: attr("failed_code"),
        failed_message: attr("failed_message"),
        payload: resource,
    })
}
