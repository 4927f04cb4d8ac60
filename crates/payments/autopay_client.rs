use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::domain::value_objects::{
    enums::{
        amount_types::AmountType, autopay_frequencies::AutopayFrequency,
        gateway_environments::GatewayEnvironment,
    },
    payment_modes::PaymentMode,
};

/// Refresh the cached token this long before the gateway says it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct AutopayClientConfig {
    pub environment: GatewayEnvironment,
    pub client_id: String,
    pub client_secret: String,
    pub client_version: String,
    pub base_url: String,
    pub auth_url: String,
    pub timeout: Duration,
}

/// A non-2xx answer from the gateway, carried inside `anyhow::Error`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("autopay gateway {context} failed with status {status}: {message}")]
pub struct GatewayApiError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub body: Value,
    pub context: String,
}

impl GatewayApiError {
    /// The gateway does not know the mandate/order yet.
    pub fn is_not_resolvable(&self) -> bool {
        matches!(self.status, 400 | 404)
    }

    /// The environment lacks the endpoint (pause/resume in sandbox).
    pub fn is_capability_unsupported(&self) -> bool {
        if self.status == 501 {
            return true;
        }
        let mentions_unsupported = |text: &str| {
            let text = text.to_ascii_uppercase();
            text.contains("NOT_SUPPORTED")
                || text.contains("UNSUPPORTED")
                || text.contains("NOT SUPPORTED")
        };
        self.code.as_deref().is_some_and(mentions_unsupported)
            || mentions_unsupported(&self.message)
    }
}

/// Finds a [`GatewayApiError`] anywhere in the error chain.
pub fn gateway_error_of(error: &anyhow::Error) -> Option<&GatewayApiError> {
    error.chain().find_map(|cause| cause.downcast_ref::<GatewayApiError>())
}

pub fn rupees_to_paise(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Debug, Clone)]
pub struct MandateSetupRequest {
    pub merchant_order_id: String,
    pub merchant_subscription_id: String,
    pub amount: f64,
    pub max_amount: f64,
    pub amount_type: AmountType,
    pub frequency: AutopayFrequency,
    pub payment_mode: PaymentMode,
    /// Deadline for the customer to authorise the setup order.
    pub order_expire_at: DateTime<Utc>,
    /// Validity horizon of the mandate itself.
    pub mandate_expire_at: DateTime<Utc>,
}

impl MandateSetupRequest {
    pub fn to_payload(&self) -> Value {
        json!({
            "merchantOrderId": self.merchant_order_id,
            "amount": rupees_to_paise(self.amount),
            "expireAt": self.order_expire_at.timestamp_millis(),
            "paymentFlow": {
                "type": "SUBSCRIPTION_SETUP",
                "merchantSubscriptionId": self.merchant_subscription_id,
                "authWorkflowType": "TRANSACTION",
                "amountType": self.amount_type.as_str(),
                "maxAmount": rupees_to_paise(self.max_amount),
                "frequency": self.frequency.as_str(),
                "expireAt": self.mandate_expire_at.timestamp_millis(),
                "paymentMode": self.payment_mode.to_gateway_payload(),
            },
        })
    }
}

/// Setup answer. `raw` is handed back to the caller untouched (intent URL, redirect info).
#[derive(Debug, Clone)]
pub struct MandateSetupResponse {
    pub order_id: Option<String>,
    pub state: Option<String>,
    pub raw: Value,
}

impl MandateSetupResponse {
    fn from_raw(raw: Value) -> Self {
        let field = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            order_id: field("orderId"),
            state: field("state"),
            raw,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatusResponse {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedemptionNotifyRequest {
    pub merchant_order_id: String,
    pub merchant_subscription_id: String,
    pub amount: f64,
    pub expire_at: DateTime<Utc>,
}

impl RedemptionNotifyRequest {
    pub fn to_payload(&self) -> Value {
        json!({
            "merchantOrderId": self.merchant_order_id,
            "amount": rupees_to_paise(self.amount),
            "expireAt": self.expire_at.timestamp_millis(),
            "paymentFlow": {
                "type": "SUBSCRIPTION_REDEMPTION",
                "merchantSubscriptionId": self.merchant_subscription_id,
            },
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrderResponse {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorEnvelope {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "errorCode")]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    /// Unix seconds.
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TOKEN_REFRESH_MARGIN_SECS > now.timestamp()
    }
}

/// Recurring-payment gateway client built on reqwest.
pub struct AutopayClient {
    http: reqwest::Client,
    config: AutopayClientConfig,
    token: Mutex<Option<CachedToken>>,
}

impl AutopayClient {
    pub fn new(config: AutopayClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    pub fn environment(&self) -> GatewayEnvironment {
        self.config.environment
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(err) => format!("<failed to read response body: {err}>"),
        };
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text.clone()));
        let (code, message) = match serde_json::from_str::<GatewayErrorEnvelope>(&text) {
            Ok(envelope) => (envelope.code.or(envelope.error_code), envelope.message),
            Err(_) => (None, None),
        };

        error!(
            status = %status,
            gateway_error_code = ?code,
            gateway_error_message = ?message,
            response_body = %text,
            context = %context,
            "autopay gateway request failed"
        );

        Err(GatewayApiError {
            status: status.as_u16(),
            code,
            message: message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("gateway request failed")
                    .to_string()
            }),
            body,
            context: context.to_string(),
        }
        .into())
    }

    /// Cached OAuth token, fetched anew when missing or about to expire.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_version", self.config.client_version.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let resp = self
            .http
            .post(&self.config.auth_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&form)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "fetch access token").await?;
        let parsed: TokenResponse = resp.json().await?;

        let expires_at = parsed
            .expires_at
            .or_else(|| parsed.expires_in.map(|secs| now.timestamp() + secs))
            .unwrap_or_else(|| now.timestamp() + TOKEN_REFRESH_MARGIN_SECS * 10);
        debug!(expires_at, "autopay gateway token refreshed");

        *cached = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            expires_at,
        });
        Ok(parsed.access_token)
    }

    async fn post_json(&self, path: &str, body: &Value, context: &str) -> Result<Value> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .post(self.endpoint(path))
            .header(AUTHORIZATION, format!("O-Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, context).await?;
        read_json_or_null(resp).await
    }

    async fn get_json(&self, path: &str, context: &str) -> Result<Value> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(self.endpoint(path))
            .header(AUTHORIZATION, format!("O-Bearer {token}"))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, context).await?;
        read_json_or_null(resp).await
    }

    pub async fn setup_mandate(&self, request: &MandateSetupRequest) -> Result<MandateSetupResponse> {
        let raw = self
            .post_json("subscriptions/setup", &request.to_payload(), "setup mandate")
            .await?;
        Ok(MandateSetupResponse::from_raw(raw))
    }

    pub async fn order_status(&self, merchant_order_id: &str) -> Result<GatewayStatusResponse> {
        let raw = self
            .get_json(
                &format!("subscriptions/order/{merchant_order_id}/status"),
                "order status",
            )
            .await?;
        parse_status(raw)
    }

    pub async fn subscription_status(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<GatewayStatusResponse> {
        let raw = self
            .get_json(
                &format!("subscriptions/{gateway_subscription_id}/status"),
                "subscription status",
            )
            .await?;
        parse_status(raw)
    }

    pub async fn notify_redemption(
        &self,
        request: &RedemptionNotifyRequest,
    ) -> Result<GatewayOrderResponse> {
        let raw = self
            .post_json("subscriptions/notify", &request.to_payload(), "notify redemption")
            .await?;
        Ok(parse_order_response(raw, "notify redemption"))
    }

    pub async fn redeem(&self, merchant_order_id: &str) -> Result<GatewayOrderResponse> {
        let raw = self
            .post_json(
                "subscriptions/redeem",
                &json!({ "merchantOrderId": merchant_order_id }),
                "redeem",
            )
            .await?;
        Ok(parse_order_response(raw, "redeem"))
    }

    /// The cancel endpoint takes the merchant subscription id.
    pub async fn cancel(&self, merchant_subscription_id: &str) -> Result<()> {
        self.post_json(
            &format!("subscriptions/{merchant_subscription_id}/cancel"),
            &json!({}),
            "cancel mandate",
        )
        .await?;
        Ok(())
    }

    /// Pause and resume take the gateway-assigned subscription id.
    pub async fn pause(&self, gateway_subscription_id: &str) -> Result<()> {
        self.post_json(
            &format!("subscription/{gateway_subscription_id}/pause"),
            &json!({}),
            "pause mandate",
        )
        .await?;
        Ok(())
    }

    pub async fn resume(&self, gateway_subscription_id: &str) -> Result<()> {
        self.post_json(
            &format!("subscription/{gateway_subscription_id}/resume"),
            &json!({}),
            "resume mandate",
        )
        .await?;
        Ok(())
    }
}

async fn read_json_or_null(resp: reqwest::Response) -> Result<Value> {
    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn parse_status(raw: Value) -> Result<GatewayStatusResponse> {
    if raw.is_null() {
        return Ok(GatewayStatusResponse::default());
    }
    let mut status: GatewayStatusResponse = serde_json::from_value(raw.clone())?;
    // Order status nests the mandate id under paymentFlow.
    if status.subscription_id.is_none() {
        status.subscription_id = raw
            .pointer("/paymentFlow/subscriptionId")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    Ok(status)
}

/// The call already succeeded upstream, so an unreadable body only loses the
/// order id and state.
fn parse_order_response(raw: Value, context: &str) -> GatewayOrderResponse {
    if raw.is_null() {
        return GatewayOrderResponse::default();
    }
    match serde_json::from_value(raw.clone()) {
        Ok(response) => response,
        Err(err) => {
            warn!(
                context,
                error = %err,
                body = %raw,
                "autopay: unparseable order response, continuing without it"
            );
            GatewayOrderResponse::default()
        }
    }
}

/// Webhook callers send `hex(sha256("username:password"))` in `Authorization`.
pub fn verify_webhook_authorization(header: Option<&str>, username: &str, password: &str) -> bool {
    let Some(provided) = header.map(str::trim).filter(|h| !h.is_empty()) else {
        return false;
    };
    let provided = provided
        .strip_prefix("SHA256 ")
        .or_else(|| provided.strip_prefix("sha256 "))
        .unwrap_or(provided)
        .trim();
    let expected = hex::encode(Sha256::digest(format!("{username}:{password}").as_bytes()));
    provided.eq_ignore_ascii_case(&expected)
}
