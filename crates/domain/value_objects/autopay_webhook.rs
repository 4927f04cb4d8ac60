use serde::{Deserialize, Serialize};

use crate::domain::value_objects::autopay_subscriptions::SubscriptionReferences;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutopayWebhookEvent {
    SubscriptionSetupSuccess,
    SubscriptionSetupFailed,
    RedemptionSuccess,
    RedemptionFailed,
    SubscriptionCancelled,
}

impl AutopayWebhookEvent {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUBSCRIPTION_SETUP_SUCCESS" => Some(AutopayWebhookEvent::SubscriptionSetupSuccess),
            "SUBSCRIPTION_SETUP_FAILED" => Some(AutopayWebhookEvent::SubscriptionSetupFailed),
            "REDEMPTION_SUCCESS" => Some(AutopayWebhookEvent::RedemptionSuccess),
            "REDEMPTION_FAILED" => Some(AutopayWebhookEvent::RedemptionFailed),
            "SUBSCRIPTION_CANCELLED" => Some(AutopayWebhookEvent::SubscriptionCancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutopayWebhookPayload {
    pub event: String,
    #[serde(default, alias = "payload")]
    pub data: AutopayWebhookData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopayWebhookData {
    pub merchant_subscription_id: Option<String>,
    pub subscription_id: Option<String>,
    pub order_id: Option<String>,
    pub merchant_order_id: Option<String>,
    /// Minor units (paise). Kept loose so an odd amount does not sink the
    /// whole callback.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    pub state: Option<String>,
    pub error_code: Option<String>,
    pub detailed_error_code: Option<String>,
}

impl AutopayWebhookData {
    pub fn references(&self) -> SubscriptionReferences {
        SubscriptionReferences {
            merchant_subscription_id: non_blank(&self.merchant_subscription_id),
            gateway_order_id: non_blank(&self.order_id),
            gateway_subscription_id: non_blank(&self.subscription_id),
            redemption_order_id: non_blank(&self.merchant_order_id),
        }
    }

    pub fn amount_in_rupees(&self) -> Option<f64> {
        let paise = match self.amount.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (paise.is_finite() && paise > 0.0).then(|| paise / 100.0)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub event: String,
    pub handled: bool,
    pub subscription_id: Option<uuid::Uuid>,
    pub note: String,
}
