use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// How the customer authorises the mandate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// Customer is handed an intent URL for a UPI app on the same device.
    UpiIntent {
        #[serde(rename = "targetApp")]
        target_app: String,
    },
    /// Gateway pushes a collect request to the customer's VPA.
    UpiCollect { vpa: String },
}

impl PaymentMode {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::UpiIntent { .. } => "UPI_INTENT",
            PaymentMode::UpiCollect { .. } => "UPI_COLLECT",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            PaymentMode::UpiIntent { target_app } if target_app.trim().is_empty() => {
                Err("targetApp is required for UPI_INTENT".to_string())
            }
            PaymentMode::UpiCollect { vpa } if !is_plausible_vpa(vpa) => {
                Err("a valid vpa is required for UPI_COLLECT".to_string())
            }
            _ => Ok(()),
        }
    }

    /// The `paymentMode` block of a mandate-setup request.
    pub fn to_gateway_payload(&self) -> Value {
        match self {
            PaymentMode::UpiIntent { target_app } => json!({
                "type": "UPI_INTENT",
                "targetApp": target_app,
            }),
            PaymentMode::UpiCollect { vpa } => json!({
                "type": "UPI_COLLECT",
                "details": {
                    "type": "VPA",
                    "vpa": vpa,
                },
            }),
        }
    }
}

fn is_plausible_vpa(vpa: &str) -> bool {
    let vpa = vpa.trim();
    match vpa.split_once('@') {
        Some((handle, provider)) => {
            !handle.is_empty() && !provider.is_empty() && !vpa.contains(char::is_whitespace)
        }
        None => false,
    }
}
