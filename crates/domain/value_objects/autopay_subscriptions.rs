use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::value_objects::{
    civil_time,
    enums::{
        amount_types::AmountType, autopay_frequencies::AutopayFrequency,
        autopay_statuses::AutopayStatus, metals::Metal, redemption_statuses::RedemptionStatus,
    },
    payment_modes::PaymentMode,
};

/// One attempted or executed debit against a mandate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedemptionEntry {
    pub merchant_order_id: String,
    pub amount: f64,
    pub status: RedemptionStatus,
    #[serde(default)]
    pub gateway_state: Option<String>,
    #[serde(default)]
    pub gateway_order_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub executed_at: DateTime<Utc>,
}

/// Where the current mandate state can be read from at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSource {
    /// Only the setup order is known; query the order status endpoint.
    Order { merchant_order_id: String },
    /// The gateway has assigned its own subscription id.
    Mandate { gateway_subscription_id: String },
}

/// Result of applying an observed status to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Transitioned {
        from: AutopayStatus,
        to: AutopayStatus,
    },
    Rejected {
        current: AutopayStatus,
        observed: AutopayStatus,
    },
}

impl StatusChange {
    pub fn is_activation(&self) -> bool {
        matches!(
            self,
            StatusChange::Transitioned {
                from: AutopayStatus::Pending,
                to: AutopayStatus::Active,
            }
        )
    }

    pub fn changed(&self) -> bool {
        matches!(self, StatusChange::Transitioned { .. })
    }
}

#[derive(Debug, Clone)]
pub struct NewAutopaySubscription {
    pub user_id: Uuid,
    pub merchant_subscription_id: String,
    pub merchant_order_id: String,
    pub gateway_order_id: Option<String>,
    pub metal: Metal,
    pub amount: f64,
    pub max_amount: f64,
    pub frequency: AutopayFrequency,
    pub amount_type: AmountType,
    pub payment_mode: PaymentMode,
    pub expires_at: DateTime<Utc>,
}

/// The subscription document: mandate terms, lifecycle and redemption history.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopaySubscriptionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub merchant_subscription_id: String,
    pub gateway_subscription_id: Option<String>,
    pub merchant_order_id: String,
    pub gateway_order_id: Option<String>,
    pub metal: Metal,
    pub amount: f64,
    pub max_amount: f64,
    pub frequency: AutopayFrequency,
    pub amount_type: AmountType,
    pub payment_mode: PaymentMode,
    pub status: AutopayStatus,
    pub activated_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub last_redemption_at: Option<DateTime<Utc>>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub(crate) redemptions: Vec<RedemptionEntry>,
}

impl AutopaySubscriptionModel {
    pub fn new_pending(new: NewAutopaySubscription, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            merchant_subscription_id: new.merchant_subscription_id,
            gateway_subscription_id: None,
            merchant_order_id: new.merchant_order_id,
            gateway_order_id: new.gateway_order_id,
            metal: new.metal,
            amount: new.amount,
            max_amount: new.max_amount,
            frequency: new.frequency,
            amount_type: new.amount_type,
            payment_mode: new.payment_mode,
            status: AutopayStatus::Pending,
            activated_at: None,
            paused_at: None,
            revoked_at: None,
            cancelled_at: None,
            expires_at: new.expires_at,
            last_redemption_at: None,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
            redemptions: Vec::new(),
        }
    }

    pub fn redemptions(&self) -> &[RedemptionEntry] {
        &self.redemptions
    }

    pub fn redemption_count(&self) -> i32 {
        i32::try_from(self.redemptions.len()).unwrap_or(i32::MAX)
    }

    /// Sum of COMPLETED redemption amounts, in rupees.
    pub fn total_redemption_amount(&self) -> f64 {
        self.redemptions
            .iter()
            .filter(|entry| entry.status == RedemptionStatus::Completed)
            .map(|entry| entry.amount)
            .sum()
    }

    /// A gateway id we can actually address the mandate with. Placeholders
    /// (our own merchant id echoed back, blanks, `null`-ish strings, ids with
    /// whitespace) do not count.
    pub fn genuine_gateway_subscription_id(&self) -> Option<&str> {
        let id = self.gateway_subscription_id.as_deref()?.trim();
        let placeholder = id.is_empty()
            || id == self.merchant_subscription_id
            || id.contains(char::is_whitespace)
            || matches!(
                id.to_ascii_lowercase().as_str(),
                "null" | "undefined" | "none" | "nan"
            );
        (!placeholder).then_some(id)
    }

    pub fn has_placeholder_gateway_subscription_id(&self) -> bool {
        self.gateway_subscription_id.is_some() && self.genuine_gateway_subscription_id().is_none()
    }

    pub fn status_source(&self) -> StatusSource {
        match self.genuine_gateway_subscription_id() {
            Some(id) => StatusSource::Mandate {
                gateway_subscription_id: id.to_string(),
            },
            None => StatusSource::Order {
                merchant_order_id: self.merchant_order_id.clone(),
            },
        }
    }

    /// Records a gateway-assigned subscription id the first time a genuine one is seen.
    pub fn learn_gateway_subscription_id(&mut self, candidate: Option<&str>) -> bool {
        let Some(candidate) = candidate.map(str::trim).filter(|id| !id.is_empty()) else {
            return false;
        };
        if candidate == self.merchant_subscription_id
            || self.genuine_gateway_subscription_id().is_some()
        {
            return false;
        }
        self.gateway_subscription_id = Some(candidate.to_string());
        true
    }

    /// Applies a status reported by the gateway (poll or webhook).
    pub fn apply_gateway_status(
        &mut self,
        observed: AutopayStatus,
        now: DateTime<Utc>,
    ) -> StatusChange {
        if observed == self.status {
            return StatusChange::Unchanged;
        }
        if !self.status.accepts_gateway_update(observed) {
            return StatusChange::Rejected {
                current: self.status,
                observed,
            };
        }
        self.transition_to(observed, now)
    }

    /// Moves to `next` and stamps first-entry timestamps. Callers check legality.
    pub fn transition_to(&mut self, next: AutopayStatus, now: DateTime<Utc>) -> StatusChange {
        let from = self.status;
        if from == next {
            return StatusChange::Unchanged;
        }
        self.status = next;
        match next {
            AutopayStatus::Active => {
                self.activated_at.get_or_insert(now);
            }
            AutopayStatus::Paused => {
                self.paused_at.get_or_insert(now);
            }
            AutopayStatus::Revoked => {
                self.revoked_at.get_or_insert(now);
            }
            AutopayStatus::Cancelled => {
                self.revoked_at.get_or_insert(now);
                self.cancelled_at.get_or_insert(now);
            }
            _ => {}
        }
        self.updated_at = now;
        StatusChange::Transitioned { from, to: next }
    }

    pub fn record_redemption(&mut self, entry: RedemptionEntry) {
        self.last_redemption_at = Some(entry.executed_at);
        self.updated_at = entry.executed_at;
        self.redemptions.push(entry);
    }

    pub fn find_redemption(&self, merchant_order_id: &str) -> Option<&RedemptionEntry> {
        self.redemptions
            .iter()
            .find(|entry| entry.merchant_order_id == merchant_order_id)
    }

    /// Updates the status of a recorded redemption. A COMPLETED entry is never
    /// moved back to PENDING or FAILED. Returns whether the entry was found.
    pub fn update_redemption_status(
        &mut self,
        merchant_order_id: &str,
        status: RedemptionStatus,
        gateway_state: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(entry) = self
            .redemptions
            .iter_mut()
            .find(|entry| entry.merchant_order_id == merchant_order_id)
        else {
            return false;
        };

        let downgrade = entry.status == RedemptionStatus::Completed
            && matches!(status, RedemptionStatus::Pending | RedemptionStatus::Failed);
        if !downgrade {
            entry.status = status;
            if gateway_state.is_some() {
                entry.gateway_state = gateway_state;
            }
            self.updated_at = now;
        }
        true
    }

    /// Whether any redemption was executed on `date` (IST civil date).
    pub fn redeemed_on(&self, date: NaiveDate) -> bool {
        self.redemptions
            .iter()
            .any(|entry| civil_time::civil_date(entry.executed_at) == date)
    }

    pub fn note(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

/// Caller-facing view of a subscription.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopaySubscriptionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub merchant_subscription_id: String,
    pub gateway_subscription_id: Option<String>,
    pub merchant_order_id: String,
    pub gateway_order_id: Option<String>,
    pub metal: Metal,
    pub amount: f64,
    pub max_amount: f64,
    pub frequency: AutopayFrequency,
    pub amount_type: AmountType,
    pub payment_mode: &'static str,
    pub status: AutopayStatus,
    pub activated_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub last_redemption_at: Option<DateTime<Utc>>,
    pub redemption_count: i32,
    pub total_redemption_amount: f64,
    pub redemptions: Vec<RedemptionEntry>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AutopaySubscriptionModel> for AutopaySubscriptionDto {
    fn from(value: &AutopaySubscriptionModel) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            merchant_subscription_id: value.merchant_subscription_id.clone(),
            gateway_subscription_id: value.gateway_subscription_id.clone(),
            merchant_order_id: value.merchant_order_id.clone(),
            gateway_order_id: value.gateway_order_id.clone(),
            metal: value.metal,
            amount: value.amount,
            max_amount: value.max_amount,
            frequency: value.frequency,
            amount_type: value.amount_type,
            payment_mode: value.payment_mode.label(),
            status: value.status,
            activated_at: value.activated_at,
            paused_at: value.paused_at,
            revoked_at: value.revoked_at,
            cancelled_at: value.cancelled_at,
            expires_at: value.expires_at,
            last_redemption_at: value.last_redemption_at,
            redemption_count: value.redemption_count(),
            total_redemption_amount: value.total_redemption_amount(),
            redemptions: value.redemptions.clone(),
            metadata: value.metadata.clone(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupAutopayRequest {
    pub amount: f64,
    pub max_amount: Option<f64>,
    pub frequency: String,
    pub amount_type: Option<String>,
    pub metal: Option<String>,
    pub payment_mode: PaymentMode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupAutopayResponse {
    pub subscription_id: Uuid,
    pub merchant_subscription_id: String,
    pub merchant_order_id: String,
    pub status: AutopayStatus,
    /// The gateway's setup response, passed through untouched.
    pub gateway: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRequest {
    pub amount: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckResponse {
    pub subscription: AutopaySubscriptionDto,
    /// False when the gateway could not be reached and local data is returned as-is.
    pub refreshed: bool,
    pub gateway_state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub total: usize,
    pub synced: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSubscriptionPage {
    pub subscriptions: Vec<AutopaySubscriptionDto>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Identifiers a gateway callback may carry, in lookup priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionReferences {
    pub merchant_subscription_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_subscription_id: Option<String>,
    pub redemption_order_id: Option<String>,
}

impl SubscriptionReferences {
    pub fn is_empty(&self) -> bool {
        self.merchant_subscription_id.is_none()
            && self.gateway_order_id.is_none()
            && self.gateway_subscription_id.is_none()
            && self.redemption_order_id.is_none()
    }
}
