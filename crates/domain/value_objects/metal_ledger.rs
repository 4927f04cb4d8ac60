use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::metals::Metal;

/// A credit to apply to a user's metal balance, keyed by `order_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerCredit {
    pub user_id: Uuid,
    pub order_id: String,
    pub metal: Metal,
    pub amount_rupees: f64,
    pub grams: f64,
    pub rate_per_gram: f64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCreditOutcome {
    Credited {
        grams: f64,
        rate_per_gram: f64,
        new_balance: f64,
    },
    /// A transaction with the same order id already exists; nothing was applied.
    AlreadyCredited { grams: f64, rate_per_gram: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditReceipt {
    pub order_id: String,
    pub metal: Metal,
    pub grams: f64,
    pub rate_per_gram: f64,
    pub already_credited: bool,
}

/// Grams bought for `amount_rupees` at `rate_per_gram`, rounded to 4 decimals.
pub fn grams_for_amount(amount_rupees: f64, rate_per_gram: f64) -> f64 {
    ((amount_rupees / rate_per_gram) * 10_000.0).round() / 10_000.0
}
