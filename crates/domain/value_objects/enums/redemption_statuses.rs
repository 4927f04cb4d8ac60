use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Gateway states that mean the debit went through.
pub const REDEMPTION_SUCCESS_STATES: [&str; 4] = ["COMPLETED", "SUCCESS", "DEBITED", "PAID"];

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
    Active,
    Paused,
    Revoked,
    Expired,
}

impl RedemptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionStatus::Pending => "PENDING",
            RedemptionStatus::Completed => "COMPLETED",
            RedemptionStatus::Failed => "FAILED",
            RedemptionStatus::Refunded => "REFUNDED",
            RedemptionStatus::Active => "ACTIVE",
            RedemptionStatus::Paused => "PAUSED",
            RedemptionStatus::Revoked => "REVOKED",
            RedemptionStatus::Expired => "EXPIRED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(RedemptionStatus::Pending),
            "COMPLETED" => Some(RedemptionStatus::Completed),
            "FAILED" => Some(RedemptionStatus::Failed),
            "REFUNDED" => Some(RedemptionStatus::Refunded),
            "ACTIVE" => Some(RedemptionStatus::Active),
            "PAUSED" => Some(RedemptionStatus::Paused),
            "REVOKED" => Some(RedemptionStatus::Revoked),
            "EXPIRED" => Some(RedemptionStatus::Expired),
            _ => None,
        }
    }

    pub fn is_success_state(state: &str) -> bool {
        let state = state.trim().to_ascii_uppercase();
        REDEMPTION_SUCCESS_STATES.contains(&state.as_str())
    }

    /// Status recorded for a redeem response. Success-set states are stored as
    /// COMPLETED; a missing or unrecognised state stays PENDING.
    pub fn from_gateway_state(state: Option<&str>) -> Self {
        match state {
            Some(state) if Self::is_success_state(state) => RedemptionStatus::Completed,
            Some(state) => Self::from_str(state).unwrap_or(RedemptionStatus::Pending),
            None => RedemptionStatus::Pending,
        }
    }
}

impl Display for RedemptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
