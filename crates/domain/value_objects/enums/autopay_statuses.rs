use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of a recurring mandate.
///
/// ```text
/// PENDING -> ACTIVE | FAILED | CANCELLED
/// ACTIVE  -> PAUSED | CANCELLED | REVOKED | EXPIRED
/// PAUSED  -> ACTIVE | CANCELLED
/// ```
///
/// CANCELLED, REVOKED, EXPIRED and FAILED are terminal.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutopayStatus {
    #[default]
    Pending,
    Active,
    Paused,
    Revoked,
    Expired,
    Failed,
    Cancelled,
}

impl AutopayStatus {
    pub const ALL: [AutopayStatus; 7] = [
        AutopayStatus::Pending,
        AutopayStatus::Active,
        AutopayStatus::Paused,
        AutopayStatus::Revoked,
        AutopayStatus::Expired,
        AutopayStatus::Failed,
        AutopayStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutopayStatus::Pending => "PENDING",
            AutopayStatus::Active => "ACTIVE",
            AutopayStatus::Paused => "PAUSED",
            AutopayStatus::Revoked => "REVOKED",
            AutopayStatus::Expired => "EXPIRED",
            AutopayStatus::Failed => "FAILED",
            AutopayStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }

    /// Maps the gateway's vocabulary onto ours. The gateway reports a
    /// successfully authorised mandate as `COMPLETED`; anything outside the
    /// local vocabulary yields `None` and must be ignored by the caller.
    pub fn from_gateway_state(state: &str) -> Option<Self> {
        if state.trim().eq_ignore_ascii_case("COMPLETED") {
            return Some(AutopayStatus::Active);
        }
        Self::from_str(state)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AutopayStatus::Cancelled
                | AutopayStatus::Revoked
                | AutopayStatus::Expired
                | AutopayStatus::Failed
        )
    }

    /// Whether the mandate occupies the user's single slot for its frequency.
    pub fn holds_frequency_slot(&self) -> bool {
        matches!(self, AutopayStatus::Active | AutopayStatus::Pending)
    }

    /// Whether `self -> next` is an edge of the lifecycle above.
    pub fn can_transition_to(&self, next: AutopayStatus) -> bool {
        use AutopayStatus::*;
        matches!(
            (*self, next),
            (Pending, Active | Failed | Cancelled)
                | (Active, Paused | Cancelled | Revoked | Expired)
                | (Paused, Active | Cancelled)
        )
    }

    /// Whether a status observed at the gateway may replace `self`. A pause can
    /// exist only locally while the gateway still reports ACTIVE, so only a user
    /// resume leaves PAUSED for ACTIVE.
    pub fn accepts_gateway_update(&self, next: AutopayStatus) -> bool {
        if *self == AutopayStatus::Paused && next == AutopayStatus::Active {
            return false;
        }
        self.can_transition_to(next)
    }
}

impl Display for AutopayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
