use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutopayFrequency {
    OnDemand,
    Daily,
    Weekly,
    Fortnightly,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl AutopayFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutopayFrequency::OnDemand => "ON_DEMAND",
            AutopayFrequency::Daily => "DAILY",
            AutopayFrequency::Weekly => "WEEKLY",
            AutopayFrequency::Fortnightly => "FORTNIGHTLY",
            AutopayFrequency::Monthly => "MONTHLY",
            AutopayFrequency::Quarterly => "QUARTERLY",
            AutopayFrequency::HalfYearly => "HALF_YEARLY",
            AutopayFrequency::Yearly => "YEARLY",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ON_DEMAND" => Some(AutopayFrequency::OnDemand),
            "DAILY" => Some(AutopayFrequency::Daily),
            "WEEKLY" => Some(AutopayFrequency::Weekly),
            "FORTNIGHTLY" => Some(AutopayFrequency::Fortnightly),
            "MONTHLY" => Some(AutopayFrequency::Monthly),
            "QUARTERLY" => Some(AutopayFrequency::Quarterly),
            "HALF_YEARLY" => Some(AutopayFrequency::HalfYearly),
            "YEARLY" => Some(AutopayFrequency::Yearly),
            _ => None,
        }
    }

    /// Frequencies limited to one ACTIVE/PENDING mandate per user.
    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            AutopayFrequency::Daily | AutopayFrequency::Weekly | AutopayFrequency::Monthly
        )
    }
}

impl Display for AutopayFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
