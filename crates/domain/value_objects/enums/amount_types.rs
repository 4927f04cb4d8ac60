use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountType {
    #[default]
    Fixed,
    Variable,
}

impl AmountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountType::Fixed => "FIXED",
            AmountType::Variable => "VARIABLE",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FIXED" => Some(AmountType::Fixed),
            "VARIABLE" => Some(AmountType::Variable),
            _ => None,
        }
    }
}

impl Display for AmountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
