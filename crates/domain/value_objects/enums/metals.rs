use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metal {
    #[default]
    Gold,
    Silver,
}

impl Metal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metal::Gold => "GOLD",
            Metal::Silver => "SILVER",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GOLD" => Some(Metal::Gold),
            "SILVER" => Some(Metal::Silver),
            _ => None,
        }
    }
}

impl Display for Metal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
