use std::fmt::Display;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl GatewayEnvironment {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SANDBOX" | "UAT" | "PREPROD" => Some(GatewayEnvironment::Sandbox),
            "PRODUCTION" | "PROD" => Some(GatewayEnvironment::Production),
            _ => None,
        }
    }

    pub fn is_sandbox(&self) -> bool {
        *self == GatewayEnvironment::Sandbox
    }
}

impl Display for GatewayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayEnvironment::Sandbox => write!(f, "SANDBOX"),
            GatewayEnvironment::Production => write!(f, "PRODUCTION"),
        }
    }
}
