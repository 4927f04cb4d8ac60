use std::time::Duration;

use crates::{
    domain::value_objects::enums::gateway_environments::GatewayEnvironment,
    payments::autopay_client::AutopayClientConfig,
};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub autopay: Autopay,
    pub internal: Internal,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Autopay {
    pub environment: GatewayEnvironment,
    pub client_id: String,
    pub client_secret: String,
    pub client_version: String,
    pub base_url: String,
    pub auth_url: String,
    pub http_timeout_secs: u64,
    pub webhook: Option<WebhookCredentials>,
    pub mandate_validity_days: i64,
}

impl Autopay {
    pub fn client_config(&self) -> AutopayClientConfig {
        AutopayClientConfig {
            environment: self.environment,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            client_version: self.client_version.clone(),
            base_url: self.base_url.clone(),
            auth_url: self.auth_url.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Internal {
    /// Bearer token for `/internal/v1/*`; those routes answer 503 when unset.
    pub cron_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserSecret {
    pub secret: String,
}
