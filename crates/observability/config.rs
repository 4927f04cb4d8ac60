use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) alert_webhook_url: Option<Url>,
    /// Logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();
        let service_name = env_string("SERVICE_NAME").unwrap_or_else(|| component.clone());
        let environment = env_string("STAGE").unwrap_or_else(|| "unknown".to_string());

        let mut warnings = Vec::new();
        let alert_webhook_url = match env_string("DISCORD_AUTOPAY_ALERT_WEBHOOK_URL") {
            Some(raw) => match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    // The raw value is a secret, keep it out of the logs.
                    warnings.push(format!(
                        "DISCORD_AUTOPAY_ALERT_WEBHOOK_URL is invalid; alerts disabled (parse error: {err})"
                    ));
                    None
                }
            },
            None => None,
        };

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            alert_webhook_url,
            warnings,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
