mod config;
mod discord;

use anyhow::Result;
use async_trait::async_trait;
use config::ObservabilityConfig;
use mockall::automock;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use discord::DiscordAlerter;

/// Destination for operational alerts that need a human (failed scheduled charges).
#[automock]
#[async_trait]
pub trait AlertSink {
    async fn alert(&self, title: &str, body: &str) -> Result<()>;
}

pub type SharedAlertSink = Arc<dyn AlertSink + Send + Sync>;

pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so `TZ=Asia/Kolkata` shows `+05:30` in logs.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            warning = %warning,
            "Observability config warning"
        );
    }

    info!(
        service = %config.service_context.service_name,
        environment = %config.service_context.environment,
        component = %config.service_context.component,
        alerts_enabled = config.alert_webhook_url.is_some(),
        "Observability initialized"
    );

    Ok(())
}

/// The Discord alert sink, when `DISCORD_AUTOPAY_ALERT_WEBHOOK_URL` is configured.
pub fn alert_sink_from_env(component: &str) -> Result<Option<SharedAlertSink>> {
    let config = ObservabilityConfig::from_env(component);
    let Some(webhook_url) = config.alert_webhook_url else {
        return Ok(None);
    };
    let alerter = DiscordAlerter::new(webhook_url, config.service_context)?;
    Ok(Some(Arc::new(alerter)))
}
