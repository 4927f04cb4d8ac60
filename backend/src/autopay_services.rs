use std::sync::Arc;

use anyhow::Result;
use crates::{
    domain::repositories::{
        autopay_subscriptions::AutopaySubscriptionRepository, metal_ledger::MetalLedgerRepository,
        metal_rates::MetalRateRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            autopay_subscriptions::AutopaySubscriptionPostgres, metal_ledger::MetalLedgerPostgres,
            metal_rates::MetalRatePostgres,
        },
    },
    observability::SharedAlertSink,
    payments::autopay_client::AutopayClient,
};
use tracing::info;

use crate::{
    config::config_model::{Autopay, WebhookCredentials},
    usecases::{
        autopay_gateway::AutopayGateway,
        autopay_redemptions::AutopayRedemptionUseCase,
        autopay_subscriptions::{AutopaySubscriptionUseCase, LifecycleSettings},
        autopay_webhook::AutopayWebhookUseCase,
        daily_autopay::DailyAutopayUseCase,
        metal_crediting::MetalCreditingUseCase,
    },
};

/// Every autopay use case, wired once per process and shared by routers and the worker.
pub struct AutopayServices {
    pub subscriptions: Arc<AutopaySubscriptionUseCase>,
    pub redemptions: Arc<AutopayRedemptionUseCase>,
    pub webhook: Arc<AutopayWebhookUseCase>,
    pub daily: Arc<DailyAutopayUseCase>,
}

pub struct AutopayParts {
    pub subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
    pub ledger: Arc<dyn MetalLedgerRepository + Send + Sync>,
    pub rates: Arc<dyn MetalRateRepository + Send + Sync>,
    pub gateway: Arc<dyn AutopayGateway>,
    pub webhook_credentials: Option<WebhookCredentials>,
    pub settings: LifecycleSettings,
    pub alert_sink: Option<SharedAlertSink>,
}

impl AutopayServices {
    pub fn build(
        autopay: &Autopay,
        db_pool: Arc<PgPoolSquad>,
        alert_sink: Option<SharedAlertSink>,
    ) -> Result<Self> {
        let client = AutopayClient::new(autopay.client_config())?;
        info!(
            environment = %autopay.environment,
            webhook_auth = autopay.webhook.is_some(),
            "autopay: gateway client ready"
        );

        Ok(Self::from_parts(AutopayParts {
            subscriptions: Arc::new(AutopaySubscriptionPostgres::new(Arc::clone(&db_pool))),
            ledger: Arc::new(MetalLedgerPostgres::new(Arc::clone(&db_pool))),
            rates: Arc::new(MetalRatePostgres::new(Arc::clone(&db_pool))),
            gateway: Arc::new(client),
            webhook_credentials: autopay.webhook.clone(),
            settings: LifecycleSettings {
                mandate_validity_days: autopay.mandate_validity_days,
                ..LifecycleSettings::default()
            },
            alert_sink,
        }))
    }

    pub fn from_parts(parts: AutopayParts) -> Self {
        let crediting = Arc::new(MetalCreditingUseCase::new(parts.ledger, parts.rates));
        let redemptions = Arc::new(AutopayRedemptionUseCase::new(
            Arc::clone(&parts.subscriptions),
            Arc::clone(&parts.gateway),
            Arc::clone(&crediting),
        ));
        let subscriptions = Arc::new(AutopaySubscriptionUseCase::new(
            Arc::clone(&parts.subscriptions),
            parts.gateway,
            Arc::clone(&crediting),
            parts.settings,
        ));
        let webhook = Arc::new(AutopayWebhookUseCase::new(
            Arc::clone(&parts.subscriptions),
            crediting,
            parts.webhook_credentials,
        ));
        let daily = Arc::new(DailyAutopayUseCase::new(
            parts.subscriptions,
            Arc::clone(&redemptions),
            parts.alert_sink,
        ));

        Self {
            subscriptions,
            redemptions,
            webhook,
            daily,
        }
    }
}
