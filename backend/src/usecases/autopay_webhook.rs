use std::sync::Arc;

use chrono::Utc;
use crates::{
    domain::{
        repositories::autopay_subscriptions::AutopaySubscriptionRepository,
        value_objects::{
            autopay_subscriptions::{AutopaySubscriptionModel, RedemptionEntry, StatusChange},
            autopay_webhook::{AutopayWebhookEvent, AutopayWebhookPayload, WebhookAck},
            enums::{autopay_statuses::AutopayStatus, redemption_statuses::RedemptionStatus},
        },
    },
    payments::autopay_client::verify_webhook_authorization,
};
use tracing::{error, info, warn};

use super::{
    autopay_errors::{AutopayError, UseCaseResult},
    metal_crediting::MetalCreditingUseCase,
};
use crate::config::config_model::WebhookCredentials;

/// Applies asynchronous gateway callbacks to local subscriptions.
pub struct AutopayWebhookUseCase {
    subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
    crediting: Arc<MetalCreditingUseCase>,
    credentials: Option<WebhookCredentials>,
}

impl AutopayWebhookUseCase {
    pub fn new(
        subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
        crediting: Arc<MetalCreditingUseCase>,
        credentials: Option<WebhookCredentials>,
    ) -> Self {
        Self {
            subscriptions,
            crediting,
            credentials,
        }
    }

    /// Without configured credentials every callback is accepted.
    pub fn authorize(&self, authorization: Option<&str>) -> UseCaseResult<()> {
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };
        if verify_webhook_authorization(
            authorization,
            &credentials.username,
            &credentials.password,
        ) {
            Ok(())
        } else {
            warn!(
                header_present = authorization.is_some(),
                "autopay: webhook authorization mismatch"
            );
            Err(AutopayError::Unauthorized)
        }
    }

    pub async fn handle_event(&self, payload: AutopayWebhookPayload) -> UseCaseResult<WebhookAck> {
        let event_name = payload.event.trim().to_string();
        let Some(event) = AutopayWebhookEvent::from_str(&event_name) else {
            info!(event = %event_name, "autopay: ignoring unsupported webhook event");
            return Ok(ack(&event_name, None, false, "unsupported event"));
        };

        let references = payload.data.references();
        if references.is_empty() {
            warn!(event = %event_name, "autopay: webhook carries no identifiers");
            return Ok(ack(&event_name, None, false, "no identifiers in payload"));
        }

        let Some(mut subscription) = self
            .subscriptions
            .find_by_references(&references)
            .await
            .map_err(|err| {
                error!(event = %event_name, db_error = ?err, "autopay: webhook lookup failed");
                AutopayError::Internal(err)
            })?
        else {
            warn!(
                event = %event_name,
                merchant_subscription_id = ?references.merchant_subscription_id,
                gateway_order_id = ?references.gateway_order_id,
                gateway_subscription_id = ?references.gateway_subscription_id,
                "autopay: no subscription matches webhook"
            );
            return Ok(ack(&event_name, None, false, "subscription not found"));
        };

        info!(
            event = %event_name,
            subscription_id = %subscription.id,
            status = %subscription.status,
            "autopay: webhook received"
        );

        let note = match event {
            AutopayWebhookEvent::SubscriptionSetupSuccess => {
                self.on_setup_success(&mut subscription, &payload).await?
            }
            AutopayWebhookEvent::SubscriptionSetupFailed => {
                self.on_setup_failed(&mut subscription, &payload).await?
            }
            AutopayWebhookEvent::RedemptionSuccess => {
                self.on_redemption_success(&mut subscription, &payload)
                    .await?
            }
            AutopayWebhookEvent::RedemptionFailed => {
                self.on_redemption_failed(&mut subscription, &payload)
                    .await?
            }
            AutopayWebhookEvent::SubscriptionCancelled => {
                self.apply_status(&mut subscription, AutopayStatus::Cancelled)
                    .await?
                    .1
            }
        };

        Ok(ack(&event_name, Some(&subscription), true, &note))
    }

    async fn save(&self, subscription: &AutopaySubscriptionModel) -> UseCaseResult<()> {
        self.subscriptions.save(subscription).await.map_err(|err| {
            error!(subscription_id = %subscription.id, db_error = ?err, "autopay: failed to save webhook update");
            AutopayError::Internal(err)
        })
    }

    async fn apply_status(
        &self,
        subscription: &mut AutopaySubscriptionModel,
        observed: AutopayStatus,
    ) -> UseCaseResult<(StatusChange, String)> {
        let change = subscription.apply_gateway_status(observed, Utc::now());
        let note = match change {
            StatusChange::Transitioned { from, to } => {
                self.save(subscription).await?;
                format!("{from} -> {to}")
            }
            StatusChange::Unchanged => format!("already {observed}"),
            StatusChange::Rejected { current, .. } => {
                format!("{current} is not overwritten by {observed}")
            }
        };
        Ok((change, note))
    }

    async fn on_setup_success(
        &self,
        subscription: &mut AutopaySubscriptionModel,
        payload: &AutopayWebhookPayload,
    ) -> UseCaseResult<String> {
        let learned =
            subscription.learn_gateway_subscription_id(payload.data.subscription_id.as_deref());
        let (change, note) = self.apply_status(subscription, AutopayStatus::Active).await?;
        if learned && !change.changed() {
            self.save(subscription).await?;
        }

        if change.is_activation() {
            match self
                .crediting
                .credit_gold_when_subscription_activated(subscription)
                .await
            {
                Ok(receipt) => info!(
                    subscription_id = %subscription.id,
                    order_id = %receipt.order_id,
                    already_credited = receipt.already_credited,
                    "autopay: activation credit applied from webhook"
                ),
                Err(err) => error!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "autopay: activation credit failed"
                ),
            }
        }
        Ok(note)
    }

    async fn on_setup_failed(
        &self,
        subscription: &mut AutopaySubscriptionModel,
        payload: &AutopayWebhookPayload,
    ) -> UseCaseResult<String> {
        if subscription.status != AutopayStatus::Pending {
            return Ok(format!(
                "setup failure ignored for {} subscription",
                subscription.status
            ));
        }
        if let Some(code) = &payload.data.error_code {
            subscription.note("setupErrorCode", code.as_str());
        }
        if let Some(code) = &payload.data.detailed_error_code {
            subscription.note("setupDetailedErrorCode", code.as_str());
        }
        let (_, note) = self.apply_status(subscription, AutopayStatus::Failed).await?;
        Ok(note)
    }

    async fn on_redemption_success(
        &self,
        subscription: &mut AutopaySubscriptionModel,
        payload: &AutopayWebhookPayload,
    ) -> UseCaseResult<String> {
        let Some(merchant_order_id) = payload
            .data
            .merchant_order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
        else {
            return Ok("redemption without merchantOrderId ignored".to_string());
        };

        // The locally recorded amount wins over the callback's figure.
        let amount = match subscription.find_redemption(&merchant_order_id) {
            Some(entry) => Some(entry.amount),
            None => payload.data.amount_in_rupees(),
        };
        let Some(amount) = amount else {
            warn!(
                subscription_id = %subscription.id,
                merchant_order_id = %merchant_order_id,
                "autopay: redemption success without a usable amount"
            );
            return Ok("redemption amount unknown, nothing credited".to_string());
        };

        let now = Utc::now();
        let gateway_state = payload.data.state.clone();
        if !subscription.update_redemption_status(
            &merchant_order_id,
            RedemptionStatus::Completed,
            gateway_state.clone(),
            now,
        ) {
            subscription.record_redemption(RedemptionEntry {
                merchant_order_id: merchant_order_id.clone(),
                amount,
                status: RedemptionStatus::Completed,
                gateway_state,
                gateway_order_id: payload.data.order_id.clone(),
                note: Some("recorded from webhook".to_string()),
                executed_at: now,
            });
        }
        self.save(subscription).await?;

        let note = match self
            .crediting
            .credit_gold_on_autopay_redemption(
                subscription.user_id,
                subscription.metal,
                amount,
                &merchant_order_id,
            )
            .await
        {
            Ok(receipt) if receipt.already_credited => "redemption already credited".to_string(),
            Ok(receipt) => format!("credited {} g {}", receipt.grams, receipt.metal),
            Err(err) => {
                error!(
                    subscription_id = %subscription.id,
                    merchant_order_id = %merchant_order_id,
                    error = %err,
                    "autopay: redemption credit from webhook failed"
                );
                format!("redemption recorded, credit failed: {err}")
            }
        };
        Ok(note)
    }

    async fn on_redemption_failed(
        &self,
        subscription: &mut AutopaySubscriptionModel,
        payload: &AutopayWebhookPayload,
    ) -> UseCaseResult<String> {
        let Some(merchant_order_id) = payload.data.merchant_order_id.as_deref() else {
            return Ok("redemption without merchantOrderId ignored".to_string());
        };

        let updated = subscription.update_redemption_status(
            merchant_order_id.trim(),
            RedemptionStatus::Failed,
            payload.data.state.clone(),
            Utc::now(),
        );
        if !updated {
            return Ok("unknown redemption order".to_string());
        }
        self.save(subscription).await?;
        Ok("redemption marked failed".to_string())
    }
}

fn ack(
    event: &str,
    subscription: Option<&AutopaySubscriptionModel>,
    handled: bool,
    note: &str,
) -> WebhookAck {
    WebhookAck {
        success: true,
        event: event.to_string(),
        handled,
        subscription_id: subscription.map(|sub| sub.id),
        note: note.to_string(),
    }
}
