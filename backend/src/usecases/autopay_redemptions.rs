use std::sync::Arc;

use chrono::{Duration, Utc};
use crates::{
    domain::{
        repositories::autopay_subscriptions::AutopaySubscriptionRepository,
        value_objects::{
            autopay_subscriptions::{
                AutopaySubscriptionModel, RedemptionEntry, RedemptionRequest,
            },
            enums::{autopay_statuses::AutopayStatus, redemption_statuses::RedemptionStatus},
            metal_ledger::CreditReceipt,
        },
    },
    payments::autopay_client::RedemptionNotifyRequest,
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    autopay_errors::{AutopayError, UseCaseResult},
    autopay_gateway::AutopayGateway,
    metal_crediting::MetalCreditingUseCase,
};

/// How long the gateway holds a pre-debit notice open.
const NOTIFY_EXPIRY_MINUTES: i64 = 30;

pub fn new_redemption_order_id() -> String {
    format!("AP_RDM_{}", Uuid::new_v4().simple())
}

/// Result of one debit attempt. Also the headless path's only return type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionOutcome {
    pub success: bool,
    pub subscription_id: Uuid,
    pub merchant_order_id: Option<String>,
    pub amount: f64,
    pub status: Option<RedemptionStatus>,
    pub gateway_state: Option<String>,
    pub credit: Option<CreditReceipt>,
    pub credit_error: Option<String>,
    pub error: Option<String>,
}

impl RedemptionOutcome {
    fn failure(subscription_id: Uuid, amount: f64, error: String) -> Self {
        Self {
            success: false,
            subscription_id,
            merchant_order_id: None,
            amount,
            status: None,
            gateway_state: None,
            credit: None,
            credit_error: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyReceipt {
    pub subscription_id: Uuid,
    pub merchant_order_id: String,
    pub amount: f64,
    pub gateway_state: Option<String>,
}

/// Notify + redeem against an active mandate, then the ledger credit.
pub struct AutopayRedemptionUseCase {
    subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
    gateway: Arc<dyn AutopayGateway>,
    crediting: Arc<MetalCreditingUseCase>,
}

impl AutopayRedemptionUseCase {
    pub fn new(
        subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
        gateway: Arc<dyn AutopayGateway>,
        crediting: Arc<MetalCreditingUseCase>,
    ) -> Self {
        Self {
            subscriptions,
            gateway,
            crediting,
        }
    }

    async fn load_owned_active(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> UseCaseResult<AutopaySubscriptionModel> {
        let subscription = self
            .subscriptions
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(%user_id, %subscription_id, db_error = ?err, "autopay: failed to load subscription");
                AutopayError::Internal(err)
            })?
            .filter(|sub| sub.user_id == user_id)
            .ok_or(AutopayError::NotFound("subscription"))?;

        if subscription.status != AutopayStatus::Active {
            return Err(AutopayError::InvalidState(format!(
                "subscription must be ACTIVE to redeem (current: {})",
                subscription.status
            )));
        }
        Ok(subscription)
    }

    fn resolve_amount(
        subscription: &AutopaySubscriptionModel,
        requested: Option<f64>,
    ) -> UseCaseResult<f64> {
        let amount = requested.unwrap_or(subscription.amount);
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AutopayError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if amount > subscription.max_amount {
            return Err(AutopayError::Validation(format!(
                "amount {amount} exceeds the mandate maximum of {}",
                subscription.max_amount
            )));
        }
        Ok(amount)
    }

    /// Request path: the caller must own an ACTIVE subscription. Gateway
    /// failures come back as [`AutopayError::Gateway`] and record nothing.
    pub async fn execute_redemption(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        request: RedemptionRequest,
    ) -> UseCaseResult<RedemptionOutcome> {
        info!(%user_id, %subscription_id, "autopay: redemption requested");
        let subscription = self.load_owned_active(user_id, subscription_id).await?;
        let amount = Self::resolve_amount(&subscription, request.amount)?;
        self.charge(subscription, amount, request.note).await
    }

    /// Scheduler path. Never returns an error; every failure is folded into
    /// the outcome so one subscription cannot stop a batch.
    pub async fn execute_redemption_headless(
        &self,
        subscription: AutopaySubscriptionModel,
        amount: Option<f64>,
        note: Option<String>,
    ) -> RedemptionOutcome {
        let subscription_id = subscription.id;
        let requested = amount.unwrap_or(subscription.amount);

        if subscription.status != AutopayStatus::Active {
            warn!(
                %subscription_id,
                status = %subscription.status,
                "autopay: headless redemption skipped, subscription not ACTIVE"
            );
            return RedemptionOutcome::failure(
                subscription_id,
                requested,
                format!("subscription is {}, not ACTIVE", subscription.status),
            );
        }

        let amount = match Self::resolve_amount(&subscription, amount) {
            Ok(amount) => amount,
            Err(err) => return RedemptionOutcome::failure(subscription_id, requested, err.to_string()),
        };

        match self.charge(subscription, amount, note).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%subscription_id, error = %err, "autopay: headless redemption failed");
                RedemptionOutcome::failure(subscription_id, amount, err.to_string())
            }
        }
    }

    async fn charge(
        &self,
        mut subscription: AutopaySubscriptionModel,
        amount: f64,
        note: Option<String>,
    ) -> UseCaseResult<RedemptionOutcome> {
        let merchant_order_id = new_redemption_order_id();
        let now = Utc::now();

        self.gateway
            .notify_redemption(&RedemptionNotifyRequest {
                merchant_order_id: merchant_order_id.clone(),
                merchant_subscription_id: subscription.merchant_subscription_id.clone(),
                amount,
                expire_at: now + Duration::minutes(NOTIFY_EXPIRY_MINUTES),
            })
            .await
            .map_err(|err| {
                error!(
                    subscription_id = %subscription.id,
                    merchant_order_id = %merchant_order_id,
                    error = ?err,
                    "autopay: notify failed"
                );
                AutopayError::gateway(err)
            })?;

        let redeemed = self.gateway.redeem(&merchant_order_id).await.map_err(|err| {
            error!(
                subscription_id = %subscription.id,
                merchant_order_id = %merchant_order_id,
                error = ?err,
                "autopay: redeem failed"
            );
            AutopayError::gateway(err)
        })?;

        let gateway_state = redeemed
            .state
            .as_deref()
            .map(|state| state.trim().to_ascii_uppercase())
            .filter(|state| !state.is_empty());
        let status = RedemptionStatus::from_gateway_state(gateway_state.as_deref());

        subscription.record_redemption(RedemptionEntry {
            merchant_order_id: merchant_order_id.clone(),
            amount,
            status,
            gateway_state: gateway_state.clone(),
            gateway_order_id: redeemed.order_id.clone(),
            note,
            executed_at: Utc::now(),
        });
        // History is written before any ledger action.
        self.subscriptions.save(&subscription).await.map_err(|err| {
            error!(
                subscription_id = %subscription.id,
                merchant_order_id = %merchant_order_id,
                db_error = ?err,
                "autopay: failed to record redemption"
            );
            AutopayError::Internal(err)
        })?;

        info!(
            subscription_id = %subscription.id,
            merchant_order_id = %merchant_order_id,
            amount,
            status = %status,
            gateway_state = ?gateway_state,
            "autopay: redemption recorded"
        );

        let success = status == RedemptionStatus::Completed;
        let (credit, credit_error) = if success {
            match self
                .crediting
                .credit_gold_on_autopay_redemption(
                    subscription.user_id,
                    subscription.metal,
                    amount,
                    &merchant_order_id,
                )
                .await
            {
                Ok(receipt) => (Some(receipt), None),
                Err(err) => {
                    error!(
                        subscription_id = %subscription.id,
                        merchant_order_id = %merchant_order_id,
                        error = %err,
                        "autopay: debit succeeded but crediting failed"
                    );
                    (None, Some(err.to_string()))
                }
            }
        } else {
            (None, None)
        };

        Ok(RedemptionOutcome {
            success,
            subscription_id: subscription.id,
            merchant_order_id: Some(merchant_order_id),
            amount,
            status: Some(status),
            gateway_state,
            credit,
            credit_error,
            error: (!success).then(|| format!("redemption finished as {status}")),
        })
    }

    /// Sends only the pre-debit notice and records a PENDING entry for it.
    pub async fn notify_redemption(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        request: RedemptionRequest,
    ) -> UseCaseResult<NotifyReceipt> {
        info!(%user_id, %subscription_id, "autopay: notify requested");
        let mut subscription = self.load_owned_active(user_id, subscription_id).await?;
        let amount = Self::resolve_amount(&subscription, request.amount)?;
        let merchant_order_id = new_redemption_order_id();
        let now = Utc::now();

        let notified = self
            .gateway
            .notify_redemption(&RedemptionNotifyRequest {
                merchant_order_id: merchant_order_id.clone(),
                merchant_subscription_id: subscription.merchant_subscription_id.clone(),
                amount,
                expire_at: now + Duration::minutes(NOTIFY_EXPIRY_MINUTES),
            })
            .await
            .map_err(|err| {
                error!(%subscription_id, error = ?err, "autopay: notify failed");
                AutopayError::gateway(err)
            })?;

        let gateway_state = notified.state.clone();
        subscription.record_redemption(RedemptionEntry {
            merchant_order_id: merchant_order_id.clone(),
            amount,
            status: RedemptionStatus::Pending,
            gateway_state: gateway_state.clone(),
            gateway_order_id: notified.order_id,
            note: request.note,
            executed_at: now,
        });
        self.subscriptions
            .save(&subscription)
            .await
            .map_err(AutopayError::Internal)?;

        info!(%subscription_id, merchant_order_id = %merchant_order_id, "autopay: redemption notified");
        Ok(NotifyReceipt {
            subscription_id,
            merchant_order_id,
            amount,
            gateway_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::{
        autopay_gateway::MockAutopayGateway,
        test_support::{FixedRates, InMemoryLedger, InMemorySubscriptions, subscription},
    };
    use crates::{
        domain::value_objects::enums::{autopay_frequencies::AutopayFrequency, metals::Metal},
        payments::autopay_client::{GatewayApiError, GatewayOrderResponse},
    };
    use serde_json::Value;

    struct Fixture {
        store: InMemorySubscriptions,
        ledger: InMemoryLedger,
    }

    impl Fixture {
        fn new(subscriptions: Vec<AutopaySubscriptionModel>) -> Self {
            Self {
                store: InMemorySubscriptions::with(subscriptions),
                ledger: InMemoryLedger::default(),
            }
        }

        fn usecase(&self, gateway: MockAutopayGateway) -> AutopayRedemptionUseCase {
            let crediting = MetalCreditingUseCase::new(
                Arc::new(self.ledger.clone()),
                Arc::new(FixedRates::default()),
            );
            AutopayRedemptionUseCase::new(
                Arc::new(self.store.clone()),
                Arc::new(gateway),
                Arc::new(crediting),
            )
        }
    }

    fn gateway_redeeming(state: &'static str) -> MockAutopayGateway {
        let mut gateway = MockAutopayGateway::new();
        gateway.expect_notify_redemption().times(1).returning(|request| {
            Ok(GatewayOrderResponse {
                order_id: Some(format!("N_{}", request.merchant_order_id)),
                state: Some("NOTIFIED".to_string()),
            })
        });
        gateway.expect_redeem().times(1).returning(move |order_id| {
            Ok(GatewayOrderResponse {
                order_id: Some(format!("OMO_{order_id}")),
                state: Some(state.to_string()),
            })
        });
        gateway
    }

    #[tokio::test]
    async fn completed_redemption_is_recorded_and_credited() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);
        let usecase = fixture.usecase(gateway_redeeming("completed"));

        let outcome = usecase
            .execute_redemption(
                user_id,
                sub.id,
                RedemptionRequest {
                    amount: Some(500.0),
                    note: None,
                },
            )
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.status, Some(RedemptionStatus::Completed));
        let order_id = outcome.merchant_order_id.clone().unwrap();
        assert!(order_id.starts_with("AP_RDM_"));

        let stored = fixture.store.get(sub.id);
        assert_eq!(stored.redemption_count(), 1);
        assert_eq!(stored.total_redemption_amount(), 500.0);
        assert!(stored.last_redemption_at.is_some());
        assert_eq!(
            fixture.ledger.order_ids(),
            vec![format!("AUTOPAY_{order_id}")]
        );
        assert!(fixture.ledger.balance(user_id, Metal::Gold) > 0.0);
    }

    #[tokio::test]
    async fn failed_redemption_is_recorded_without_credit() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);
        let usecase = fixture.usecase(gateway_redeeming("FAILED"));

        let outcome = usecase
            .execute_redemption(user_id, sub.id, RedemptionRequest::default())
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.status, Some(RedemptionStatus::Failed));
        let stored = fixture.store.get(sub.id);
        assert_eq!(stored.redemption_count(), 1);
        assert_eq!(stored.redemptions()[0].status, RedemptionStatus::Failed);
        assert_eq!(stored.total_redemption_amount(), 0.0);
        assert!(fixture.ledger.order_ids().is_empty());
    }

    #[tokio::test]
    async fn missing_state_is_recorded_as_pending() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_notify_redemption()
            .returning(|_| Ok(GatewayOrderResponse::default()));
        gateway
            .expect_redeem()
            .returning(|_| Ok(GatewayOrderResponse::default()));

        let outcome = fixture
            .usecase(gateway)
            .execute_redemption(user_id, sub.id, RedemptionRequest::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, Some(RedemptionStatus::Pending));
        assert!(fixture.ledger.order_ids().is_empty());
    }

    #[tokio::test]
    async fn request_path_rejects_paused_subscription_before_gateway() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Paused);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway.expect_notify_redemption().never();
        gateway.expect_redeem().never();

        let result = fixture
            .usecase(gateway)
            .execute_redemption(user_id, sub.id, RedemptionRequest::default())
            .await;

        assert!(matches!(result, Err(AutopayError::InvalidState(_))));
    }

    #[tokio::test]
    async fn other_users_subscription_is_not_found() {
        let sub = subscription(Uuid::new_v4(), AutopayFrequency::Monthly, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);

        let result = fixture
            .usecase(MockAutopayGateway::new())
            .execute_redemption(Uuid::new_v4(), sub.id, RedemptionRequest::default())
            .await;

        assert!(matches!(result, Err(AutopayError::NotFound(_))));
    }

    #[tokio::test]
    async fn amount_above_mandate_maximum_is_rejected() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);

        let result = fixture
            .usecase(MockAutopayGateway::new())
            .execute_redemption(
                user_id,
                sub.id,
                RedemptionRequest {
                    amount: Some(5_000.0),
                    note: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AutopayError::Validation(_))));
    }

    #[tokio::test]
    async fn headless_gateway_error_becomes_failed_outcome_without_entry() {
        let sub = subscription(Uuid::new_v4(), AutopayFrequency::Daily, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway.expect_notify_redemption().returning(|_| {
            Err(GatewayApiError {
                status: 500,
                code: None,
                message: "upstream unavailable".to_string(),
                body: Value::Null,
                context: "notify redemption".to_string(),
            }
            .into())
        });
        gateway.expect_redeem().never();

        let outcome = fixture
            .usecase(gateway)
            .execute_redemption_headless(sub.clone(), None, None)
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("upstream unavailable"));
        assert_eq!(fixture.store.get(sub.id).redemption_count(), 0);
    }

    #[tokio::test]
    async fn headless_rechecks_status() {
        let sub = subscription(Uuid::new_v4(), AutopayFrequency::Daily, AutopayStatus::Cancelled);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway.expect_notify_redemption().never();

        let outcome = fixture
            .usecase(gateway)
            .execute_redemption_headless(sub, None, None)
            .await;

        assert!(!outcome.success);
        assert!(outcome.merchant_order_id.is_none());
    }

    #[tokio::test]
    async fn notify_only_records_pending_entry() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::OnDemand, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway.expect_notify_redemption().times(1).returning(|_| {
            Ok(GatewayOrderResponse {
                order_id: Some("OMO_N1".to_string()),
                state: Some("NOTIFIED".to_string()),
            })
        });
        gateway.expect_redeem().never();

        let receipt = fixture
            .usecase(gateway)
            .notify_redemption(user_id, sub.id, RedemptionRequest::default())
            .await
            .unwrap();

        let stored = fixture.store.get(sub.id);
        let entry = stored.find_redemption(&receipt.merchant_order_id).unwrap();
        assert_eq!(entry.status, RedemptionStatus::Pending);
        assert_eq!(entry.amount, 500.0);
        assert!(fixture.ledger.order_ids().is_empty());
    }
}
