use std::sync::Arc;

use crates::domain::{
    repositories::{metal_ledger::MetalLedgerRepository, metal_rates::MetalRateRepository},
    value_objects::{
        autopay_subscriptions::AutopaySubscriptionModel,
        enums::metals::Metal,
        metal_ledger::{CreditReceipt, LedgerCredit, LedgerCreditOutcome, grams_for_amount},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const AUTOPAY_CREDIT_SOURCE: &str = "AUTOPAY";

/// Ledger order id for an autopay credit. Redemptions seed with their merchant
/// order id, activations with [`activation_seed`].
pub fn autopay_credit_order_id(seed: &str) -> String {
    format!("AUTOPAY_{seed}")
}

pub fn activation_seed(merchant_subscription_id: &str) -> String {
    format!("ACTIVE_{merchant_subscription_id}")
}

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("invalid credit request: {0}")]
    InvalidRequest(String),
    #[error("no usable {0} rate is available")]
    RateUnavailable(Metal),
    #[error("amount {amount} buys no {metal} at {rate_per_gram} per gram")]
    ZeroGrams {
        metal: Metal,
        amount: f64,
        rate_per_gram: f64,
    },
    #[error(transparent)]
    Ledger(#[from] anyhow::Error),
}

/// Converts autopay debits into metal credits, at most once per order id.
pub struct MetalCreditingUseCase {
    ledger: Arc<dyn MetalLedgerRepository + Send + Sync>,
    rates: Arc<dyn MetalRateRepository + Send + Sync>,
}

impl MetalCreditingUseCase {
    pub fn new(
        ledger: Arc<dyn MetalLedgerRepository + Send + Sync>,
        rates: Arc<dyn MetalRateRepository + Send + Sync>,
    ) -> Self {
        Self { ledger, rates }
    }

    pub async fn credit_gold_on_autopay_redemption(
        &self,
        user_id: Uuid,
        metal: Metal,
        amount_rupees: f64,
        order_id_seed: &str,
    ) -> Result<CreditReceipt, CreditError> {
        if !amount_rupees.is_finite() || amount_rupees <= 0.0 {
            return Err(CreditError::InvalidRequest(format!(
                "amount must be positive, got {amount_rupees}"
            )));
        }
        let order_id = autopay_credit_order_id(order_id_seed);

        if let Some(existing) = self.ledger.find_transaction_by_order_id(&order_id).await? {
            info!(
                %user_id,
                order_id = %order_id,
                grams = existing.grams,
                "autopay: credit already recorded, skipping"
            );
            return Ok(CreditReceipt {
                order_id,
                metal,
                grams: existing.grams,
                rate_per_gram: existing.rate_per_gram,
                already_credited: true,
            });
        }

        let rate_per_gram = self
            .rates
            .latest_rate(metal)
            .await?
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .ok_or_else(|| {
                warn!(%user_id, order_id = %order_id, metal = %metal, "autopay: no usable rate, credit skipped");
                CreditError::RateUnavailable(metal)
            })?;

        let grams = grams_for_amount(amount_rupees, rate_per_gram);
        if grams <= 0.0 {
            return Err(CreditError::ZeroGrams {
                metal,
                amount: amount_rupees,
                rate_per_gram,
            });
        }

        let outcome = self
            .ledger
            .credit(LedgerCredit {
                user_id,
                order_id: order_id.clone(),
                metal,
                amount_rupees,
                grams,
                rate_per_gram,
                source: AUTOPAY_CREDIT_SOURCE.to_string(),
            })
            .await
            .map_err(|err| {
                error!(%user_id, order_id = %order_id, db_error = ?err, "autopay: ledger credit failed");
                CreditError::Ledger(err)
            })?;

        let receipt = match outcome {
            LedgerCreditOutcome::Credited {
                grams,
                rate_per_gram,
                new_balance,
            } => {
                info!(
                    %user_id,
                    order_id = %order_id,
                    metal = %metal,
                    grams,
                    rate_per_gram,
                    new_balance,
                    "autopay: metal credited"
                );
                CreditReceipt {
                    order_id,
                    metal,
                    grams,
                    rate_per_gram,
                    already_credited: false,
                }
            }
            LedgerCreditOutcome::AlreadyCredited {
                grams,
                rate_per_gram,
            } => {
                info!(%user_id, order_id = %order_id, "autopay: concurrent credit won the insert");
                CreditReceipt {
                    order_id,
                    metal,
                    grams,
                    rate_per_gram,
                    already_credited: true,
                }
            }
        };

        Ok(receipt)
    }

    /// One-time credit for the setup amount when a mandate first becomes ACTIVE.
    pub async fn credit_gold_when_subscription_activated(
        &self,
        subscription: &AutopaySubscriptionModel,
    ) -> Result<CreditReceipt, CreditError> {
        if subscription.user_id.is_nil() {
            return Err(CreditError::InvalidRequest(
                "subscription has no owner".to_string(),
            ));
        }
        if !subscription.amount.is_finite() || subscription.amount <= 0.0 {
            return Err(CreditError::InvalidRequest(format!(
                "subscription amount must be positive, got {}",
                subscription.amount
            )));
        }

        self.credit_gold_on_autopay_redemption(
            subscription.user_id,
            subscription.metal,
            subscription.amount,
            &activation_seed(&subscription.merchant_subscription_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{FixedRates, GOLD_RATE, InMemoryLedger, subscription};
    use crates::domain::{
        repositories::{metal_ledger::MockMetalLedgerRepository, metal_rates::MockMetalRateRepository},
        value_objects::enums::{
            autopay_frequencies::AutopayFrequency, autopay_statuses::AutopayStatus,
        },
    };

    fn usecase(ledger: &InMemoryLedger, rates: FixedRates) -> MetalCreditingUseCase {
        MetalCreditingUseCase::new(Arc::new(ledger.clone()), Arc::new(rates))
    }

    #[tokio::test]
    async fn same_order_id_is_credited_once() {
        let ledger = InMemoryLedger::default();
        let crediting = usecase(&ledger, FixedRates::default());
        let user_id = Uuid::new_v4();

        let first = crediting
            .credit_gold_on_autopay_redemption(user_id, Metal::Gold, 500.0, "AP_RDM_1")
            .await
            .unwrap();
        let second = crediting
            .credit_gold_on_autopay_redemption(user_id, Metal::Gold, 500.0, "AP_RDM_1")
            .await
            .unwrap();

        assert!(!first.already_credited);
        assert!(second.already_credited);
        assert_eq!(first.grams, second.grams);
        assert_eq!(first.order_id, "AUTOPAY_AP_RDM_1");
        assert_eq!(ledger.balance(user_id, Metal::Gold), grams_for_amount(500.0, GOLD_RATE));
        assert_eq!(ledger.order_ids(), vec!["AUTOPAY_AP_RDM_1".to_string()]);
    }

    #[tokio::test]
    async fn missing_rate_fails_without_crediting() {
        let ledger = InMemoryLedger::default();
        let crediting = usecase(
            &ledger,
            FixedRates {
                gold: None,
                silver: None,
            },
        );
        let user_id = Uuid::new_v4();

        let result = crediting
            .credit_gold_on_autopay_redemption(user_id, Metal::Gold, 500.0, "AP_RDM_2")
            .await;

        assert!(matches!(result, Err(CreditError::RateUnavailable(Metal::Gold))));
        assert!(ledger.order_ids().is_empty());
    }

    #[tokio::test]
    async fn non_positive_rate_is_treated_as_missing() {
        let crediting = usecase(
            &InMemoryLedger::default(),
            FixedRates {
                gold: Some(0.0),
                silver: None,
            },
        );

        let result = crediting
            .credit_gold_on_autopay_redemption(Uuid::new_v4(), Metal::Gold, 500.0, "AP_RDM_3")
            .await;
        assert!(matches!(result, Err(CreditError::RateUnavailable(_))));
    }

    #[tokio::test]
    async fn amounts_too_small_for_a_ten_thousandth_gram_are_rejected() {
        let crediting = usecase(&InMemoryLedger::default(), FixedRates::default());

        let result = crediting
            .credit_gold_on_autopay_redemption(Uuid::new_v4(), Metal::Gold, 0.1, "AP_RDM_4")
            .await;
        assert!(matches!(result, Err(CreditError::ZeroGrams { .. })));
    }

    #[tokio::test]
    async fn activation_credit_uses_its_own_namespace() {
        let ledger = InMemoryLedger::default();
        let crediting = usecase(&ledger, FixedRates::default());
        let sub = subscription(Uuid::new_v4(), AutopayFrequency::Monthly, AutopayStatus::Active);

        let receipt = crediting
            .credit_gold_when_subscription_activated(&sub)
            .await
            .unwrap();

        assert_eq!(
            receipt.order_id,
            format!("AUTOPAY_ACTIVE_{}", sub.merchant_subscription_id)
        );
    }

    #[tokio::test]
    async fn existing_transaction_short_circuits_before_rate_lookup() {
        let mut ledger = MockMetalLedgerRepository::new();
        let mut rates = MockMetalRateRepository::new();
        let user_id = Uuid::new_v4();

        ledger
            .expect_find_transaction_by_order_id()
            .withf(|order_id| order_id == "AUTOPAY_AP_RDM_5")
            .times(1)
            .returning(move |order_id| {
                Ok(Some(crates::domain::entities::metal_transactions::MetalTransactionEntity {
                    id: Uuid::new_v4(),
                    user_id,
                    order_id: order_id.to_string(),
                    metal: "GOLD".to_string(),
                    transaction_type: "BUY".to_string(),
                    source: AUTOPAY_CREDIT_SOURCE.to_string(),
                    amount_rupees: 500.0,
                    grams: 0.069,
                    rate_per_gram: GOLD_RATE,
                    status: "COMPLETED".to_string(),
                    created_at: chrono::Utc::now(),
                }))
            });
        ledger.expect_credit().never();
        rates.expect_latest_rate().never();

        let crediting = MetalCreditingUseCase::new(Arc::new(ledger), Arc::new(rates));
        let receipt = crediting
            .credit_gold_on_autopay_redemption(user_id, Metal::Gold, 500.0, "AP_RDM_5")
            .await
            .unwrap();

        assert!(receipt.already_credited);
        assert_eq!(receipt.grams, 0.069);
    }
}
