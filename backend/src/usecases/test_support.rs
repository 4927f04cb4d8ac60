//! Stateful in-memory stand-ins for the Postgres repositories.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use crates::domain::{
    entities::metal_transactions::MetalTransactionEntity,
    repositories::{
        autopay_subscriptions::AutopaySubscriptionRepository, metal_ledger::MetalLedgerRepository,
        metal_rates::MetalRateRepository,
    },
    value_objects::{
        autopay_subscriptions::{
            AutopaySubscriptionModel, NewAutopaySubscription, SubscriptionReferences,
        },
        enums::{
            amount_types::AmountType, autopay_frequencies::AutopayFrequency,
            autopay_statuses::AutopayStatus, metals::Metal,
        },
        metal_ledger::{LedgerCredit, LedgerCreditOutcome},
        payment_modes::PaymentMode,
    },
};
use uuid::Uuid;

pub const GOLD_RATE: f64 = 7_250.0;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 6, 0, 0).unwrap()
}

pub fn subscription(
    user_id: Uuid,
    frequency: AutopayFrequency,
    status: AutopayStatus,
) -> AutopaySubscriptionModel {
    let now = fixed_now();
    let suffix = Uuid::new_v4().simple().to_string();
    let mut model = AutopaySubscriptionModel::new_pending(
        NewAutopaySubscription {
            user_id,
            merchant_subscription_id: format!("AP_MS_{suffix}"),
            merchant_order_id: format!("AP_MO_{suffix}"),
            gateway_order_id: Some(format!("OMO_{suffix}")),
            metal: Metal::Gold,
            amount: 500.0,
            max_amount: 1_000.0,
            frequency,
            amount_type: AmountType::Fixed,
            payment_mode: PaymentMode::UpiIntent {
                target_app: "com.phonepe.app".to_string(),
            },
            expires_at: now + Duration::days(3650),
        },
        now,
    );
    if status != AutopayStatus::Pending {
        model.transition_to(status, now);
    }
    model
}

#[derive(Default, Clone)]
pub struct InMemorySubscriptions {
    rows: Arc<Mutex<HashMap<Uuid, AutopaySubscriptionModel>>>,
}

impl InMemorySubscriptions {
    pub fn with(subscriptions: Vec<AutopaySubscriptionModel>) -> Self {
        let store = Self::default();
        {
            let mut rows = store.rows.lock().unwrap();
            for sub in subscriptions {
                rows.insert(sub.id, sub);
            }
        }
        store
    }

    pub fn get(&self, id: Uuid) -> AutopaySubscriptionModel {
        self.rows.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn all(&self) -> Vec<AutopaySubscriptionModel> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    /// Overwrites a row, simulating another writer.
    pub fn put(&self, subscription: AutopaySubscriptionModel) {
        self.rows
            .lock()
            .unwrap()
            .insert(subscription.id, subscription);
    }
}

#[async_trait]
impl AutopaySubscriptionRepository for InMemorySubscriptions {
    async fn insert(&self, subscription: AutopaySubscriptionModel) -> Result<()> {
        self.put(subscription);
        Ok(())
    }

    async fn save(&self, subscription: &AutopaySubscriptionModel) -> Result<()> {
        self.put(subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AutopaySubscriptionModel>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_merchant_order_id(
        &self,
        merchant_order_id: &str,
    ) -> Result<Option<AutopaySubscriptionModel>> {
        Ok(self
            .all()
            .into_iter()
            .find(|sub| sub.merchant_order_id == merchant_order_id))
    }

    async fn find_by_references(
        &self,
        references: &SubscriptionReferences,
    ) -> Result<Option<AutopaySubscriptionModel>> {
        let rows = self.all();
        let by = |pred: &dyn Fn(&AutopaySubscriptionModel) -> bool| {
            rows.iter().find(|sub| pred(sub)).cloned()
        };

        if let Some(id) = references.merchant_subscription_id.as_deref() {
            if let Some(found) = by(&|sub| sub.merchant_subscription_id == id) {
                return Ok(Some(found));
            }
        }
        if let Some(id) = references.gateway_order_id.as_deref() {
            if let Some(found) = by(&|sub| sub.gateway_order_id.as_deref() == Some(id)) {
                return Ok(Some(found));
            }
        }
        if let Some(id) = references.gateway_subscription_id.as_deref() {
            if let Some(found) = by(&|sub| sub.gateway_subscription_id.as_deref() == Some(id)) {
                return Ok(Some(found));
            }
        }
        if let Some(id) = references.redemption_order_id.as_deref() {
            if let Some(found) = by(&|sub| sub.find_redemption(id).is_some()) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<AutopaySubscriptionModel>> {
        let mut rows: Vec<_> = self
            .all()
            .into_iter()
            .filter(|sub| sub.user_id == user_id)
            .collect();
        rows.sort_by_key(|sub| std::cmp::Reverse(sub.created_at));
        Ok(rows)
    }

    async fn list_holding_frequency_slot(
        &self,
        user_id: Uuid,
        frequency: AutopayFrequency,
    ) -> Result<Vec<AutopaySubscriptionModel>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|sub| {
                sub.user_id == user_id
                    && sub.frequency == frequency
                    && sub.status.holds_frequency_slot()
            })
            .collect())
    }

    async fn list_by_status_and_frequency(
        &self,
        status: AutopayStatus,
        frequency: AutopayFrequency,
    ) -> Result<Vec<AutopaySubscriptionModel>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|sub| sub.status == status && sub.frequency == frequency)
            .collect())
    }

    async fn list_page(
        &self,
        status: Option<AutopayStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<AutopaySubscriptionModel>, i64)> {
        let mut rows: Vec<_> = self
            .all()
            .into_iter()
            .filter(|sub| status.is_none_or(|status| sub.status == status))
            .collect();
        rows.sort_by_key(|sub| (std::cmp::Reverse(sub.created_at), sub.id));
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryLedger {
    transactions: Arc<Mutex<Vec<MetalTransactionEntity>>>,
    balances: Arc<Mutex<HashMap<(Uuid, Metal), f64>>>,
}

impl InMemoryLedger {
    pub fn balance(&self, user_id: Uuid, metal: Metal) -> f64 {
        self.balances
            .lock()
            .unwrap()
            .get(&(user_id, metal))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn order_ids(&self) -> Vec<String> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .map(|tx| tx.order_id.clone())
            .collect()
    }
}

#[async_trait]
impl MetalLedgerRepository for InMemoryLedger {
    async fn find_transaction_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<MetalTransactionEntity>> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .find(|tx| tx.order_id == order_id)
            .cloned())
    }

    async fn credit(&self, credit: LedgerCredit) -> Result<LedgerCreditOutcome> {
        let mut transactions = self.transactions.lock().unwrap();
        if let Some(existing) = transactions.iter().find(|tx| tx.order_id == credit.order_id) {
            return Ok(LedgerCreditOutcome::AlreadyCredited {
                grams: existing.grams,
                rate_per_gram: existing.rate_per_gram,
            });
        }
        transactions.push(MetalTransactionEntity {
            id: Uuid::new_v4(),
            user_id: credit.user_id,
            order_id: credit.order_id.clone(),
            metal: credit.metal.to_string(),
            transaction_type: "BUY".to_string(),
            source: credit.source.clone(),
            amount_rupees: credit.amount_rupees,
            grams: credit.grams,
            rate_per_gram: credit.rate_per_gram,
            status: "COMPLETED".to_string(),
            created_at: Utc::now(),
        });

        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry((credit.user_id, credit.metal)).or_insert(0.0);
        *balance += credit.grams;
        Ok(LedgerCreditOutcome::Credited {
            grams: credit.grams,
            rate_per_gram: credit.rate_per_gram,
            new_balance: *balance,
        })
    }
}

/// Rate oracle with fixed prices; `None` simulates an empty rate table.
#[derive(Clone)]
pub struct FixedRates {
    pub gold: Option<f64>,
    pub silver: Option<f64>,
}

impl Default for FixedRates {
    fn default() -> Self {
        Self {
            gold: Some(GOLD_RATE),
            silver: Some(92.0),
        }
    }
}

#[async_trait]
impl MetalRateRepository for FixedRates {
    async fn latest_rate(&self, metal: Metal) -> Result<Option<f64>> {
        Ok(match metal {
            Metal::Gold => self.gold,
            Metal::Silver => self.silver,
        })
    }

    async fn record_rate(&self, _metal: Metal, _price_per_gram: f64, _source: &str) -> Result<()> {
        Ok(())
    }
}
