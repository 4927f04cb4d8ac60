use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        autopay_subscriptions::{AutopaySubscriptionModel, RedemptionEntry},
        enums::{
            amount_types::AmountType, autopay_frequencies::AutopayFrequency,
            autopay_statuses::AutopayStatus, metals::Metal,
        },
        payment_modes::PaymentMode,
    },
    infra::db::postgres::schema::autopay_subscriptions,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = autopay_subscriptions)]
#[diesel(treat_none_as_null = true)]
pub struct AutopaySubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub merchant_subscription_id: String,
    pub gateway_subscription_id: Option<String>,
    pub merchant_order_id: String,
    pub gateway_order_id: Option<String>,
    pub metal: String,
    pub amount: f64,
    pub max_amount: f64,
    pub frequency: String,
    pub amount_type: String,
    pub payment_mode: serde_json::Value,
    pub status: String,
    pub activated_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub last_redemption_at: Option<DateTime<Utc>>,
    pub redemptions: serde_json::Value,
    pub redemption_count: i32,
    pub total_redemption_amount: f64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AutopaySubscriptionEntity> for AutopaySubscriptionModel {
    type Error = anyhow::Error;

    fn try_from(entity: AutopaySubscriptionEntity) -> Result<Self> {
        let id = entity.id;
        let metal = Metal::from_str(&entity.metal)
            .ok_or_else(|| anyhow!("subscription {id} has unknown metal {}", entity.metal))?;
        let frequency = AutopayFrequency::from_str(&entity.frequency).ok_or_else(|| {
            anyhow!("subscription {id} has unknown frequency {}", entity.frequency)
        })?;
        let amount_type = AmountType::from_str(&entity.amount_type).ok_or_else(|| {
            anyhow!("subscription {id} has unknown amount type {}", entity.amount_type)
        })?;
        let status = AutopayStatus::from_str(&entity.status)
            .ok_or_else(|| anyhow!("subscription {id} has unknown status {}", entity.status))?;
        let payment_mode: PaymentMode = serde_json::from_value(entity.payment_mode)
            .with_context(|| format!("subscription {id} has malformed payment_mode"))?;
        let redemptions: Vec<RedemptionEntry> = serde_json::from_value(entity.redemptions)
            .with_context(|| format!("subscription {id} has malformed redemption history"))?;
        let metadata = match entity.metadata {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        Ok(AutopaySubscriptionModel {
            id,
            user_id: entity.user_id,
            merchant_subscription_id: entity.merchant_subscription_id,
            gateway_subscription_id: entity.gateway_subscription_id,
            merchant_order_id: entity.merchant_order_id,
            gateway_order_id: entity.gateway_order_id,
            metal,
            amount: entity.amount,
            max_amount: entity.max_amount,
            frequency,
            amount_type,
            payment_mode,
            status,
            activated_at: entity.activated_at,
            paused_at: entity.paused_at,
            revoked_at: entity.revoked_at,
            cancelled_at: entity.cancelled_at,
            expires_at: entity.expires_at,
            last_redemption_at: entity.last_redemption_at,
            metadata,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            redemptions,
        })
    }
}

impl TryFrom<&AutopaySubscriptionModel> for AutopaySubscriptionEntity {
    type Error = anyhow::Error;

    /// Counters are always derived from the history being written.
    fn try_from(model: &AutopaySubscriptionModel) -> Result<Self> {
        Ok(AutopaySubscriptionEntity {
            id: model.id,
            user_id: model.user_id,
            merchant_subscription_id: model.merchant_subscription_id.clone(),
            gateway_subscription_id: model.gateway_subscription_id.clone(),
            merchant_order_id: model.merchant_order_id.clone(),
            gateway_order_id: model.gateway_order_id.clone(),
            metal: model.metal.to_string(),
            amount: model.amount,
            max_amount: model.max_amount,
            frequency: model.frequency.to_string(),
            amount_type: model.amount_type.to_string(),
            payment_mode: serde_json::to_value(&model.payment_mode)?,
            status: model.status.to_string(),
            activated_at: model.activated_at,
            paused_at: model.paused_at,
            revoked_at: model.revoked_at,
            cancelled_at: model.cancelled_at,
            expires_at: model.expires_at,
            last_redemption_at: model.last_redemption_at,
            redemptions: serde_json::to_value(model.redemptions())?,
            redemption_count: model.redemption_count(),
            total_redemption_amount: model.total_redemption_amount(),
            metadata: serde_json::Value::Object(model.metadata.clone()),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
