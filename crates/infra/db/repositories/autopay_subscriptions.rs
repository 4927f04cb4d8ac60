use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::autopay_subscriptions},
};
use domain::{
    entities::autopay_subscriptions::AutopaySubscriptionEntity,
    repositories::autopay_subscriptions::AutopaySubscriptionRepository,
    value_objects::{
        autopay_subscriptions::{AutopaySubscriptionModel, SubscriptionReferences},
        enums::{autopay_frequencies::AutopayFrequency, autopay_statuses::AutopayStatus},
    },
};

pub struct AutopaySubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AutopaySubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn into_models(entities: Vec<AutopaySubscriptionEntity>) -> Result<Vec<AutopaySubscriptionModel>> {
    entities
        .into_iter()
        .map(AutopaySubscriptionModel::try_from)
        .collect()
}

#[async_trait]
impl AutopaySubscriptionRepository for AutopaySubscriptionPostgres {
    async fn insert(&self, subscription: AutopaySubscriptionModel) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let entity = AutopaySubscriptionEntity::try_from(&subscription)?;

        insert_into(autopay_subscriptions::table)
            .values(&entity)
            .execute(&mut conn)?;

        Ok(())
    }

    async fn save(&self, subscription: &AutopaySubscriptionModel) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let entity = AutopaySubscriptionEntity::try_from(subscription)?;

        update(autopay_subscriptions::table.find(entity.id))
            .set(&entity)
            .execute(&mut conn)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AutopaySubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entity = autopay_subscriptions::table
            .find(id)
            .select(AutopaySubscriptionEntity::as_select())
            .first::<AutopaySubscriptionEntity>(&mut conn)
            .optional()?;

        entity.map(AutopaySubscriptionModel::try_from).transpose()
    }

    async fn find_by_merchant_order_id(
        &self,
        merchant_order_id: &str,
    ) -> Result<Option<AutopaySubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entity = autopay_subscriptions::table
            .filter(autopay_subscriptions::merchant_order_id.eq(merchant_order_id))
            .select(AutopaySubscriptionEntity::as_select())
            .first::<AutopaySubscriptionEntity>(&mut conn)
            .optional()?;

        entity.map(AutopaySubscriptionModel::try_from).transpose()
    }

    async fn find_by_references(
        &self,
        references: &SubscriptionReferences,
    ) -> Result<Option<AutopaySubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        if let Some(id) = references.merchant_subscription_id.as_deref() {
            let found = autopay_subscriptions::table
                .filter(autopay_subscriptions::merchant_subscription_id.eq(id))
                .select(AutopaySubscriptionEntity::as_select())
                .first::<AutopaySubscriptionEntity>(&mut conn)
                .optional()?;
            if let Some(entity) = found {
                return Ok(Some(entity.try_into()?));
            }
        }

        if let Some(id) = references.gateway_order_id.as_deref() {
            let found = autopay_subscriptions::table
                .filter(autopay_subscriptions::gateway_order_id.eq(id))
                .select(AutopaySubscriptionEntity::as_select())
                .first::<AutopaySubscriptionEntity>(&mut conn)
                .optional()?;
            if let Some(entity) = found {
                return Ok(Some(entity.try_into()?));
            }
        }

        if let Some(id) = references.gateway_subscription_id.as_deref() {
            let found = autopay_subscriptions::table
                .filter(autopay_subscriptions::gateway_subscription_id.eq(id))
                .select(AutopaySubscriptionEntity::as_select())
                .first::<AutopaySubscriptionEntity>(&mut conn)
                .optional()?;
            if let Some(entity) = found {
                return Ok(Some(entity.try_into()?));
            }
        }

        if let Some(id) = references.redemption_order_id.as_deref() {
            let found = autopay_subscriptions::table
                .filter(
                    autopay_subscriptions::redemptions
                        .contains(json!([{ "merchant_order_id": id }])),
                )
                .select(AutopaySubscriptionEntity::as_select())
                .first::<AutopaySubscriptionEntity>(&mut conn)
                .optional()?;
            if let Some(entity) = found {
                return Ok(Some(entity.try_into()?));
            }
        }

        Ok(None)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<AutopaySubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entities = autopay_subscriptions::table
            .filter(autopay_subscriptions::user_id.eq(user_id))
            .order(autopay_subscriptions::created_at.desc())
            .select(AutopaySubscriptionEntity::as_select())
            .load::<AutopaySubscriptionEntity>(&mut conn)?;

        into_models(entities)
    }

    async fn list_holding_frequency_slot(
        &self,
        user_id: Uuid,
        frequency: AutopayFrequency,
    ) -> Result<Vec<AutopaySubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let holding: Vec<String> = AutopayStatus::ALL
            .iter()
            .filter(|status| status.holds_frequency_slot())
            .map(|status| status.to_string())
            .collect();

        let entities = autopay_subscriptions::table
            .filter(autopay_subscriptions::user_id.eq(user_id))
            .filter(autopay_subscriptions::frequency.eq(frequency.to_string()))
            .filter(autopay_subscriptions::status.eq_any(holding))
            .select(AutopaySubscriptionEntity::as_select())
            .load::<AutopaySubscriptionEntity>(&mut conn)?;

        into_models(entities)
    }

    async fn list_by_status_and_frequency(
        &self,
        status: AutopayStatus,
        frequency: AutopayFrequency,
    ) -> Result<Vec<AutopaySubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entities = autopay_subscriptions::table
            .filter(autopay_subscriptions::status.eq(status.to_string()))
            .filter(autopay_subscriptions::frequency.eq(frequency.to_string()))
            .order(autopay_subscriptions::created_at.asc())
            .select(AutopaySubscriptionEntity::as_select())
            .load::<AutopaySubscriptionEntity>(&mut conn)?;

        into_models(entities)
    }

    async fn list_page(
        &self,
        status: Option<AutopayStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<AutopaySubscriptionModel>, i64)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut count_query = autopay_subscriptions::table.into_boxed();
        let mut page_query = autopay_subscriptions::table.into_boxed();
        if let Some(status) = status {
            count_query = count_query.filter(autopay_subscriptions::status.eq(status.to_string()));
            page_query = page_query.filter(autopay_subscriptions::status.eq(status.to_string()));
        }

        let total = count_query.count().get_result::<i64>(&mut conn)?;
        let entities = page_query
            .order(autopay_subscriptions::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(AutopaySubscriptionEntity::as_select())
            .load::<AutopaySubscriptionEntity>(&mut conn)?;

        Ok((into_models(entities)?, total))
    }
}
