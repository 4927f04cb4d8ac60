use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::metal_rates},
};
use domain::{
    entities::metal_rates::InsertMetalRateEntity,
    repositories::metal_rates::MetalRateRepository, value_objects::enums::metals::Metal,
};

pub struct MetalRatePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl MetalRatePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl MetalRateRepository for MetalRatePostgres {
    async fn latest_rate(&self, metal: Metal) -> Result<Option<f64>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rate = metal_rates::table
            .filter(metal_rates::metal.eq(metal.to_string()))
            .order(metal_rates::fetched_at.desc())
            .select(metal_rates::price_per_gram)
            .first::<f64>(&mut conn)
            .optional()?;

        Ok(rate)
    }

    async fn record_rate(&self, metal: Metal, price_per_gram: f64, source: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(metal_rates::table)
            .values(&InsertMetalRateEntity {
                metal: metal.to_string(),
                price_per_gram,
                source: source.to_string(),
            })
            .execute(&mut conn)?;

        Ok(())
    }
}
