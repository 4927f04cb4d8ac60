use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::metal_rates;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = metal_rates)]
pub struct MetalRateEntity {
    pub id: Uuid,
    pub metal: String,
    pub price_per_gram: f64,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = metal_rates)]
pub struct InsertMetalRateEntity {
    pub metal: String,
    pub price_per_gram: f64,
    pub source: String,
}
