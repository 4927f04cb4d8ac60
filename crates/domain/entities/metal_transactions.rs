use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::metal_transactions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = metal_transactions)]
pub struct MetalTransactionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: String,
    pub metal: String,
    pub transaction_type: String,
    pub source: String,
    pub amount_rupees: f64,
    pub grams: f64,
    pub rate_per_gram: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = metal_transactions)]
pub struct InsertMetalTransactionEntity {
    pub user_id: Uuid,
    pub order_id: String,
    pub metal: String,
    pub transaction_type: String,
    pub source: String,
    pub amount_rupees: f64,
    pub grams: f64,
    pub rate_per_gram: f64,
    pub status: String,
}
