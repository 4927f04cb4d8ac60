use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{app_users, metal_transactions},
    },
};
use domain::{
    entities::metal_transactions::{InsertMetalTransactionEntity, MetalTransactionEntity},
    repositories::metal_ledger::MetalLedgerRepository,
    value_objects::{
        enums::metals::Metal,
        metal_ledger::{LedgerCredit, LedgerCreditOutcome},
    },
};

const TRANSACTION_TYPE_BUY: &str = "BUY";
const TRANSACTION_STATUS_COMPLETED: &str = "COMPLETED";

pub struct MetalLedgerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl MetalLedgerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl MetalLedgerRepository for MetalLedgerPostgres {
    async fn find_transaction_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<MetalTransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let transaction = metal_transactions::table
            .filter(metal_transactions::order_id.eq(order_id))
            .select(MetalTransactionEntity::as_select())
            .first::<MetalTransactionEntity>(&mut conn)
            .optional()?;

        Ok(transaction)
    }

    async fn credit(&self, credit: LedgerCredit) -> Result<LedgerCreditOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = InsertMetalTransactionEntity {
            user_id: credit.user_id,
            order_id: credit.order_id.clone(),
            metal: credit.metal.to_string(),
            transaction_type: TRANSACTION_TYPE_BUY.to_string(),
            source: credit.source.clone(),
            amount_rupees: credit.amount_rupees,
            grams: credit.grams,
            rate_per_gram: credit.rate_per_gram,
            status: TRANSACTION_STATUS_COMPLETED.to_string(),
        };

        conn.transaction::<_, anyhow::Error, _>(|conn| {
            // The unique index on order_id is the final guard against a double credit.
            let inserted = insert_into(metal_transactions::table)
                .values(&row)
                .on_conflict(metal_transactions::order_id)
                .do_nothing()
                .execute(conn)?;

            if inserted == 0 {
                let existing = metal_transactions::table
                    .filter(metal_transactions::order_id.eq(&credit.order_id))
                    .select(MetalTransactionEntity::as_select())
                    .first::<MetalTransactionEntity>(conn)?;
                return Ok(LedgerCreditOutcome::AlreadyCredited {
                    grams: existing.grams,
                    rate_per_gram: existing.rate_per_gram,
                });
            }

            let user = app_users::table.find(credit.user_id);
            let new_balance = match credit.metal {
                Metal::Gold => update(user)
                    .set((
                        app_users::gold_balance_grams
                            .eq(app_users::gold_balance_grams + credit.grams),
                        app_users::updated_at.eq(Utc::now()),
                    ))
                    .returning(app_users::gold_balance_grams)
                    .get_result::<f64>(conn)?,
                Metal::Silver => update(user)
                    .set((
                        app_users::silver_balance_grams
                            .eq(app_users::silver_balance_grams + credit.grams),
                        app_users::updated_at.eq(Utc::now()),
                    ))
                    .returning(app_users::silver_balance_grams)
                    .get_result::<f64>(conn)?,
            };

            Ok(LedgerCreditOutcome::Credited {
                grams: credit.grams,
                rate_per_gram: credit.rate_per_gram,
                new_balance,
            })
        })
    }
}
