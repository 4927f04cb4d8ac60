use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::metal_transactions::MetalTransactionEntity,
    value_objects::metal_ledger::{LedgerCredit, LedgerCreditOutcome},
};

#[automock]
#[async_trait]
pub trait MetalLedgerRepository {
    async fn find_transaction_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<MetalTransactionEntity>>;

    /// Records the transaction and adds the grams to the user's balance, unless
    /// a transaction with the same order id already exists.
    async fn credit(&self, credit: LedgerCredit) -> Result<LedgerCreditOutcome>;
}
