use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    autopay_subscriptions::{AutopaySubscriptionModel, SubscriptionReferences},
    enums::{autopay_frequencies::AutopayFrequency, autopay_statuses::AutopayStatus},
};

/// Subscription documents. Every mutation is a full-document save
/// (last write wins between concurrent savers).
#[automock]
#[async_trait]
pub trait AutopaySubscriptionRepository {
    async fn insert(&self, subscription: AutopaySubscriptionModel) -> Result<()>;

    async fn save(&self, subscription: &AutopaySubscriptionModel) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AutopaySubscriptionModel>>;

    async fn find_by_merchant_order_id(
        &self,
        merchant_order_id: &str,
    ) -> Result<Option<AutopaySubscriptionModel>>;

    /// Tries merchant subscription id, then gateway order id, then gateway
    /// subscription id, then a redemption's merchant order id.
    async fn find_by_references(
        &self,
        references: &SubscriptionReferences,
    ) -> Result<Option<AutopaySubscriptionModel>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<AutopaySubscriptionModel>>;

    /// ACTIVE or PENDING subscriptions of `user_id` with `frequency`.
    async fn list_holding_frequency_slot(
        &self,
        user_id: Uuid,
        frequency: AutopayFrequency,
    ) -> Result<Vec<AutopaySubscriptionModel>>;

    async fn list_by_status_and_frequency(
        &self,
        status: AutopayStatus,
        frequency: AutopayFrequency,
    ) -> Result<Vec<AutopaySubscriptionModel>>;

    async fn list_page(
        &self,
        status: Option<AutopayStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<AutopaySubscriptionModel>, i64)>;
}
