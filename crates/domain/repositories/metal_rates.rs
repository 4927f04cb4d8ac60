use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::enums::metals::Metal;

#[automock]
#[async_trait]
pub trait MetalRateRepository {
    /// Latest known price per gram, in rupees.
    async fn latest_rate(&self, metal: Metal) -> Result<Option<f64>>;

    async fn record_rate(&self, metal: Metal, price_per_gram: f64, source: &str) -> Result<()>;
}
