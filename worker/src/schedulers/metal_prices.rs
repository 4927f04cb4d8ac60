use anyhow::Result;
use async_trait::async_trait;
use crates::{
    domain::{repositories::metal_rates::MetalRateRepository, value_objects::enums::metals::Metal},
    infra::metal_price_feed::{MetalPriceFeedClient, MetalPriceQuote},
};
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFeed {
    fn source(&self) -> String;

    async fn fetch_quote(&self) -> Result<MetalPriceQuote>;
}

#[async_trait]
impl PriceFeed for MetalPriceFeedClient {
    fn source(&self) -> String {
        MetalPriceFeedClient::source(self).to_string()
    }

    async fn fetch_quote(&self) -> Result<MetalPriceQuote> {
        MetalPriceFeedClient::fetch_quote(self).await
    }
}

/// Keeps `metal_rates` fresh for gold crediting. Built once in `main` and
/// shared by reference; there is no process-wide "started" flag.
pub struct MetalPriceScheduler {
    feed: Arc<dyn PriceFeed + Send + Sync>,
    rates: Arc<dyn MetalRateRepository + Send + Sync>,
    interval: Duration,
}

impl MetalPriceScheduler {
    pub fn new(
        feed: Arc<dyn PriceFeed + Send + Sync>,
        rates: Arc<dyn MetalRateRepository + Send + Sync>,
        interval: Duration,
    ) -> Self {
        Self {
            feed,
            rates,
            interval,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!(
            interval_secs = self.interval.as_secs(),
            "metal_prices: starting fetch loop"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.fetch_now().await {
                error!(error = %e, "metal_prices: fetch failed");
            }
        }
    }

    pub async fn fetch_now(&self) -> Result<MetalPriceQuote> {
        let quote = self.feed.fetch_quote().await?;
        let source = self.feed.source();

        for metal in [Metal::Gold, Metal::Silver] {
            self.rates
                .record_rate(metal, quote.price_of(metal), &source)
                .await?;
        }

        info!(
            gold_per_gram = quote.gold_per_gram,
            silver_per_gram = quote.silver_per_gram,
            source = %source,
            "metal_prices: rates recorded"
        );
        Ok(quote)
    }
}
