use anyhow::{Result, bail};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::domain::value_objects::enums::metals::Metal;

/// Spot prices per gram, in rupees, as published by the price feed.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalPriceQuote {
    #[serde(alias = "gold")]
    pub gold_per_gram: f64,
    #[serde(alias = "silver")]
    pub silver_per_gram: f64,
}

impl MetalPriceQuote {
    pub fn price_of(&self, metal: Metal) -> f64 {
        match metal {
            Metal::Gold => self.gold_per_gram,
            Metal::Silver => self.silver_per_gram,
        }
    }
}

pub struct MetalPriceFeedClient {
    http: Client,
    feed_url: Url,
}

impl MetalPriceFeedClient {
    pub fn new(feed_url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, feed_url })
    }

    pub fn source(&self) -> &str {
        self.feed_url.host_str().unwrap_or("metal-price-feed")
    }

    pub async fn fetch_quote(&self) -> Result<MetalPriceQuote> {
        let response = self.http.get(self.feed_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("metal price feed returned status {status}");
        }

        let quote: MetalPriceQuote = response.json().await?;
        for metal in [Metal::Gold, Metal::Silver] {
            let price = quote.price_of(metal);
            if !price.is_finite() || price <= 0.0 {
                bail!("metal price feed returned an unusable {metal} price: {price}");
            }
        }

        Ok(quote)
    }
}
