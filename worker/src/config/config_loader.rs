use anyhow::{Context, Result};
use backend::config::config_loader::get_autopay;
use chrono::NaiveTime;
use url::Url;

use super::config_model::{DailyAutopay, Database, DotEnvyConfig, MetalPrices};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let feed_url = std::env::var("METAL_PRICE_FEED_URL").expect("METAL_PRICE_FEED_URL is invalid");
    let metal_prices = MetalPrices {
        feed_url: Url::parse(&feed_url).context("METAL_PRICE_FEED_URL is invalid")?,
        fetch_interval_secs: std::env::var("METAL_PRICE_FETCH_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .context("METAL_PRICE_FETCH_INTERVAL_SECS is invalid")?,
        timeout_secs: std::env::var("METAL_PRICE_FEED_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .context("METAL_PRICE_FEED_TIMEOUT_SECS is invalid")?,
    };

    let hour: u32 = std::env::var("AUTOPAY_DAILY_RUN_HOUR_IST")
        .unwrap_or_else(|_| "9".to_string())
        .parse()
        .context("AUTOPAY_DAILY_RUN_HOUR_IST is invalid")?;
    let minute: u32 = std::env::var("AUTOPAY_DAILY_RUN_MINUTE_IST")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .context("AUTOPAY_DAILY_RUN_MINUTE_IST is invalid")?;
    let daily_autopay = DailyAutopay {
        run_at: NaiveTime::from_hms_opt(hour, minute, 0)
            .with_context(|| format!("daily autopay run time {hour:02}:{minute:02} is invalid"))?,
    };

    Ok(DotEnvyConfig {
        database,
        autopay: get_autopay()?,
        metal_prices,
        daily_autopay,
    })
}
