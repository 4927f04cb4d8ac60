use backend::config::config_model::Autopay;
use chrono::NaiveTime;
use url::Url;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub autopay: Autopay,
    pub metal_prices: MetalPrices,
    pub daily_autopay: DailyAutopay,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct MetalPrices {
    pub feed_url: Url,
    pub fetch_interval_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DailyAutopay {
    /// Wall-clock time of the daily charge run, in IST.
    pub run_at: NaiveTime,
}
