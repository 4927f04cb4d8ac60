use anyhow::Result;
use backend::{autopay_services::AutopayServices, config::config_loader::get_stage};
use crates::{
    infra::{
        db::{postgres::postgres_connection, repositories::metal_rates::MetalRatePostgres},
        metal_price_feed::MetalPriceFeedClient,
    },
    observability,
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use worker::{
    config::config_loader,
    schedulers::{daily_autopay::DailyAutopayScheduler, metal_prices::MetalPriceScheduler},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("worker")?;

    let dotenvy_env = config_loader::load()?;
    info!(stage = %get_stage(), "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    let db_pool_arc = Arc::new(postgres_pool);
    info!("Postgres connection has been established");

    let alert_sink = observability::alert_sink_from_env("worker")?;
    let services =
        AutopayServices::build(&dotenvy_env.autopay, Arc::clone(&db_pool_arc), alert_sink)?;

    let feed = MetalPriceFeedClient::new(
        dotenvy_env.metal_prices.feed_url.clone(),
        Duration::from_secs(dotenvy_env.metal_prices.timeout_secs),
    )?;
    let metal_prices = Arc::new(MetalPriceScheduler::new(
        Arc::new(feed),
        Arc::new(MetalRatePostgres::new(Arc::clone(&db_pool_arc))),
        Duration::from_secs(dotenvy_env.metal_prices.fetch_interval_secs),
    ));
    let daily_autopay = Arc::new(DailyAutopayScheduler::new(
        Arc::clone(&services.daily),
        dotenvy_env.daily_autopay.run_at,
    ));

    let metal_price_loop = tokio::spawn(async move { metal_prices.run().await });
    let daily_autopay_loop = tokio::spawn(async move { daily_autopay.run().await });

    tokio::select! {
        result = metal_price_loop => result??,
        result = daily_autopay_loop => result??,
    };
    Ok(())
}
