pub mod daily_autopay;
pub mod metal_prices;
