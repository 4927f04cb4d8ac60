pub mod autopay_subscriptions;
pub mod metal_rates;
pub mod metal_transactions;
