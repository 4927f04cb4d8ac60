pub mod autopay_subscriptions;
pub mod metal_ledger;
pub mod metal_rates;
