pub mod autopay_subscriptions;
pub mod autopay_webhook;
pub mod civil_time;
pub mod enums;
pub mod metal_ledger;
pub mod payment_modes;
