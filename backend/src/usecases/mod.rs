pub mod autopay_errors;
pub mod autopay_gateway;
pub mod autopay_redemptions;
pub mod autopay_subscriptions;
pub mod autopay_webhook;
pub mod daily_autopay;
pub mod metal_crediting;

#[cfg(test)]
pub mod test_support;
