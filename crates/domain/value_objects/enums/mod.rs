pub mod amount_types;
pub mod autopay_frequencies;
pub mod autopay_statuses;
pub mod gateway_environments;
pub mod metals;
pub mod redemption_statuses;
