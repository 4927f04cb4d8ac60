pub mod autopay;
pub mod autopay_webhook;
pub mod internal_autopay;

#[cfg(test)]
mod test_support;
