use std::sync::Arc;

use axum::{body::to_bytes, response::Response};
use crates::domain::value_objects::autopay_subscriptions::AutopaySubscriptionModel;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::UserClaims,
    autopay_services::{AutopayParts, AutopayServices},
    config::config_model::WebhookCredentials,
    usecases::{
        autopay_gateway::MockAutopayGateway,
        autopay_subscriptions::LifecycleSettings,
        test_support::{FixedRates, InMemoryLedger, InMemorySubscriptions},
    },
};

// Same value the auth tests use; tests share the process environment.
const JWT_SECRET: &str = "supersecretjwtsecretforunittesting123";

pub fn services_with(
    subscriptions: Vec<AutopaySubscriptionModel>,
    gateway: MockAutopayGateway,
) -> (Arc<AutopayServices>, InMemorySubscriptions) {
    services_with_webhook_auth(subscriptions, gateway, None)
}

pub fn services_with_webhook_auth(
    subscriptions: Vec<AutopaySubscriptionModel>,
    gateway: MockAutopayGateway,
    webhook_credentials: Option<WebhookCredentials>,
) -> (Arc<AutopayServices>, InMemorySubscriptions) {
    let store = InMemorySubscriptions::with(subscriptions);
    let services = AutopayServices::from_parts(AutopayParts {
        subscriptions: Arc::new(store.clone()),
        ledger: Arc::new(InMemoryLedger::default()),
        rates: Arc::new(FixedRates::default()),
        gateway: Arc::new(gateway),
        webhook_credentials,
        settings: LifecycleSettings::default(),
        alert_sink: None,
    });
    (Arc::new(services), store)
}

pub fn bearer_for(user_id: Uuid) -> String {
    unsafe {
        std::env::set_var("JWT_USER_SECRET", JWT_SECRET);
    }
    let claims = UserClaims {
        sub: user_id.to_string(),
        role: Some("customer".to_string()),
        exp: 9_999_999_999,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
