use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
    routing::post,
};
use crates::domain::value_objects::autopay_webhook::{AutopayWebhookPayload, WebhookAck};
use tracing::warn;

use crate::autopay_services::AutopayServices;

pub fn routes(services: Arc<AutopayServices>) -> Router {
    Router::new()
        .route("/", post(receive))
        .with_state(services)
}

/// Gateway callbacks. Anything short of an internal failure is acknowledged
/// with 200 so the gateway does not retry.
pub async fn receive(
    State(services): State<Arc<AutopayServices>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Err(err) = services.webhook.authorize(authorization) {
        return err.into_response();
    }

    let payload: AutopayWebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, body_len = body.len(), "autopay: malformed webhook body");
            return (
                StatusCode::OK,
                Json(WebhookAck {
                    success: true,
                    event: String::new(),
                    handled: false,
                    subscription_id: None,
                    note: "malformed payload".to_string(),
                }),
            )
                .into_response();
        }
    };

    match services.webhook.handle_event(payload).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        axum_http::routers::test_support::{json_body, services_with, services_with_webhook_auth},
        config::config_model::WebhookCredentials,
        usecases::{autopay_gateway::MockAutopayGateway, test_support::subscription},
    };
    use axum::{body::Body, http::Request};
    use crates::domain::value_objects::enums::{
        autopay_frequencies::AutopayFrequency, autopay_statuses::AutopayStatus,
    };
    use sha2::{Digest, Sha256};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn post_webhook(body: String, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header("Content-Type", "application/json");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn setup_success_activates_subscription() {
        let sub = subscription(Uuid::new_v4(), AutopayFrequency::Monthly, AutopayStatus::Pending);
        let (services, store) = services_with(vec![sub.clone()], MockAutopayGateway::new());
        let body = format!(
            r#"{{"event":"SUBSCRIPTION_SETUP_SUCCESS","data":{{"merchantSubscriptionId":"{}","subscriptionId":"OMS_HOOK_1","state":"ACTIVE"}}}}"#,
            sub.merchant_subscription_id
        );

        let response = routes(services)
            .oneshot(post_webhook(body, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let ack = json_body(response).await;
        assert_eq!(ack["handled"], true);
        assert_eq!(store.get(sub.id).status, AutopayStatus::Active);
    }

    #[tokio::test]
    async fn fractional_amount_still_activates() {
        let sub = subscription(Uuid::new_v4(), AutopayFrequency::Monthly, AutopayStatus::Pending);
        let (services, store) = services_with(vec![sub.clone()], MockAutopayGateway::new());
        let body = format!(
            r#"{{"event":"SUBSCRIPTION_SETUP_SUCCESS","data":{{"merchantSubscriptionId":"{}","amount":500.0,"state":"ACTIVE"}}}}"#,
            sub.merchant_subscription_id
        );

        let response = routes(services)
            .oneshot(post_webhook(body, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let ack = json_body(response).await;
        assert_eq!(ack["handled"], true);
        assert_eq!(store.get(sub.id).status, AutopayStatus::Active);
    }

    #[tokio::test]
    async fn malformed_body_is_acknowledged() {
        let (services, _) = services_with(vec![], MockAutopayGateway::new());

        let response = routes(services)
            .oneshot(post_webhook("not json".to_string(), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["handled"], false);
    }

    #[tokio::test]
    async fn configured_credentials_are_enforced() {
        let credentials = WebhookCredentials {
            username: "merchant".to_string(),
            password: "s3cret".to_string(),
        };
        let valid = hex::encode(Sha256::digest(b"merchant:s3cret"));
        let body = r#"{"event":"SUBSCRIPTION_CANCELLED","data":{}}"#.to_string();

        let (services, _) = services_with_webhook_auth(
            vec![],
            MockAutopayGateway::new(),
            Some(credentials),
        );
        let router = routes(services);

        let rejected = router
            .clone()
            .oneshot(post_webhook(body.clone(), Some("wrong")))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let accepted = router
            .oneshot(post_webhook(body, Some(&valid)))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
    }
}
