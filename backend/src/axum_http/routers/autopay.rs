use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::value_objects::autopay_subscriptions::{RedemptionRequest, SetupAutopayRequest};
use uuid::Uuid;

use crate::{auth::AuthUser, autopay_services::AutopayServices};

pub fn routes(services: Arc<AutopayServices>) -> Router {
    Router::new()
        .route("/setup", post(setup))
        .route("/subscriptions", get(list_subscriptions))
        .route("/order/:merchant_order_id/status", get(order_status))
        .route("/subscriptions/:id/status", get(subscription_status))
        .route("/subscriptions/:id/notify", post(notify))
        .route("/subscriptions/:id/redeem", post(redeem))
        .route("/subscriptions/:id/cancel", post(cancel))
        .route("/subscriptions/:id/pause", post(pause))
        .route("/subscriptions/:id/resume", post(resume))
        .route("/sync", post(sync))
        .with_state(services)
}

pub async fn setup(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Json(request): Json<SetupAutopayRequest>,
) -> impl IntoResponse {
    match services
        .subscriptions
        .setup_subscription(auth.user_id, request)
        .await
    {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_subscriptions(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
) -> impl IntoResponse {
    match services
        .subscriptions
        .get_user_subscriptions(auth.user_id)
        .await
    {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn order_status(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Path(merchant_order_id): Path<String>,
) -> impl IntoResponse {
    match services
        .subscriptions
        .check_order_status(auth.user_id, &merchant_order_id)
        .await
    {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn subscription_status(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match services
        .subscriptions
        .check_subscription_status(auth.user_id, id)
        .await
    {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn notify(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    request: Option<Json<RedemptionRequest>>,
) -> impl IntoResponse {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    match services
        .redemptions
        .notify_redemption(auth.user_id, id, request)
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn redeem(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    request: Option<Json<RedemptionRequest>>,
) -> impl IntoResponse {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    match services
        .redemptions
        .execute_redemption(auth.user_id, id, request)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match services
        .subscriptions
        .revoke_subscription(auth.user_id, id)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn pause(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match services
        .subscriptions
        .pause_subscription(auth.user_id, id)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn resume(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match services
        .subscriptions
        .unpause_subscription(auth.user_id, id)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn sync(
    State(services): State<Arc<AutopayServices>>,
    auth: AuthUser,
) -> impl IntoResponse {
    match services
        .subscriptions
        .sync_subscription_statuses(auth.user_id)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}
