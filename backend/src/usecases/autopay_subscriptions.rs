use std::sync::Arc;

use chrono::{Duration, Utc};
use crates::{
    domain::{
        repositories::autopay_subscriptions::AutopaySubscriptionRepository,
        value_objects::{
            autopay_subscriptions::{
                AdminListQuery, AdminSubscriptionPage, AutopaySubscriptionDto,
                AutopaySubscriptionModel, NewAutopaySubscription, SetupAutopayRequest,
                SetupAutopayResponse, StatusChange, StatusCheckResponse, StatusSource,
                SyncSummary,
            },
            enums::{
                amount_types::AmountType, autopay_frequencies::AutopayFrequency,
                autopay_statuses::AutopayStatus, metals::Metal,
            },
        },
    },
    payments::autopay_client::{MandateSetupRequest, gateway_error_of},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    autopay_errors::{AutopayError, UseCaseResult},
    autopay_gateway::AutopayGateway,
    metal_crediting::MetalCreditingUseCase,
};

const ADMIN_DEFAULT_LIMIT: i64 = 20;
const ADMIN_MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    pub mandate_validity_days: i64,
    /// How long the customer has to authorise the setup order.
    pub setup_order_expiry_minutes: i64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            mandate_validity_days: 3650,
            setup_order_expiry_minutes: 10,
        }
    }
}

#[derive(Debug, Error)]
enum ReconcileError {
    #[error("gateway status lookup failed: {0}")]
    Gateway(anyhow::Error),
    #[error("failed to persist reconciled subscription: {0}")]
    Store(anyhow::Error),
}

impl ReconcileError {
    fn not_yet_resolvable(&self) -> bool {
        match self {
            ReconcileError::Gateway(err) => {
                gateway_error_of(err).is_some_and(|api| api.is_not_resolvable())
            }
            ReconcileError::Store(_) => false,
        }
    }
}

struct Reconciled {
    gateway_state: Option<String>,
    change: StatusChange,
    learned_gateway_id: bool,
}

#[derive(Debug, Clone, Copy)]
enum PauseAction {
    Pause,
    Resume,
}

impl PauseAction {
    fn required(&self) -> AutopayStatus {
        match self {
            PauseAction::Pause => AutopayStatus::Active,
            PauseAction::Resume => AutopayStatus::Paused,
        }
    }

    fn target(&self) -> AutopayStatus {
        match self {
            PauseAction::Pause => AutopayStatus::Paused,
            PauseAction::Resume => AutopayStatus::Active,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            PauseAction::Pause => "pause",
            PauseAction::Resume => "resume",
        }
    }
}

/// Mandate lifecycle: setup, status reconciliation and user-driven transitions.
pub struct AutopaySubscriptionUseCase {
    subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
    gateway: Arc<dyn AutopayGateway>,
    crediting: Arc<MetalCreditingUseCase>,
    settings: LifecycleSettings,
}

impl AutopaySubscriptionUseCase {
    pub fn new(
        subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
        gateway: Arc<dyn AutopayGateway>,
        crediting: Arc<MetalCreditingUseCase>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            subscriptions,
            gateway,
            crediting,
            settings,
        }
    }

    pub async fn setup_subscription(
        &self,
        user_id: Uuid,
        request: SetupAutopayRequest,
    ) -> UseCaseResult<SetupAutopayResponse> {
        let amount = request.amount;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AutopayError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        let frequency = AutopayFrequency::from_str(&request.frequency).ok_or_else(|| {
            AutopayError::Validation(format!("unsupported frequency: {}", request.frequency))
        })?;
        let amount_type = match request.amount_type.as_deref() {
            Some(value) => AmountType::from_str(value).ok_or_else(|| {
                AutopayError::Validation(format!("unsupported amountType: {value}"))
            })?,
            None => AmountType::default(),
        };
        let metal = match request.metal.as_deref() {
            Some(value) => Metal::from_str(value)
                .ok_or_else(|| AutopayError::Validation(format!("unsupported metal: {value}")))?,
            None => Metal::default(),
        };
        let max_amount = request.max_amount.unwrap_or(amount);
        if !max_amount.is_finite() || max_amount < amount {
            return Err(AutopayError::Validation(
                "maxAmount must be at least amount".to_string(),
            ));
        }
        request
            .payment_mode
            .validate()
            .map_err(AutopayError::Validation)?;

        if frequency.is_exclusive() {
            self.release_frequency_slot(user_id, frequency).await?;
        }

        let now = Utc::now();
        let merchant_order_id = format!("AP_MO_{}", Uuid::new_v4().simple());
        let merchant_subscription_id = format!("AP_MS_{}", Uuid::new_v4().simple());
        let mandate_expire_at = now + Duration::days(self.settings.mandate_validity_days);

        info!(
            %user_id,
            merchant_subscription_id = %merchant_subscription_id,
            merchant_order_id = %merchant_order_id,
            amount,
            frequency = %frequency,
            payment_mode = request.payment_mode.label(),
            "autopay: requesting mandate setup"
        );

        let setup = self
            .gateway
            .setup_mandate(&MandateSetupRequest {
                merchant_order_id: merchant_order_id.clone(),
                merchant_subscription_id: merchant_subscription_id.clone(),
                amount,
                max_amount,
                amount_type,
                frequency,
                payment_mode: request.payment_mode.clone(),
                order_expire_at: now + Duration::minutes(self.settings.setup_order_expiry_minutes),
                mandate_expire_at,
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    merchant_subscription_id = %merchant_subscription_id,
                    error = ?err,
                    "autopay: mandate setup failed"
                );
                AutopayError::gateway(err)
            })?;

        let subscription = AutopaySubscriptionModel::new_pending(
            NewAutopaySubscription {
                user_id,
                merchant_subscription_id: merchant_subscription_id.clone(),
                merchant_order_id: merchant_order_id.clone(),
                gateway_order_id: setup.order_id.clone(),
                metal,
                amount,
                max_amount,
                frequency,
                amount_type,
                payment_mode: request.payment_mode,
                expires_at: mandate_expire_at,
            },
            now,
        );
        let subscription_id = subscription.id;

        self.subscriptions
            .insert(subscription)
            .await
            .map_err(|err| {
                error!(%user_id, merchant_subscription_id = %merchant_subscription_id, db_error = ?err, "autopay: failed to persist subscription");
                AutopayError::Internal(err)
            })?;

        info!(
            %user_id,
            %subscription_id,
            merchant_subscription_id = %merchant_subscription_id,
            gateway_order_id = ?setup.order_id,
            gateway_state = ?setup.state,
            "autopay: subscription created"
        );

        Ok(SetupAutopayResponse {
            subscription_id,
            merchant_subscription_id,
            merchant_order_id,
            status: AutopayStatus::Pending,
            gateway: setup.raw,
        })
    }

    /// Cancels every ACTIVE/PENDING mandate the user holds for `frequency`.
    /// The upstream cancel is best effort; the local cancel always happens.
    async fn release_frequency_slot(
        &self,
        user_id: Uuid,
        frequency: AutopayFrequency,
    ) -> UseCaseResult<()> {
        let holders = self
            .subscriptions
            .list_holding_frequency_slot(user_id, frequency)
            .await
            .map_err(AutopayError::Internal)?;

        for mut existing in holders {
            let gateway_cancel = match self
                .gateway
                .cancel(&existing.merchant_subscription_id)
                .await
            {
                Ok(()) => "CANCELLED".to_string(),
                Err(err) => {
                    warn!(
                        %user_id,
                        subscription_id = %existing.id,
                        status = %existing.status,
                        error = %err,
                        "autopay: upstream cancel failed while replacing subscription"
                    );
                    format!("FAILED: {err}")
                }
            };

            let now = Utc::now();
            existing.transition_to(AutopayStatus::Cancelled, now);
            existing.note(
                "cancelReason",
                format!("replaced by a new {frequency} subscription"),
            );
            existing.note("gatewayCancel", gateway_cancel);
            self.subscriptions
                .save(&existing)
                .await
                .map_err(AutopayError::Internal)?;

            info!(
                %user_id,
                subscription_id = %existing.id,
                frequency = %frequency,
                "autopay: previous subscription cancelled"
            );
        }
        Ok(())
    }

    async fn load_owned(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> UseCaseResult<AutopaySubscriptionModel> {
        self.subscriptions
            .find_by_id(subscription_id)
            .await
            .map_err(AutopayError::Internal)?
            .filter(|sub| sub.user_id == user_id)
            .ok_or(AutopayError::NotFound("subscription"))
    }

    async fn reconcile(
        &self,
        subscription: &mut AutopaySubscriptionModel,
    ) -> Result<Reconciled, ReconcileError> {
        let status = match subscription.status_source() {
            StatusSource::Order { merchant_order_id } => {
                self.gateway.order_status(&merchant_order_id).await
            }
            StatusSource::Mandate {
                gateway_subscription_id,
            } => self.gateway.subscription_status(&gateway_subscription_id).await,
        }
        .map_err(ReconcileError::Gateway)?;

        let learned_gateway_id =
            subscription.learn_gateway_subscription_id(status.subscription_id.as_deref());
        let gateway_state = status.state.clone();

        let change = match gateway_state
            .as_deref()
            .and_then(AutopayStatus::from_gateway_state)
        {
            Some(observed) => subscription.apply_gateway_status(observed, Utc::now()),
            None => {
                warn!(
                    subscription_id = %subscription.id,
                    gateway_state = ?gateway_state,
                    "autopay: ignoring unrecognised gateway state"
                );
                StatusChange::Unchanged
            }
        };

        if let StatusChange::Rejected { current, observed } = change {
            info!(
                subscription_id = %subscription.id,
                current = %current,
                observed = %observed,
                "autopay: gateway status not applied"
            );
        }

        if change.changed() || learned_gateway_id {
            self.subscriptions
                .save(subscription)
                .await
                .map_err(ReconcileError::Store)?;
        }

        if change.is_activation() {
            self.credit_activation(subscription).await;
        }

        Ok(Reconciled {
            gateway_state,
            change,
            learned_gateway_id,
        })
    }

    async fn credit_activation(&self, subscription: &AutopaySubscriptionModel) {
        match self
            .crediting
            .credit_gold_when_subscription_activated(subscription)
            .await
        {
            Ok(receipt) => info!(
                subscription_id = %subscription.id,
                order_id = %receipt.order_id,
                grams = receipt.grams,
                already_credited = receipt.already_credited,
                "autopay: activation credit applied"
            ),
            Err(err) => error!(
                subscription_id = %subscription.id,
                error = %err,
                "autopay: activation credit failed"
            ),
        }
    }

    async fn status_check(
        &self,
        mut subscription: AutopaySubscriptionModel,
    ) -> StatusCheckResponse {
        match self.reconcile(&mut subscription).await {
            Ok(reconciled) => StatusCheckResponse {
                subscription: AutopaySubscriptionDto::from(&subscription),
                refreshed: true,
                gateway_state: reconciled.gateway_state,
            },
            Err(err) => {
                warn!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "autopay: status refresh failed, returning stored subscription"
                );
                StatusCheckResponse {
                    subscription: AutopaySubscriptionDto::from(&subscription),
                    refreshed: false,
                    gateway_state: None,
                }
            }
        }
    }

    pub async fn check_order_status(
        &self,
        user_id: Uuid,
        merchant_order_id: &str,
    ) -> UseCaseResult<StatusCheckResponse> {
        let subscription = self
            .subscriptions
            .find_by_merchant_order_id(merchant_order_id)
            .await
            .map_err(AutopayError::Internal)?
            .filter(|sub| sub.user_id == user_id)
            .ok_or(AutopayError::NotFound("subscription"))?;
        Ok(self.status_check(subscription).await)
    }

    pub async fn check_subscription_status(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> UseCaseResult<StatusCheckResponse> {
        let subscription = self.load_owned(user_id, subscription_id).await?;
        Ok(self.status_check(subscription).await)
    }

    pub async fn sync_subscription_statuses(&self, user_id: Uuid) -> UseCaseResult<SyncSummary> {
        let subscriptions = self
            .subscriptions
            .list_by_user(user_id)
            .await
            .map_err(AutopayError::Internal)?;

        let mut summary = SyncSummary {
            total: subscriptions.len(),
            ..Default::default()
        };

        for mut subscription in subscriptions {
            if subscription.status.is_terminal()
                || subscription.has_placeholder_gateway_subscription_id()
            {
                summary.skipped += 1;
                continue;
            }

            match self.reconcile(&mut subscription).await {
                Ok(reconciled) => {
                    summary.synced += 1;
                    if reconciled.change.changed() || reconciled.learned_gateway_id {
                        summary.updated += 1;
                    }
                }
                Err(err) if err.not_yet_resolvable() => {
                    info!(subscription_id = %subscription.id, error = %err, "autopay: not yet resolvable at gateway");
                    summary.skipped += 1;
                }
                Err(err) => {
                    error!(subscription_id = %subscription.id, error = %err, "autopay: sync failed");
                    summary.errors += 1;
                }
            }
        }

        info!(
            %user_id,
            total = summary.total,
            synced = summary.synced,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors,
            "autopay: sync finished"
        );
        Ok(summary)
    }

    /// User cancel. The upstream cancel is always attempted; the local record is
    /// cancelled whatever the gateway answers.
    pub async fn revoke_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> UseCaseResult<AutopaySubscriptionDto> {
        let mut subscription = self.load_owned(user_id, subscription_id).await?;
        if matches!(
            subscription.status,
            AutopayStatus::Cancelled | AutopayStatus::Revoked
        ) {
            return Err(AutopayError::InvalidState(format!(
                "subscription is already {}",
                subscription.status
            )));
        }

        match self
            .gateway
            .cancel(&subscription.merchant_subscription_id)
            .await
        {
            Ok(()) => subscription.note("gatewayCancel", "CANCELLED"),
            Err(err) => {
                warn!(%user_id, %subscription_id, error = %err, "autopay: upstream cancel failed, cancelling locally");
                subscription.note("gatewayCancel", format!("FAILED: {err}"));
            }
        }

        subscription.transition_to(AutopayStatus::Cancelled, Utc::now());
        subscription.note("cancelReason", "cancelled by user");
        self.subscriptions
            .save(&subscription)
            .await
            .map_err(AutopayError::Internal)?;

        info!(%user_id, %subscription_id, "autopay: subscription cancelled");
        Ok(AutopaySubscriptionDto::from(&subscription))
    }

    pub async fn pause_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> UseCaseResult<AutopaySubscriptionDto> {
        self.toggle_pause(user_id, subscription_id, PauseAction::Pause)
            .await
    }

    pub async fn unpause_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> UseCaseResult<AutopaySubscriptionDto> {
        self.toggle_pause(user_id, subscription_id, PauseAction::Resume)
            .await
    }

    async fn toggle_pause(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        action: PauseAction,
    ) -> UseCaseResult<AutopaySubscriptionDto> {
        let mut subscription = self.load_owned(user_id, subscription_id).await?;
        if subscription.status != action.required() {
            return Err(AutopayError::InvalidState(format!(
                "subscription must be {} to {} (current: {})",
                action.required(),
                action.verb(),
                subscription.status
            )));
        }

        let gateway_id = subscription
            .genuine_gateway_subscription_id()
            .map(str::to_string);
        let local_reason = match gateway_id {
            _ if self.gateway.environment().is_sandbox() => {
                Some("sandbox gateway environment".to_string())
            }
            None => Some("gateway subscription id not yet known".to_string()),
            Some(ref id) => {
                let result = match action {
                    PauseAction::Pause => self.gateway.pause(id).await,
                    PauseAction::Resume => self.gateway.resume(id).await,
                };
                match result {
                    Ok(()) => None,
                    Err(err)
                        if gateway_error_of(&err)
                            .is_some_and(|api| api.is_capability_unsupported()) =>
                    {
                        warn!(%subscription_id, error = %err, "autopay: gateway cannot {}, applying locally", action.verb());
                        Some(format!("gateway does not support {}", action.verb()))
                    }
                    Err(err) => {
                        error!(%subscription_id, error = ?err, "autopay: gateway {} failed", action.verb());
                        return Err(AutopayError::gateway(err));
                    }
                }
            }
        };

        let prefix = action.verb();
        match &local_reason {
            Some(reason) => {
                subscription.note(&format!("{prefix}Mode"), "LOCAL_ONLY");
                subscription.note(&format!("{prefix}Reason"), reason.as_str());
            }
            None => subscription.note(&format!("{prefix}Mode"), "GATEWAY"),
        }
        subscription.transition_to(action.target(), Utc::now());
        self.subscriptions
            .save(&subscription)
            .await
            .map_err(AutopayError::Internal)?;

        info!(
            %user_id,
            %subscription_id,
            status = %subscription.status,
            local_only = local_reason.is_some(),
            "autopay: subscription {}d",
            action.verb()
        );
        Ok(AutopaySubscriptionDto::from(&subscription))
    }

    pub async fn get_user_subscriptions(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Vec<AutopaySubscriptionDto>> {
        let subscriptions = self
            .subscriptions
            .list_by_user(user_id)
            .await
            .map_err(AutopayError::Internal)?;
        Ok(subscriptions
            .iter()
            .map(AutopaySubscriptionDto::from)
            .collect())
    }

    pub async fn get_all_subscriptions_admin(
        &self,
        query: AdminListQuery,
    ) -> UseCaseResult<AdminSubscriptionPage> {
        let status = match query.status.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Some(AutopayStatus::from_str(value).ok_or_else(
                || AutopayError::Validation(format!("unknown status filter: {value}")),
            )?),
            _ => None,
        };
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(ADMIN_DEFAULT_LIMIT)
            .clamp(1, ADMIN_MAX_LIMIT);

        let (rows, total) = self
            .subscriptions
            .list_page(status, (page - 1) * limit, limit)
            .await
            .map_err(AutopayError::Internal)?;

        Ok(AdminSubscriptionPage {
            subscriptions: rows.iter().map(AutopaySubscriptionDto::from).collect(),
            page,
            limit,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::{
        autopay_gateway::MockAutopayGateway,
        autopay_redemptions::AutopayRedemptionUseCase,
        test_support::{FixedRates, GOLD_RATE, InMemoryLedger, InMemorySubscriptions, subscription},
    };
    use anyhow::anyhow;
    use crates::{
        domain::value_objects::{
            autopay_subscriptions::RedemptionRequest,
            enums::{gateway_environments::GatewayEnvironment, redemption_statuses::RedemptionStatus},
            metal_ledger::grams_for_amount,
            payment_modes::PaymentMode,
        },
        payments::autopay_client::{
            GatewayApiError, GatewayOrderResponse, GatewayStatusResponse, MandateSetupResponse,
        },
    };
    use serde_json::{Value, json};

    struct Fixture {
        store: InMemorySubscriptions,
        ledger: InMemoryLedger,
    }

    impl Fixture {
        fn new(subscriptions: Vec<AutopaySubscriptionModel>) -> Self {
            Self {
                store: InMemorySubscriptions::with(subscriptions),
                ledger: InMemoryLedger::default(),
            }
        }

        fn crediting(&self) -> Arc<MetalCreditingUseCase> {
            Arc::new(MetalCreditingUseCase::new(
                Arc::new(self.ledger.clone()),
                Arc::new(FixedRates::default()),
            ))
        }

        fn usecase(&self, gateway: MockAutopayGateway) -> AutopaySubscriptionUseCase {
            AutopaySubscriptionUseCase::new(
                Arc::new(self.store.clone()),
                Arc::new(gateway),
                self.crediting(),
                LifecycleSettings::default(),
            )
        }
    }

    fn api_error(status: u16, code: Option<&str>) -> anyhow::Error {
        GatewayApiError {
            status,
            code: code.map(str::to_string),
            message: format!("gateway answered {status}"),
            body: Value::Null,
            context: "test".to_string(),
        }
        .into()
    }

    fn setup_request(frequency: &str) -> SetupAutopayRequest {
        SetupAutopayRequest {
            amount: 500.0,
            max_amount: Some(1_000.0),
            frequency: frequency.to_string(),
            amount_type: None,
            metal: None,
            payment_mode: PaymentMode::UpiIntent {
                target_app: "com.phonepe.app".to_string(),
            },
        }
    }

    fn accepting_setup(gateway: &mut MockAutopayGateway) {
        gateway.expect_setup_mandate().times(1).returning(|request| {
            Ok(MandateSetupResponse {
                order_id: Some(format!("OMO_{}", request.merchant_order_id)),
                state: Some("PENDING".to_string()),
                raw: json!({"orderId": "OMO_1", "state": "PENDING", "intentUrl": "upi://mandate?pa=x"}),
            })
        });
    }

    fn reporting(state: &'static str, subscription_id: Option<&'static str>) -> GatewayStatusResponse {
        GatewayStatusResponse {
            state: Some(state.to_string()),
            subscription_id: subscription_id.map(str::to_string),
            order_id: None,
        }
    }

    #[tokio::test]
    async fn setup_creates_pending_subscription_and_passes_gateway_payload_through() {
        let fixture = Fixture::new(vec![]);
        let mut gateway = MockAutopayGateway::new();
        accepting_setup(&mut gateway);
        let user_id = Uuid::new_v4();

        let response = fixture
            .usecase(gateway)
            .setup_subscription(user_id, setup_request("MONTHLY"))
            .await
            .unwrap();

        assert_eq!(response.status, AutopayStatus::Pending);
        assert_eq!(response.gateway["intentUrl"], "upi://mandate?pa=x");
        assert!(response.merchant_subscription_id.starts_with("AP_MS_"));
        let stored = fixture.store.get(response.subscription_id);
        assert_eq!(stored.user_id, user_id);
        assert_eq!(stored.metal, Metal::Gold);
        assert_eq!(stored.amount_type, AmountType::Fixed);
        assert_eq!(
            stored.gateway_order_id,
            Some(format!("OMO_{}", response.merchant_order_id))
        );
    }

    #[tokio::test]
    async fn exclusive_frequency_replaces_previous_even_when_upstream_cancel_fails() {
        let user_id = Uuid::new_v4();
        let existing = subscription(user_id, AutopayFrequency::Daily, AutopayStatus::Active);
        let other_freq = subscription(user_id, AutopayFrequency::Weekly, AutopayStatus::Active);
        let fixture = Fixture::new(vec![existing.clone(), other_freq.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_cancel()
            .times(1)
            .returning(|_| Err(anyhow!("connection reset")));
        accepting_setup(&mut gateway);

        let response = fixture
            .usecase(gateway)
            .setup_subscription(user_id, setup_request("daily"))
            .await
            .unwrap();

        let old = fixture.store.get(existing.id);
        assert_eq!(old.status, AutopayStatus::Cancelled);
        assert!(old.cancelled_at.is_some());
        assert!(old.metadata["gatewayCancel"]
            .as_str()
            .unwrap()
            .starts_with("FAILED"));
        assert_eq!(fixture.store.get(other_freq.id).status, AutopayStatus::Active);

        let holders: Vec<_> = fixture
            .store
            .all()
            .into_iter()
            .filter(|sub| sub.frequency == AutopayFrequency::Daily && sub.status.holds_frequency_slot())
            .collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].id, response.subscription_id);
    }

    #[tokio::test]
    async fn setup_gateway_failure_persists_nothing() {
        let fixture = Fixture::new(vec![]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_setup_mandate()
            .returning(|_| Err(api_error(400, Some("INVALID_REQUEST"))));

        let result = fixture
            .usecase(gateway)
            .setup_subscription(Uuid::new_v4(), setup_request("MONTHLY"))
            .await;

        assert!(matches!(
            result,
            Err(AutopayError::Gateway {
                status: Some(400),
                ..
            })
        ));
        assert!(fixture.store.all().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_gateway_call() {
        let fixture = Fixture::new(vec![]);
        let mut gateway = MockAutopayGateway::new();
        gateway.expect_setup_mandate().never();
        gateway.expect_cancel().never();
        let usecase = fixture.usecase(gateway);

        let bad_frequency = usecase
            .setup_subscription(Uuid::new_v4(), setup_request("HOURLY"))
            .await;
        assert!(matches!(bad_frequency, Err(AutopayError::Validation(_))));

        let mut zero = setup_request("MONTHLY");
        zero.amount = 0.0;
        let zero = usecase.setup_subscription(Uuid::new_v4(), zero).await;
        assert!(matches!(zero, Err(AutopayError::Validation(_))));

        let mut low_max = setup_request("MONTHLY");
        low_max.max_amount = Some(100.0);
        let low_max = usecase.setup_subscription(Uuid::new_v4(), low_max).await;
        assert!(matches!(low_max, Err(AutopayError::Validation(_))));
    }

    #[tokio::test]
    async fn first_activation_credits_once_across_repeated_polls() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Pending);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_order_status()
            .times(1)
            .returning(|_| Ok(reporting("COMPLETED", Some("OMS_REAL_1"))));
        gateway
            .expect_subscription_status()
            .withf(|id| id == "OMS_REAL_1")
            .times(1)
            .returning(|_| Ok(reporting("ACTIVE", None)));
        let usecase = fixture.usecase(gateway);

        let first = usecase
            .check_subscription_status(user_id, sub.id)
            .await
            .unwrap();
        let second = usecase
            .check_subscription_status(user_id, sub.id)
            .await
            .unwrap();

        assert!(first.refreshed && second.refreshed);
        assert_eq!(first.subscription.status, AutopayStatus::Active);
        assert!(first.subscription.activated_at.is_some());
        assert_eq!(
            fixture.store.get(sub.id).gateway_subscription_id.as_deref(),
            Some("OMS_REAL_1")
        );
        assert_eq!(
            fixture.ledger.order_ids(),
            vec![format!("AUTOPAY_ACTIVE_{}", sub.merchant_subscription_id)]
        );
    }

    #[tokio::test]
    async fn cancelled_subscription_stays_cancelled_when_gateway_reports_active() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Cancelled);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_order_status()
            .returning(|_| Ok(reporting("COMPLETED", None)));

        let response = fixture
            .usecase(gateway)
            .check_order_status(user_id, &sub.merchant_order_id)
            .await
            .unwrap();

        assert_eq!(response.subscription.status, AutopayStatus::Cancelled);
        assert!(fixture.ledger.order_ids().is_empty());
    }

    #[tokio::test]
    async fn unknown_gateway_state_leaves_status_unchanged() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Pending);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_order_status()
            .returning(|_| Ok(reporting("AUTHORIZATION_IN_PROGRESS", None)));

        let response = fixture
            .usecase(gateway)
            .check_subscription_status(user_id, sub.id)
            .await
            .unwrap();

        assert_eq!(response.subscription.status, AutopayStatus::Pending);
        assert_eq!(
            response.gateway_state.as_deref(),
            Some("AUTHORIZATION_IN_PROGRESS")
        );
    }

    #[tokio::test]
    async fn status_check_degrades_to_stored_data_on_gateway_error() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Pending);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_order_status()
            .returning(|_| Err(api_error(503, None)));

        let response = fixture
            .usecase(gateway)
            .check_subscription_status(user_id, sub.id)
            .await
            .unwrap();

        assert!(!response.refreshed);
        assert_eq!(response.subscription.status, AutopayStatus::Pending);
    }

    #[tokio::test]
    async fn sync_skips_placeholders_and_unresolvable_and_counts_errors() {
        let user_id = Uuid::new_v4();
        let activating = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Pending);
        let mut placeholder = subscription(user_id, AutopayFrequency::Weekly, AutopayStatus::Pending);
        placeholder.gateway_subscription_id = Some(placeholder.merchant_subscription_id.clone());
        let unresolvable = subscription(user_id, AutopayFrequency::Yearly, AutopayStatus::Pending);
        let broken = subscription(user_id, AutopayFrequency::Quarterly, AutopayStatus::Pending);
        let terminal = subscription(user_id, AutopayFrequency::Daily, AutopayStatus::Revoked);

        let activating_order = activating.merchant_order_id.clone();
        let unresolvable_order = unresolvable.merchant_order_id.clone();
        let fixture = Fixture::new(vec![
            activating.clone(),
            placeholder,
            unresolvable,
            broken,
            terminal,
        ]);
        let mut gateway = MockAutopayGateway::new();
        gateway.expect_order_status().times(3).returning(move |order_id| {
            if order_id == activating_order {
                Ok(reporting("COMPLETED", Some("OMS_REAL_2")))
            } else if order_id == unresolvable_order {
                Err(api_error(404, Some("NOT_FOUND")))
            } else {
                Err(api_error(500, None))
            }
        });

        let summary = fixture
            .usecase(gateway)
            .sync_subscription_statuses(user_id)
            .await
            .unwrap();

        assert_eq!(
            summary,
            SyncSummary {
                total: 5,
                synced: 1,
                updated: 1,
                skipped: 3,
                errors: 1,
            }
        );
        assert_eq!(fixture.store.get(activating.id).status, AutopayStatus::Active);
    }

    #[tokio::test]
    async fn sandbox_pause_and_resume_stay_local() {
        let user_id = Uuid::new_v4();
        let mut sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        sub.gateway_subscription_id = Some("OMS_REAL_3".to_string());
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_environment()
            .return_const(GatewayEnvironment::Sandbox);
        gateway.expect_pause().never();
        gateway.expect_resume().never();
        let usecase = fixture.usecase(gateway);

        let paused = usecase.pause_subscription(user_id, sub.id).await.unwrap();
        assert_eq!(paused.status, AutopayStatus::Paused);
        assert_eq!(paused.metadata["pauseMode"], "LOCAL_ONLY");

        let resumed = usecase.unpause_subscription(user_id, sub.id).await.unwrap();
        assert_eq!(resumed.status, AutopayStatus::Active);
        assert_eq!(resumed.metadata["resumeMode"], "LOCAL_ONLY");
    }

    #[tokio::test]
    async fn local_pause_survives_polls_and_sync_reporting_active() {
        let user_id = Uuid::new_v4();
        let mut sub = subscription(user_id, AutopayFrequency::Daily, AutopayStatus::Active);
        sub.gateway_subscription_id = Some("OMS_REAL_PAUSE".to_string());
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_environment()
            .return_const(GatewayEnvironment::Sandbox);
        gateway.expect_pause().never();
        gateway
            .expect_subscription_status()
            .withf(|id| id == "OMS_REAL_PAUSE")
            .times(2)
            .returning(|_| Ok(reporting("ACTIVE", Some("OMS_REAL_PAUSE"))));
        let usecase = fixture.usecase(gateway);

        let paused = usecase.pause_subscription(user_id, sub.id).await.unwrap();
        assert_eq!(paused.status, AutopayStatus::Paused);

        let polled = usecase
            .check_subscription_status(user_id, sub.id)
            .await
            .unwrap();
        assert!(polled.refreshed);
        assert_eq!(polled.subscription.status, AutopayStatus::Paused);

        let summary = usecase.sync_subscription_statuses(user_id).await.unwrap();
        assert_eq!(summary.synced, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(fixture.store.get(sub.id).status, AutopayStatus::Paused);
    }

    #[tokio::test]
    async fn pending_ignores_gateway_states_outside_the_lifecycle() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Pending);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_order_status()
            .times(2)
            .returning({
                let mut calls = 0;
                move |_| {
                    calls += 1;
                    if calls == 1 {
                        Ok(reporting("PAUSED", None))
                    } else {
                        Ok(reporting("REVOKED", None))
                    }
                }
            });
        let usecase = fixture.usecase(gateway);

        for _ in 0..2 {
            let response = usecase
                .check_order_status(user_id, &sub.merchant_order_id)
                .await
                .unwrap();
            assert_eq!(response.subscription.status, AutopayStatus::Pending);
        }
        assert_eq!(fixture.store.get(sub.id).status, AutopayStatus::Pending);
        assert_eq!(fixture.ledger.order_ids(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn production_pause_uses_gateway_subscription_id() {
        let user_id = Uuid::new_v4();
        let mut sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        sub.gateway_subscription_id = Some("OMS_REAL_4".to_string());
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_environment()
            .return_const(GatewayEnvironment::Production);
        gateway
            .expect_pause()
            .withf(|id| id == "OMS_REAL_4")
            .times(1)
            .returning(|_| Ok(()));

        let paused = fixture
            .usecase(gateway)
            .pause_subscription(user_id, sub.id)
            .await
            .unwrap();

        assert_eq!(paused.status, AutopayStatus::Paused);
        assert_eq!(paused.metadata["pauseMode"], "GATEWAY");
    }

    #[tokio::test]
    async fn unsupported_pause_falls_back_to_local() {
        let user_id = Uuid::new_v4();
        let mut sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        sub.gateway_subscription_id = Some("OMS_REAL_5".to_string());
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_environment()
            .return_const(GatewayEnvironment::Production);
        gateway
            .expect_pause()
            .returning(|_| Err(api_error(501, Some("OPERATION_NOT_SUPPORTED"))));

        let paused = fixture
            .usecase(gateway)
            .pause_subscription(user_id, sub.id)
            .await
            .unwrap();

        assert_eq!(paused.status, AutopayStatus::Paused);
        assert_eq!(paused.metadata["pauseMode"], "LOCAL_ONLY");
    }

    #[tokio::test]
    async fn other_pause_failures_surface_and_keep_status() {
        let user_id = Uuid::new_v4();
        let mut sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        sub.gateway_subscription_id = Some("OMS_REAL_6".to_string());
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        gateway
            .expect_environment()
            .return_const(GatewayEnvironment::Production);
        gateway
            .expect_pause()
            .returning(|_| Err(api_error(500, None)));

        let result = fixture
            .usecase(gateway)
            .pause_subscription(user_id, sub.id)
            .await;

        assert!(matches!(result, Err(AutopayError::Gateway { .. })));
        assert_eq!(fixture.store.get(sub.id).status, AutopayStatus::Active);
    }

    #[tokio::test]
    async fn resume_requires_paused() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Active);
        let fixture = Fixture::new(vec![sub.clone()]);

        let result = fixture
            .usecase(MockAutopayGateway::new())
            .unpause_subscription(user_id, sub.id)
            .await;

        assert!(matches!(result, Err(AutopayError::InvalidState(_))));
    }

    #[tokio::test]
    async fn revoke_cancels_locally_even_when_gateway_fails() {
        let user_id = Uuid::new_v4();
        let sub = subscription(user_id, AutopayFrequency::Monthly, AutopayStatus::Paused);
        let fixture = Fixture::new(vec![sub.clone()]);
        let mut gateway = MockAutopayGateway::new();
        let merchant_subscription_id = sub.merchant_subscription_id.clone();
        gateway
            .expect_cancel()
            .withf(move |id| id == merchant_subscription_id)
            .times(1)
            .returning(|_| Err(api_error(500, None)));
        let usecase = fixture.usecase(gateway);

        let cancelled = usecase.revoke_subscription(user_id, sub.id).await.unwrap();
        assert_eq!(cancelled.status, AutopayStatus::Cancelled);
        assert!(cancelled.revoked_at.is_some());

        let again = usecase.revoke_subscription(user_id, sub.id).await;
        assert!(matches!(again, Err(AutopayError::InvalidState(_))));
    }

    #[tokio::test]
    async fn admin_listing_pages_and_filters() {
        let mut subs = Vec::new();
        for _ in 0..3 {
            subs.push(subscription(Uuid::new_v4(), AutopayFrequency::Monthly, AutopayStatus::Active));
        }
        subs.push(subscription(Uuid::new_v4(), AutopayFrequency::Monthly, AutopayStatus::Paused));
        let fixture = Fixture::new(subs);
        let usecase = fixture.usecase(MockAutopayGateway::new());

        let page = usecase
            .get_all_subscriptions_admin(AdminListQuery {
                status: Some("active".to_string()),
                page: Some(2),
                limit: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.subscriptions.len(), 1);
        assert_eq!(page.page, 2);

        let clamped = usecase
            .get_all_subscriptions_admin(AdminListQuery {
                limit: Some(10_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(clamped.limit, 100);
        assert_eq!(clamped.total, 4);

        let unknown = usecase
            .get_all_subscriptions_admin(AdminListQuery {
                status: Some("SLEEPING".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(unknown, Err(AutopayError::Validation(_))));
    }

    #[tokio::test]
    async fn setup_activate_then_redeem_credits_twice_with_distinct_orders() {
        let fixture = Fixture::new(vec![]);
        let user_id = Uuid::new_v4();
        let mut gateway = MockAutopayGateway::new();
        accepting_setup(&mut gateway);
        gateway
            .expect_order_status()
            .returning(|_| Ok(reporting("COMPLETED", Some("OMS_REAL_7"))));
        gateway.expect_notify_redemption().returning(|_| {
            Ok(GatewayOrderResponse {
                order_id: None,
                state: Some("NOTIFIED".to_string()),
            })
        });
        gateway.expect_redeem().returning(|_| {
            Ok(GatewayOrderResponse {
                order_id: Some("OMO_R1".to_string()),
                state: Some("COMPLETED".to_string()),
            })
        });
        let gateway: Arc<dyn AutopayGateway> = Arc::new(gateway);
        let crediting = fixture.crediting();
        let lifecycle = AutopaySubscriptionUseCase::new(
            Arc::new(fixture.store.clone()),
            Arc::clone(&gateway),
            Arc::clone(&crediting),
            LifecycleSettings::default(),
        );
        let redemptions =
            AutopayRedemptionUseCase::new(Arc::new(fixture.store.clone()), gateway, crediting);

        let created = lifecycle
            .setup_subscription(user_id, setup_request("MONTHLY"))
            .await
            .unwrap();
        let checked = lifecycle
            .check_order_status(user_id, &created.merchant_order_id)
            .await
            .unwrap();
        assert_eq!(checked.subscription.status, AutopayStatus::Active);

        let outcome = redemptions
            .execute_redemption(
                user_id,
                created.subscription_id,
                RedemptionRequest {
                    amount: Some(500.0),
                    note: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, Some(RedemptionStatus::Completed));

        let order_ids = fixture.ledger.order_ids();
        assert_eq!(order_ids.len(), 2);
        assert_ne!(order_ids[0], order_ids[1]);
        assert_eq!(
            fixture.ledger.balance(user_id, Metal::Gold),
            2.0 * grams_for_amount(500.0, GOLD_RATE)
        );
    }
}
