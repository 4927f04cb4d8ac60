use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::{
    domain::value_objects::enums::gateway_environments::GatewayEnvironment,
    payments::autopay_client::{
        AutopayClient, GatewayOrderResponse, GatewayStatusResponse, MandateSetupRequest,
        MandateSetupResponse, RedemptionNotifyRequest,
    },
};

/// The slice of the recurring-payment gateway the use cases depend on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutopayGateway: Send + Sync {
    fn environment(&self) -> GatewayEnvironment;

    async fn setup_mandate(&self, request: &MandateSetupRequest)
    -> AnyResult<MandateSetupResponse>;

    async fn order_status(&self, merchant_order_id: &str) -> AnyResult<GatewayStatusResponse>;

    async fn subscription_status(
        &self,
        gateway_subscription_id: &str,
    ) -> AnyResult<GatewayStatusResponse>;

    async fn notify_redemption(
        &self,
        request: &RedemptionNotifyRequest,
    ) -> AnyResult<GatewayOrderResponse>;

    async fn redeem(&self, merchant_order_id: &str) -> AnyResult<GatewayOrderResponse>;

    async fn cancel(&self, merchant_subscription_id: &str) -> AnyResult<()>;

    async fn pause(&self, gateway_subscription_id: &str) -> AnyResult<()>;

    async fn resume(&self, gateway_subscription_id: &str) -> AnyResult<()>;
}

#[async_trait]
impl AutopayGateway for AutopayClient {
    fn environment(&self) -> GatewayEnvironment {
        self.environment()
    }

    async fn setup_mandate(
        &self,
        request: &MandateSetupRequest,
    ) -> AnyResult<MandateSetupResponse> {
        self.setup_mandate(request).await
    }

    async fn order_status(&self, merchant_order_id: &str) -> AnyResult<GatewayStatusResponse> {
        self.order_status(merchant_order_id).await
    }

    async fn subscription_status(
        &self,
        gateway_subscription_id: &str,
    ) -> AnyResult<GatewayStatusResponse> {
        self.subscription_status(gateway_subscription_id).await
    }

    async fn notify_redemption(
        &self,
        request: &RedemptionNotifyRequest,
    ) -> AnyResult<GatewayOrderResponse> {
        self.notify_redemption(request).await
    }

    async fn redeem(&self, merchant_order_id: &str) -> AnyResult<GatewayOrderResponse> {
        self.redeem(merchant_order_id).await
    }

    async fn cancel(&self, merchant_subscription_id: &str) -> AnyResult<()> {
        self.cancel(merchant_subscription_id).await
    }

    async fn pause(&self, gateway_subscription_id: &str) -> AnyResult<()> {
        self.pause(gateway_subscription_id).await
    }

    async fn resume(&self, gateway_subscription_id: &str) -> AnyResult<()> {
        self.resume(gateway_subscription_id).await
    }
}
