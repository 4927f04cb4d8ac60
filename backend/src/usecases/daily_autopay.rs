use std::sync::Arc;

use chrono::NaiveDate;
use crates::{
    domain::{
        repositories::autopay_subscriptions::AutopaySubscriptionRepository,
        value_objects::{
            civil_time,
            enums::{
                autopay_frequencies::AutopayFrequency, autopay_statuses::AutopayStatus,
                redemption_statuses::RedemptionStatus,
            },
        },
    },
    observability::SharedAlertSink,
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    autopay_errors::{AutopayError, UseCaseResult},
    autopay_redemptions::AutopayRedemptionUseCase,
};

/// Failures listed in a single alert before the rest are summarised.
const ALERT_FAILURE_LINES: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeFailure {
    pub subscription_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChargeSummary {
    pub date: NaiveDate,
    pub selected: usize,
    pub charged: usize,
    pub pending: usize,
    pub skipped_already_charged: usize,
    pub skipped_ineligible: usize,
    pub failed: usize,
    pub failures: Vec<ChargeFailure>,
}

impl DailyChargeSummary {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            selected: 0,
            charged: 0,
            pending: 0,
            skipped_already_charged: 0,
            skipped_ineligible: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, subscription_id: Uuid, error: String) {
        self.failed += 1;
        self.failures.push(ChargeFailure {
            subscription_id,
            error,
        });
    }
}

/// Charges every ACTIVE DAILY mandate at most once per IST calendar day.
pub struct DailyAutopayUseCase {
    subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
    redemptions: Arc<AutopayRedemptionUseCase>,
    alert_sink: Option<SharedAlertSink>,
}

impl DailyAutopayUseCase {
    pub fn new(
        subscriptions: Arc<dyn AutopaySubscriptionRepository + Send + Sync>,
        redemptions: Arc<AutopayRedemptionUseCase>,
        alert_sink: Option<SharedAlertSink>,
    ) -> Self {
        Self {
            subscriptions,
            redemptions,
            alert_sink,
        }
    }

    pub async fn run_daily_autopay_charges(&self) -> UseCaseResult<DailyChargeSummary> {
        self.run_for_date(civil_time::civil_today()).await
    }

    pub async fn run_for_date(&self, date: NaiveDate) -> UseCaseResult<DailyChargeSummary> {
        let selected = self
            .subscriptions
            .list_by_status_and_frequency(AutopayStatus::Active, AutopayFrequency::Daily)
            .await
            .map_err(|err| {
                error!(%date, db_error = ?err, "autopay: failed to select daily subscriptions");
                AutopayError::Internal(err)
            })?;

        let mut summary = DailyChargeSummary::new(date);
        summary.selected = selected.len();
        info!(%date, selected = summary.selected, "autopay: daily charge run started");

        for candidate in selected {
            let subscription_id = candidate.id;
            if candidate.redeemed_on(date) {
                summary.skipped_already_charged += 1;
                continue;
            }

            let fresh = match self.subscriptions.find_by_id(subscription_id).await {
                Ok(Some(fresh)) => fresh,
                Ok(None) => {
                    warn!(%subscription_id, "autopay: subscription vanished before charge");
                    summary.skipped_ineligible += 1;
                    continue;
                }
                Err(err) => {
                    error!(%subscription_id, db_error = ?err, "autopay: failed to reload subscription");
                    summary.fail(subscription_id, err.to_string());
                    continue;
                }
            };

            if fresh.status != AutopayStatus::Active || fresh.frequency != AutopayFrequency::Daily {
                info!(
                    %subscription_id,
                    status = %fresh.status,
                    frequency = %fresh.frequency,
                    "autopay: no longer eligible for daily charge"
                );
                summary.skipped_ineligible += 1;
                continue;
            }
            if fresh.redeemed_on(date) {
                summary.skipped_already_charged += 1;
                continue;
            }

            let outcome = self
                .redemptions
                .execute_redemption_headless(fresh, None, Some(format!("daily autopay {date}")))
                .await;

            match outcome.status {
                _ if outcome.success => summary.charged += 1,
                Some(RedemptionStatus::Pending) => summary.pending += 1,
                _ => {
                    let reason = outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "redemption did not complete".to_string());
                    warn!(%subscription_id, error = %reason, "autopay: daily charge failed");
                    summary.fail(subscription_id, reason);
                }
            }
        }

        info!(
            %date,
            selected = summary.selected,
            charged = summary.charged,
            pending = summary.pending,
            skipped_already_charged = summary.skipped_already_charged,
            skipped_ineligible = summary.skipped_ineligible,
            failed = summary.failed,
            "autopay: daily charge run finished"
        );

        if summary.failed > 0 {
            self.send_failure_alert(&summary).await;
        }

        Ok(summary)
    }

    async fn send_failure_alert(&self, summary: &DailyChargeSummary) {
        let Some(alert_sink) = &self.alert_sink else {
            return;
        };

        let title = format!(
            "Daily autopay {}: {} of {} charges failed",
            summary.date, summary.failed, summary.selected
        );
        let mut lines: Vec<String> = summary
            .failures
            .iter()
            .take(ALERT_FAILURE_LINES)
            .map(|failure| format!("- {}: {}", failure.subscription_id, failure.error))
            .collect();
        if summary.failures.len() > ALERT_FAILURE_LINES {
            lines.push(format!(
                "... and {} more",
                summary.failures.len() - ALERT_FAILURE_LINES
            ));
        }

        if let Err(err) = alert_sink.alert(&title, &lines.join("\n")).await {
            error!(date = %summary.date, error = ?err, "autopay: failed to send daily charge alert");
        }
    }
}
