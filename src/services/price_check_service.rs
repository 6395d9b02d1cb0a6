use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::page_fetcher::{PageFetcher, StayRequest};
use crate::models::{Comparison, FetchOutcome, PriceRecord};
use crate::services::change_detector::detect_price_change;
use crate::services::notification_service::Notifier;
use crate::store::{LedgerStore, UpsertOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LedgerStatus {
    Written { location: String, upsert: UpsertOutcome },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent { recipients: usize },
    /// A change was found but no recipients are configured.
    Disabled,
    /// Recipients are configured but there is no transport to reach them.
    NotConfigured { recipients: usize },
    NotNeeded,
    Failed { error: String },
}

/// Everything one run did, printed as JSON when the binary exits.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub observation_date: NaiveDate,
    pub fetch: FetchOutcome,
    pub ledger: LedgerStatus,
    pub comparison: Option<Comparison>,
    pub notification: NotificationStatus,
}

impl RunReport {
    fn skipped(observation_date: NaiveDate, fetch: FetchOutcome, reason: &AppError) -> Self {
        Self {
            observation_date,
            fetch,
            ledger: LedgerStatus::Skipped {
                reason: reason.to_string(),
            },
            comparison: None,
            notification: NotificationStatus::NotNeeded,
        }
    }

    /// 0 on success, 2 when nothing was written, 3 when an alert was due
    /// but not delivered.
    pub fn exit_code(&self) -> i32 {
        match (&self.ledger, &self.notification) {
            (LedgerStatus::Skipped { .. }, _) => 2,
            (_, NotificationStatus::Failed { .. } | NotificationStatus::NotConfigured { .. }) => 3,
            _ => 0,
        }
    }
}

/// Fetch → upsert → compare → notify, once.
pub struct PriceCheckService {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn LedgerStore>,
    /// `None` when no mail transport is configured.
    notifier: Option<Arc<dyn Notifier>>,
    recipients: Vec<String>,
}

impl PriceCheckService {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn LedgerStore>,
        notifier: Option<Arc<dyn Notifier>>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            recipients,
        }
    }

    /// Storage errors abort the run before any notification. A failed fetch
    /// or incomplete extraction skips the write. A delivery failure is
    /// reported but leaves the written ledger in place.
    pub async fn run(
        &self,
        request: &StayRequest,
        observation_date: NaiveDate,
    ) -> Result<RunReport, AppError> {
        let fetch = self.fetcher.fetch_prices(request).await;

        if !fetch.success {
            let reason = AppError::FetchFailed(
                fetch.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            );
            warn!("⏭️  {}; ledger not written", reason);
            return Ok(RunReport::skipped(observation_date, fetch, &reason));
        }

        if !fetch.has_prices() {
            let reason = AppError::ExtractionIncomplete(format!(
                "initial_price={:?} best_price={:?}",
                fetch.initial_price, fetch.best_price
            ));
            warn!("⏭️  {}; ledger not written", reason);
            return Ok(RunReport::skipped(observation_date, fetch, &reason));
        }

        let record = PriceRecord::new(
            observation_date,
            fetch.initial_price.as_deref(),
            fetch.best_price.as_deref(),
            &request.stay,
        );

        let upsert = self.store.upsert(record).await.map_err(|e| {
            error!("❌ Ledger write failed: {}", e);
            e
        })?;
        let ledger = LedgerStatus::Written {
            location: self.store.location(),
            upsert,
        };

        let records = self.store.load().await?;
        let comparison = detect_price_change(&records);

        let notification = match comparison.change() {
            None => {
                info!("✅ No price changes detected");
                NotificationStatus::NotNeeded
            }
            Some(_) if self.recipients.is_empty() => {
                info!("⏭️  Price changed but no email recipients are configured (PRICE_ALERT_EMAILS)");
                NotificationStatus::Disabled
            }
            Some(change) => {
                info!(
                    "🚨 Price change detected: ${} -> ${} (difference {})",
                    change.previous.best_price.as_deref().unwrap_or(""),
                    change.latest.best_price.as_deref().unwrap_or(""),
                    change.price_difference
                );
                match &self.notifier {
                    None => {
                        error!(
                            "❌ SMTP_HOST, SMTP_USERNAME or SMTP_PASSWORD not configured; {} recipient(s) not notified",
                            self.recipients.len()
                        );
                        NotificationStatus::NotConfigured {
                            recipients: self.recipients.len(),
                        }
                    }
                    Some(notifier) => match notifier.notify(change, &self.recipients).await {
                        Ok(()) => NotificationStatus::Sent {
                            recipients: self.recipients.len(),
                        },
                        Err(e) => {
                            error!("❌ {}", e);
                            NotificationStatus::Failed {
                                error: e.to_string(),
                            }
                        }
                    },
                }
            }
        };

        Ok(RunReport {
            observation_date,
            fetch,
            ledger,
            comparison: Some(comparison),
            notification,
        })
    }
}
