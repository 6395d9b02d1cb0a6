use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{error, info, warn};

use price_monitor::config::{AppConfig, StorageBackend};
use price_monitor::errors::AppError;
use price_monitor::external::page_fetcher::{HttpPageFetcher, PageFetcher, StayRequest};
use price_monitor::logging::{init_logging, LoggingConfig};
use price_monitor::services::notification_service::{Notifier, SmtpNotifier};
use price_monitor::services::price_check_service::{PriceCheckService, RunReport};
use price_monitor::store::{LedgerStore, LocalLedger, ObjectLedger, StoreClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    let log_guard = init_logging(&LoggingConfig::from_env())
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let code = match run().await {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize run report: {}", e),
            }
            report.exit_code()
        }
        Err(e) => {
            error!("❌ Price check aborted: {}", e);
            e.exit_code()
        }
    };

    // process::exit skips runtime shutdown, so ship pending logs first.
    log_guard.flush().await;
    std::process::exit(code);
}

async fn run() -> Result<RunReport, AppError> {
    let config = AppConfig::from_env()?;

    let store: Arc<dyn LedgerStore> = match &config.storage {
        StorageBackend::Local { path } => {
            info!("📁 Using local ledger: {}", path.display());
            Arc::new(LocalLedger::new(path.clone()))
        }
        StorageBackend::ObjectStore { bucket, key, region } => {
            info!("☁️  Using object-store ledger: s3://{}/{}", bucket, key);
            let client = StoreClient::s3(bucket, region)?;
            Arc::new(ObjectLedger::new(Arc::new(client), bucket.clone(), key.clone()))
        }
    };

    let fetcher: Arc<dyn PageFetcher> = Arc::new(
        HttpPageFetcher::new(config.base_url.clone()).map_err(|e| AppError::Config(e.to_string()))?,
    );

    let notifier: Option<Arc<dyn Notifier>> = match config.smtp.clone() {
        Some(smtp) => Some(Arc::new(SmtpNotifier::new(smtp, config.dashboard_url.clone()))),
        None => {
            if !config.recipients.is_empty() {
                warn!("SMTP_HOST, SMTP_USERNAME or SMTP_PASSWORD not set; price alerts cannot be delivered");
            }
            None
        }
    };

    let service = PriceCheckService::new(fetcher, store, notifier, config.recipients.clone());

    let request = StayRequest {
        stay: config.stay.clone(),
        birthdates: config.birthdates.clone(),
    };
    let observation_date = config.observation_date(Utc::now());

    info!("🔎 Price check for {} ({} to {})", observation_date, request.start_date(), request.end_date());

    service.run(&request, observation_date).await
}
