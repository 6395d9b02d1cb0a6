use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::csv_codec::{decode_ledger, encode_ledger};
use super::{merge_record, LedgerStore, UpsertOutcome};
use crate::errors::AppError;
use crate::models::PriceRecord;

/// Ledger kept in a CSV file on the local filesystem.
pub struct LocalLedger {
    path: PathBuf,
}

impl LocalLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Sibling of the target so the rename stays on one filesystem.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.csv".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomically(&self, content: &str) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::StorageUnavailable(format!(
                        "Failed to create directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }

        let staging = self.staging_path();
        fs::write(&staging, content).await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to write {:?}: {}", staging, e))
        })?;

        if let Err(e) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(AppError::StorageUnavailable(format!(
                "Failed to replace {:?}: {}",
                self.path, e
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for LocalLedger {
    async fn load(&self) -> Result<Vec<PriceRecord>, AppError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => decode_ledger(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {:?} yet, starting empty", self.path);
                Ok(Vec::new())
            }
            Err(e) => Err(AppError::StorageUnavailable(format!(
                "Failed to read {:?}: {}",
                self.path, e
            ))),
        }
    }

    async fn upsert(&self, record: PriceRecord) -> Result<UpsertOutcome, AppError> {
        let mut records = self.load().await?;
        let date = record.observation_date;
        let outcome = merge_record(&mut records, record);

        let content = encode_ledger(&records)?;
        self.write_atomically(&content).await?;

        match outcome {
            UpsertOutcome::Updated { .. } => info!("Updated entry for {}", date),
            UpsertOutcome::Inserted { .. } => info!("Added entry for {}", date),
        }
        info!("Ledger saved locally: {:?} (Total: {} records)", self.path, records.len());

        Ok(outcome)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(day: u32, best: &str) -> PriceRecord {
        PriceRecord {
            observation_date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            initial_price: Some("1200".to_string()),
            best_price: Some(best.to_string()),
            stay_start: NaiveDate::from_ymd_opt(2026, 12, 13).unwrap(),
            stay_end: NaiveDate::from_ymd_opt(2026, 12, 19).unwrap(),
            party_adults: 2,
            party_kids: 2,
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = LocalLedger::new(dir.path().join("history.csv"));
        assert!(ledger.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_creates_parent_dirs_and_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.csv");
        let ledger = LocalLedger::new(&path);

        ledger.upsert(record(1, "1000")).await.unwrap();

        assert!(path.exists());
        assert!(!ledger.staging_path().exists());
        assert_eq!(ledger.load().await.unwrap(), vec![record(1, "1000")]);
    }

    #[tokio::test]
    async fn test_unreadable_path_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as a ledger.
        let ledger = LocalLedger::new(dir.path());
        match ledger.load().await {
            Err(AppError::StorageUnavailable(_)) => {}
            other => panic!("expected StorageUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        let garbage = "price_check_date,initial_price,best_price,start_date,end_date,number_of_adults,number_of_kids\nyesterday,1,1,x,y,two,2\n";
        std::fs::write(&path, garbage).unwrap();

        let ledger = LocalLedger::new(&path);
        let result = ledger.upsert(record(2, "900")).await;

        assert!(matches!(result, Err(AppError::CorruptLedger(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), garbage);
    }
}
