//! Ledger persistence.
//!
//! The ledger is the ordered list of [`PriceRecord`]s, one per observation
//! date, stored as CSV. Two interchangeable backends implement
//! [`LedgerStore`]:
//!
//! - [`LocalLedger`]: a file on disk, replaced atomically via rename
//! - [`ObjectLedger`]: a single object in a remote object store, written with
//!   `Cache-Control: no-cache`
//!
//! Both backends share the upsert rule in [`merge_record`] and the CSV
//! mapping in [`csv_codec`].

pub mod csv_codec;
pub mod local;
pub mod object;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::PriceRecord;

pub use local::LocalLedger;
pub use object::{ObjectClient, ObjectLedger, PutDirectives, StoreClient};

/// What an upsert did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted { position: usize },
    Updated { position: usize },
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// All rows in stored order. A ledger that does not exist yet is empty.
    async fn load(&self) -> Result<Vec<PriceRecord>, AppError>;

    /// Replace the row with the same observation date in place, or append.
    /// The whole ledger is written back in one atomic step.
    async fn upsert(&self, record: PriceRecord) -> Result<UpsertOutcome, AppError>;

    /// Where the ledger lives, for logs and reports.
    fn location(&self) -> String;
}

/// Apply the upsert rule to an in-memory ledger.
pub fn merge_record(records: &mut Vec<PriceRecord>, record: PriceRecord) -> UpsertOutcome {
    match records
        .iter()
        .position(|r| r.observation_date == record.observation_date)
    {
        Some(position) => {
            records[position] = record;
            UpsertOutcome::Updated { position }
        }
        None => {
            records.push(record);
            UpsertOutcome::Inserted {
                position: records.len() - 1,
            }
        }
    }
}
