use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::PriceRecord;

/// Ledger columns, in the order they are always written.
pub const LEDGER_HEADER: [&str; 7] = [
    "price_check_date",
    "initial_price",
    "best_price",
    "start_date",
    "end_date",
    "number_of_adults",
    "number_of_kids",
];

// Field order must match LEDGER_HEADER.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerRow {
    price_check_date: NaiveDate,
    initial_price: Option<String>,
    best_price: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_adults: u32,
    number_of_kids: u32,
}

impl From<&PriceRecord> for LedgerRow {
    fn from(record: &PriceRecord) -> Self {
        Self {
            price_check_date: record.observation_date,
            initial_price: record.initial_price.clone(),
            best_price: record.best_price.clone(),
            start_date: record.stay_start,
            end_date: record.stay_end,
            number_of_adults: record.party_adults,
            number_of_kids: record.party_kids,
        }
    }
}

impl From<LedgerRow> for PriceRecord {
    fn from(row: LedgerRow) -> Self {
        Self {
            observation_date: row.price_check_date,
            initial_price: row.initial_price.filter(|p| !p.is_empty()),
            best_price: row.best_price.filter(|p| !p.is_empty()),
            stay_start: row.start_date,
            stay_end: row.end_date,
            party_adults: row.number_of_adults,
            party_kids: row.number_of_kids,
        }
    }
}

/// Serialize the full ledger. The header is written even when there are no rows.
pub fn encode_ledger(records: &[PriceRecord]) -> Result<String, AppError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(LEDGER_HEADER)?;
    for record in records {
        writer.serialize(LedgerRow::from(record))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::CorruptLedger(format!("Failed to flush ledger: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| AppError::CorruptLedger(format!("Ledger is not UTF-8: {}", e)))
}

/// Parse ledger content. Columns are matched by header name, so files written
/// with a different column order still decode. Only header names are trimmed;
/// field values are kept verbatim so untouched rows are rewritten unchanged.
pub fn decode_ledger(content: &str) -> Result<Vec<PriceRecord>, AppError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for (line_num, result) in reader.deserialize::<LedgerRow>().enumerate() {
        let row = result.map_err(|e| {
            AppError::CorruptLedger(format!("Line {}: {}", line_num + 2, e))
        })?;
        records.push(PriceRecord::from(row));
    }

    Ok(records)
}
