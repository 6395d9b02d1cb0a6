use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// One dated price observation. `observation_date` is the ledger key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub observation_date: NaiveDate,
    pub initial_price: Option<String>,  // digit-only text, never reformatted
    pub best_price: Option<String>,
    pub stay_start: NaiveDate,
    pub stay_end: NaiveDate,
    pub party_adults: u32,
    pub party_kids: u32,
}

impl PriceRecord {
    pub fn new(
        observation_date: NaiveDate,
        initial_price: Option<&str>,
        best_price: Option<&str>,
        stay: &StayWindow,
    ) -> Self {
        Self {
            observation_date,
            initial_price: initial_price.and_then(normalize_price),
            best_price: best_price.and_then(normalize_price),
            stay_start: stay.start,
            stay_end: stay.end,
            party_adults: stay.adults,
            party_kids: stay.kids,
        }
    }

    /// Best price as an integer, when the stored text is purely numeric.
    pub fn best_price_value(&self) -> Option<i64> {
        self.best_price.as_deref().and_then(parse_numeric_price)
    }
}

/// The booked date range and party size being priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub adults: u32,
    pub kids: u32,
}

/// Strip thousands separators and surrounding whitespace from an upstream
/// price. Returns `None` when nothing is left.
pub fn normalize_price(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// A price is numeric when it is a non-empty run of ASCII digits.
pub fn parse_numeric_price(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i64>().ok()
}
