use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::PriceRecord;

// ==============================================================================
// Price Change Models
// ==============================================================================

/// A differing best price between the two most recent ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub previous: PriceRecord,
    pub latest: PriceRecord,
    /// `latest - previous` when both sides are numeric, otherwise 0.
    pub price_difference: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Unknown,
}

impl PriceChange {
    pub fn previous_date(&self) -> NaiveDate {
        self.previous.observation_date
    }

    pub fn latest_date(&self) -> NaiveDate {
        self.latest.observation_date
    }

    /// A zero difference carries no direction: either side may be missing.
    pub fn direction(&self) -> Direction {
        match self.price_difference {
            d if d > 0 => Direction::Up,
            d if d < 0 => Direction::Down,
            _ => Direction::Unknown,
        }
    }

    pub fn magnitude(&self) -> i64 {
        self.price_difference.abs()
    }
}

/// Result of comparing the last two ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Comparison {
    NotEnoughData,
    NoChange,
    Changed(PriceChange),
}

impl Comparison {
    pub fn change(&self) -> Option<&PriceChange> {
        match self {
            Comparison::Changed(change) => Some(change),
            _ => None,
        }
    }
}
