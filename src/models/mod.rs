mod fetch;
mod price_change;
mod record;

pub use fetch::FetchOutcome;
pub use price_change::{Comparison, Direction, PriceChange};
pub use record::{normalize_price, parse_numeric_price, PriceRecord, StayWindow};
