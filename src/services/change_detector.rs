use tracing::info;

use crate::models::{parse_numeric_price, Comparison, PriceChange, PriceRecord};

// ==============================================================================
// Price Change Detection
// ==============================================================================

/// Compare the best price of the last two ledger rows by position.
///
/// Prices are compared as stored text, so `"100"` and `"100.0"` differ and two
/// missing prices are equal. Rows before the second-to-last are never read.
pub fn detect_price_change(records: &[PriceRecord]) -> Comparison {
    let (previous, latest) = match records {
        [.., previous, latest] => (previous, latest),
        _ => {
            info!("Not enough entries to compare ({} in ledger)", records.len());
            return Comparison::NotEnoughData;
        }
    };

    info!(
        "Comparing: {} (${}) vs {} (${})",
        previous.observation_date,
        display_price(&previous.best_price),
        latest.observation_date,
        display_price(&latest.best_price),
    );

    if latest.best_price == previous.best_price {
        return Comparison::NoChange;
    }

    Comparison::Changed(PriceChange {
        previous: previous.clone(),
        latest: latest.clone(),
        price_difference: price_difference(&previous.best_price, &latest.best_price),
    })
}

/// `latest - previous` when both are digit-only, otherwise 0.
fn price_difference(previous: &Option<String>, latest: &Option<String>) -> i64 {
    let previous = previous.as_deref().and_then(parse_numeric_price);
    let latest = latest.as_deref().and_then(parse_numeric_price);

    match (previous, latest) {
        (Some(previous), Some(latest)) => latest - previous,
        _ => 0,
    }
}

fn display_price(price: &Option<String>) -> &str {
    price.as_deref().unwrap_or("")
}
