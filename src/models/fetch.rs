use serde::{Deserialize, Serialize};

/// What the page fetcher hands to the core for one check.
///
/// Prices arrive as displayed upstream and may carry thousands separators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub success: bool,
    pub initial_price: Option<String>,
    pub best_price: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn failed(start_date: &str, end_date: &str, url: Option<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            url,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Both prices present and non-blank.
    pub fn has_prices(&self) -> bool {
        let present = |p: &Option<String>| p.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.initial_price) && present(&self.best_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_prices_requires_both() {
        let mut outcome = FetchOutcome {
            success: true,
            initial_price: Some("1,200".into()),
            best_price: Some("1,000".into()),
            ..Default::default()
        };
        assert!(outcome.has_prices());

        outcome.best_price = Some("  ".into());
        assert!(!outcome.has_prices());

        outcome.best_price = None;
        assert!(!outcome.has_prices());
    }

    #[test]
    fn test_failed_outcome_carries_error() {
        let outcome = FetchOutcome::failed("2026-12-13", "2026-12-19", None, "timeout");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("timeout"));
        assert!(!outcome.has_prices());
    }
}
