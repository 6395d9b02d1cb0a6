use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::external::price_extractor::PriceExtractor;
use crate::models::{FetchOutcome, StayWindow};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// What to price: the stay window plus the kids' birthdates the site asks for.
#[derive(Debug, Clone)]
pub struct StayRequest {
    pub stay: StayWindow,
    pub birthdates: Vec<String>,
}

impl StayRequest {
    pub fn start_date(&self) -> String {
        self.stay.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_date(&self) -> String {
        self.stay.end.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page for `request` and extract its prices. Failures are
    /// reported inside the outcome, not as an error.
    async fn fetch_prices(&self, request: &StayRequest) -> FetchOutcome;
}

/// Plain HTTP fetch. Pages that only render prices through JavaScript will
/// come back without prices.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    base_url: String,
    extractor: PriceExtractor,
}

impl HttpPageFetcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            extractor: PriceExtractor::new(),
        })
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::BadResponse(format!(
                "page returned status: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::BadResponse(format!("Failed to read response: {}", e)))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_prices(&self, request: &StayRequest) -> FetchOutcome {
        let start_date = request.start_date();
        let end_date = request.end_date();

        let url = match build_url(&self.base_url, request) {
            Ok(url) => url,
            Err(e) => return FetchOutcome::failed(&start_date, &end_date, None, e.to_string()),
        };

        info!("Fetching prices for {} to {}...", start_date, end_date);

        match self.fetch_page(&url).await {
            Ok(html) => {
                let prices = self.extractor.extract(&html);
                FetchOutcome {
                    success: true,
                    initial_price: prices.initial_price,
                    best_price: prices.best_price,
                    start_date,
                    end_date,
                    url: Some(url.to_string()),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                FetchOutcome::failed(&start_date, &end_date, Some(url.to_string()), e.to_string())
            }
        }
    }
}

/// `{base}?adults=..&children=..&birthdates=..&start_date=..&end_date=..`
pub fn build_url(base_url: &str, request: &StayRequest) -> Result<Url, FetchError> {
    let adults = request.stay.adults.to_string();
    let children = request.stay.kids.to_string();
    let start_date = request.start_date();
    let end_date = request.end_date();

    let mut params: Vec<(&str, &str)> = vec![("adults", adults.as_str()), ("children", children.as_str())];
    for birthdate in &request.birthdates {
        params.push(("birthdates", birthdate.as_str()));
    }
    params.push(("start_date", start_date.as_str()));
    params.push(("end_date", end_date.as_str()));

    Url::parse_with_params(base_url, &params).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request() -> StayRequest {
        StayRequest {
            stay: StayWindow {
                start: NaiveDate::from_ymd_opt(2026, 12, 13).unwrap(),
                end: NaiveDate::from_ymd_opt(2026, 12, 19).unwrap(),
                adults: 2,
                kids: 2,
            },
            birthdates: vec!["2015-05-08".to_string(), "2018-07-08".to_string()],
        }
    }

    #[test]
    fn test_build_url_query_order() {
        let url = build_url("https://example.com/path", &request()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/path?adults=2&children=2&birthdates=2015-05-08&birthdates=2018-07-08&start_date=2026-12-13&end_date=2026-12-19"
        );
    }

    #[test]
    fn test_build_url_rejects_relative_base() {
        assert!(matches!(
            build_url("not a url", &request()),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_failed_outcome() {
        let fetcher = HttpPageFetcher::new("not a url").unwrap();
        let outcome = fetcher.fetch_prices(&request()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.start_date, "2026-12-13");
        assert!(outcome.error.is_some());
    }
}
