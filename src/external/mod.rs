pub mod page_fetcher;
pub mod price_extractor;
