use regex::Regex;
use tracing::debug;

/// Prices as displayed on the page, thousands separators included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPrices {
    pub initial_price: Option<String>,
    pub best_price: Option<String>,
}

/// Pulls the initial and best price out of a booking page.
///
/// Patterns are tried in order, each only for a price still missing:
/// 1. screen-reader spans: `<span class="sr-only">Best price</span> $8,450`
/// 2. embedded JSON: `"bestPrice": 8450`
/// 3. loose fallbacks: a `<del>` block for the initial price, a bare
///    `Best price</span> $N` for the best price
pub struct PriceExtractor {
    sr_initial: Regex,
    sr_best: Regex,
    json_initial: Vec<Regex>,
    json_best: Vec<Regex>,
    fallback_initial: Regex,
    fallback_best: Regex,
}

impl PriceExtractor {
    pub fn new() -> Self {
        let re = |pattern: &str| Regex::new(pattern).expect("static price pattern");
        Self {
            sr_initial: re(r#"(?i)<span[^>]*class="sr-only"[^>]*>Initial\s+price\s*</span>\s*\$\s*([\d,]+)"#),
            sr_best: re(r#"(?i)<span[^>]*class="sr-only"[^>]*>Best\s+price\s*</span>\s*\$\s*([\d,]+)"#),
            json_initial: vec![
                re(r#""initialPrice"\s*:\s*(\d+)"#),
                re(r#""initial[Pp]rice"\s*:\s*["']?\$?\s*(\d+)"#),
            ],
            json_best: vec![
                re(r#""bestPrice"\s*:\s*(\d+)"#),
                re(r#""best[Pp]rice"\s*:\s*["']?\$?\s*(\d+)"#),
            ],
            fallback_initial: re(r"(?is)<del[^>]*>.*?Initial\s+price.*?\$\s*([\d,]+)"),
            fallback_best: re(r"(?i)Best\s+price\s*</span>\s*\$\s*([\d,]+)"),
        }
    }

    pub fn extract(&self, html: &str) -> ExtractedPrices {
        let mut prices = ExtractedPrices {
            initial_price: capture(&self.sr_initial, html),
            best_price: capture(&self.sr_best, html),
        };

        if prices.initial_price.is_none() {
            prices.initial_price = first_json_match(&self.json_initial, html);
        }
        if prices.best_price.is_none() {
            prices.best_price = first_json_match(&self.json_best, html);
        }

        if prices.initial_price.is_none() {
            prices.initial_price = capture(&self.fallback_initial, html);
        }
        if prices.best_price.is_none() {
            prices.best_price = capture(&self.fallback_best, html);
        }

        debug!(
            "Extracted prices: initial={:?} best={:?}",
            prices.initial_price, prices.best_price
        );
        prices
    }
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn capture(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()))
}

// JSON values are bare digits; present them the way the page displays prices.
fn first_json_match(patterns: &[Regex], html: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| capture(re, html))
        .map(|digits| group_thousands(&digits))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_reader_spans() {
        let html = r#"
            <div><span class="sr-only">Initial price </span> $ 9,870</div>
            <div><span class="sr-only" aria-hidden="false">Best price</span>$8,450</div>
        "#;
        let prices = PriceExtractor::new().extract(html);
        assert_eq!(prices.initial_price.as_deref(), Some("9,870"));
        assert_eq!(prices.best_price.as_deref(), Some("8,450"));
    }

    #[test]
    fn test_embedded_json() {
        let html = r#"<script>window.__STATE__ = {"initialPrice": 9870, "bestPrice":845}</script>"#;
        let prices = PriceExtractor::new().extract(html);
        assert_eq!(prices.initial_price.as_deref(), Some("9,870"));
        assert_eq!(prices.best_price.as_deref(), Some("845"));
    }

    #[test]
    fn test_json_with_quoted_dollar_value() {
        let html = r#"{"initialprice": "$12000", "bestprice": '$10500'}"#;
        let prices = PriceExtractor::new().extract(html);
        assert_eq!(prices.initial_price.as_deref(), Some("12,000"));
        assert_eq!(prices.best_price.as_deref(), Some("10,500"));
    }

    #[test]
    fn test_fallback_patterns() {
        let html = "<del class=\"old\">\n  <span>Initial price</span>\n  $9,870</del>\n<b>Best price</span> $8,450</b>";
        let prices = PriceExtractor::new().extract(html);
        assert_eq!(prices.initial_price.as_deref(), Some("9,870"));
        assert_eq!(prices.best_price.as_deref(), Some("8,450"));
    }

    #[test]
    fn test_no_prices() {
        let prices = PriceExtractor::new().extract("<html><body>Sold out</body></html>");
        assert_eq!(prices, ExtractedPrices::default());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("845"), "845");
        assert_eq!(group_thousands("8450"), "8,450");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }
}
