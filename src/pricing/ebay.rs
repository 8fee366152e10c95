//! eBay sold-listings price provider
//!
//! Scrapes the public sold/completed listings search page. Lot and bundle
//! listings and strikethrough pricing blocks are skipped; positive prices are
//! collected in page order up to the sample cap.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

use super::PriceProvider;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct EbayProvider {
    client: reqwest::blocking::Client,
    item: Selector,
    title: Selector,
    price: Selector,
    strikethrough: Selector,
    price_re: Regex,
    multiplier_re: Regex,
}

impl EbayProvider {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            item: parse_selector(".s-item")?,
            title: parse_selector(".s-item__title")?,
            price: parse_selector(".s-item__price")?,
            strikethrough: parse_selector(".STRIKETHROUGH")?,
            price_re: Regex::new(r"\$([\d,.]+)").context("invalid price pattern")?,
            // Quantity multipliers like "4x", "x4", "10 x" mark lot listings.
            multiplier_re: Regex::new(r"(?i)\b\d+\s*x\b|\bx\s*\d+\b")
                .context("invalid multiplier pattern")?,
        })
    }

    fn fetch(&self, query: &str, max_samples: usize) -> Result<Vec<f64>> {
        let url = reqwest::Url::parse_with_params(
            "https://www.ebay.com/sch/i.html",
            &[
                ("_nkw", format!("{query} trading card").as_str()),
                ("_sacat", "0"),
                ("LH_Sold", "1"),
                ("LH_Complete", "1"),
            ],
        )
        .context("failed to build search URL")?;

        debug!(%url, "fetching sold listings");
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .context("search request failed")?
            .text()
            .context("failed to read search response")?;

        Ok(self.parse_prices(&body, max_samples))
    }

    /// Extract prices from a results page, preserving page order.
    fn parse_prices(&self, body: &str, max_samples: usize) -> Vec<f64> {
        let document = Html::parse_document(body);
        let mut prices = Vec::new();

        for item in document.select(&self.item) {
            if prices.len() >= max_samples {
                break;
            }

            let text = item.text().collect::<String>();
            if text.contains("AdChoice") {
                continue;
            }

            let Some(title) = item.select(&self.title).next() else {
                continue;
            };
            let title_text = title.text().collect::<String>().to_lowercase();
            if title_text.contains("lot")
                || title_text.contains("bundle")
                || self.multiplier_re.is_match(&title_text)
            {
                continue;
            }

            let Some(price_tag) = item.select(&self.price).next() else {
                continue;
            };
            // Discounted listings show the original price struck through.
            if item.select(&self.strikethrough).next().is_some() {
                continue;
            }

            let price_text = price_tag.text().collect::<String>();
            if let Some(price) = self.extract_price(&price_text) {
                if price > 0.0 {
                    prices.push(price);
                }
            }
        }

        prices
    }

    fn extract_price(&self, text: &str) -> Option<f64> {
        let captures = self.price_re.captures(text)?;
        captures[1].replace(',', "").parse().ok()
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{css}': {e}"))
}

impl PriceProvider for EbayProvider {
    fn name(&self) -> &str {
        "eBay"
    }

    fn search(&self, query: &str, max_samples: usize) -> Vec<f64> {
        match self.fetch(query, max_samples) {
            Ok(prices) => {
                debug!(query, count = prices.len(), "collected price samples");
                prices
            }
            Err(e) => {
                warn!(query, error = %e, "price search failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, price: &str, extra: &str) -> String {
        format!(
            r#"<li class="s-item"><div class="s-item__title">{title}</div>
               <span class="s-item__price">{price}</span>{extra}</li>"#
        )
    }

    fn page(items: &[String]) -> String {
        format!("<html><body><ul>{}</ul></body></html>", items.join(""))
    }

    #[test]
    fn test_parses_prices_in_page_order() {
        let provider = EbayProvider::new().unwrap();
        let body = page(&[
            item("Charizard Holo", "$12.50", ""),
            item("Charizard Base Set", "$1,000.00", ""),
            item("Charizard Damaged", "$8.00", ""),
        ]);
        assert_eq!(provider.parse_prices(&body, 10), vec![12.5, 1000.0, 8.0]);
    }

    #[test]
    fn test_skips_lot_bundle_and_multiplier_listings() {
        let provider = EbayProvider::new().unwrap();
        let body = page(&[
            item("Charizard lot of 5", "$50.00", ""),
            item("Pokemon bundle deal", "$30.00", ""),
            item("Charizard 4x playset", "$40.00", ""),
            item("Onix 1st edition", "$9.00", ""),
        ]);
        // "Onix" contains the letter x but is not a multiplier.
        assert_eq!(provider.parse_prices(&body, 10), vec![9.0]);
    }

    #[test]
    fn test_skips_strikethrough_price_blocks() {
        let provider = EbayProvider::new().unwrap();
        let body = page(&[
            item("Mew Promo", "$20.00", r#"<span class="STRIKETHROUGH">$25.00</span>"#),
            item("Mew Promo", "$18.00", ""),
        ]);
        assert_eq!(provider.parse_prices(&body, 10), vec![18.0]);
    }

    #[test]
    fn test_truncates_to_max_samples() {
        let provider = EbayProvider::new().unwrap();
        let items: Vec<String> = (1..=6)
            .map(|i| item("Pikachu Promo", &format!("${i}.00"), ""))
            .collect();
        assert_eq!(provider.parse_prices(&page(&items), 3), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ignores_items_without_title_or_price() {
        let provider = EbayProvider::new().unwrap();
        let body = page(&[
            r#"<li class="s-item"><span class="s-item__price">$5.00</span></li>"#.to_string(),
            r#"<li class="s-item"><div class="s-item__title">Eevee</div></li>"#.to_string(),
        ]);
        assert!(provider.parse_prices(&body, 10).is_empty());
    }
}
