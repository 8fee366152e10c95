//! Price aggregation
//!
//! Reduces a noisy set of scraped price samples to a single representative
//! value under a selectable policy. The search side is an opaque
//! [`PriceProvider`]; failures there surface as empty sample sets, never as
//! errors.

pub mod ebay;
pub mod enrich;

use serde::{Deserialize, Serialize};

/// Opaque market-price search service.
pub trait PriceProvider: Send {
    /// Display name for logs and reports.
    fn name(&self) -> &str;

    /// Positive price samples in the service's natural ranking order,
    /// truncated to `max_samples`. Network or parsing failures yield an
    /// empty vec.
    fn search(&self, query: &str, max_samples: usize) -> Vec<f64>;
}

/// How a sample set is reduced to one representative price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PricePolicy {
    /// Statistical median of the raw samples.
    #[default]
    RobustMedian,
    /// Mean-based outlier filter, then the first remaining sample in fetch
    /// order (approximates the most recent sold listing).
    RecentFiltered,
}

impl PricePolicy {
    pub fn label(&self) -> &'static str {
        match self {
            PricePolicy::RobustMedian => "Median",
            PricePolicy::RecentFiltered => "Most Recent",
        }
    }

    /// Column name the enrichment step appends.
    pub fn column_name(&self) -> String {
        format!("Price ({})", self.label())
    }
}

impl std::str::FromStr for PricePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "median" => Ok(PricePolicy::RobustMedian),
            "recent" => Ok(PricePolicy::RecentFiltered),
            other => Err(format!("unknown price policy '{other}' (expected 'median' or 'recent')")),
        }
    }
}

/// Reduce a sample set to one value under `policy`, rounded to 2 decimal
/// places. `None` when the sample set is empty.
pub fn representative_price(samples: &[f64], policy: PricePolicy) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let value = match policy {
        PricePolicy::RobustMedian => median(samples),
        PricePolicy::RecentFiltered => recent_filtered(samples),
    };
    Some(round2(value))
}

fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Discard samples at or above 1.5x the mean (inflated/lot listings), then
/// take the first remaining sample in fetch order. When the filter removes
/// everything, fall back to the very first raw sample.
fn recent_filtered(samples: &[f64]) -> f64 {
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let cutoff = mean * 1.5;
    samples
        .iter()
        .copied()
        .find(|p| *p < cutoff)
        .unwrap_or(samples[0])
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_count() {
        assert_eq!(
            representative_price(&[10.0, 12.0, 1000.0], PricePolicy::RobustMedian),
            Some(12.0)
        );
    }

    #[test]
    fn test_median_even_count_averages_middle_pair() {
        assert_eq!(
            representative_price(&[4.0, 1.0, 3.0, 2.0], PricePolicy::RobustMedian),
            Some(2.5)
        );
    }

    #[test]
    fn test_recent_filtered_discards_outliers() {
        // mean = 340.67, cutoff = 511; 1000 is discarded, 10 is first in order.
        assert_eq!(
            representative_price(&[10.0, 12.0, 1000.0], PricePolicy::RecentFiltered),
            Some(10.0)
        );
    }

    #[test]
    fn test_recent_filtered_preserves_fetch_order_not_magnitude() {
        // mean = 20.67, cutoff = 31; 30 survives the filter and is first in
        // fetch order even though later samples are cheaper.
        assert_eq!(
            representative_price(&[30.0, 12.0, 20.0], PricePolicy::RecentFiltered),
            Some(30.0)
        );
    }

    #[test]
    fn test_recent_filtered_single_sample() {
        assert_eq!(
            representative_price(&[100.0], PricePolicy::RecentFiltered),
            Some(100.0)
        );
    }

    #[test]
    fn test_empty_samples_yield_none_under_both_policies() {
        assert_eq!(representative_price(&[], PricePolicy::RobustMedian), None);
        assert_eq!(representative_price(&[], PricePolicy::RecentFiltered), None);
    }

    #[test]
    fn test_results_round_to_two_decimals() {
        assert_eq!(
            representative_price(&[10.005, 10.005], PricePolicy::RobustMedian),
            Some(10.01)
        );
        assert_eq!(
            representative_price(&[3.333], PricePolicy::RecentFiltered),
            Some(3.33)
        );
    }

    #[test]
    fn test_policy_parsing_and_column_names() {
        assert_eq!("median".parse::<PricePolicy>(), Ok(PricePolicy::RobustMedian));
        assert_eq!("RECENT".parse::<PricePolicy>(), Ok(PricePolicy::RecentFiltered));
        assert!("average".parse::<PricePolicy>().is_err());
        assert_eq!(PricePolicy::RobustMedian.column_name(), "Price (Median)");
        assert_eq!(PricePolicy::RecentFiltered.column_name(), "Price (Most Recent)");
    }
}
