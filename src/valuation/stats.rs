//! Descriptive market statistics over a comparable set

use crate::valuation::types::{Comparable, MarketStats};

/// Aggregate statistics on raw sale prices. Empty input yields all zeros.
pub fn market_stats(comparables: &[Comparable]) -> MarketStats {
    if comparables.is_empty() {
        return MarketStats::default();
    }

    let count = comparables.len();

    let prices: Vec<f64> = comparables.iter().map(|c| c.sale_price).collect();
    let price_per_sqm: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.price_per_sqm())
        .collect();

    let avg_days_on_market =
        comparables.iter().map(|c| c.days_on_market as f64).sum::<f64>() / count as f64;

    MarketStats {
        count,
        avg_price: mean(&prices),
        median_price: upper_median(&prices),
        avg_price_per_sqm: mean(&price_per_sqm),
        median_price_per_sqm: upper_median(&price_per_sqm),
        avg_days_on_market,
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Middle element of the sorted values; even lengths take the upper of
/// the two middle elements rather than interpolating
pub(crate) fn upper_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted[sorted.len() / 2]
}
