// Library module for testable functions

pub mod config;
pub mod error;
pub mod valuation;

pub use error::{Result, ValuationError};

/// Price per square metre
/// Formula: price / area_sqm
pub fn price_per_sqm(price: f64, area_sqm: f64) -> Option<f64> {
    if area_sqm <= 0.0 || !area_sqm.is_finite() || !price.is_finite() {
        return None;
    }
    Some(price / area_sqm)
}
