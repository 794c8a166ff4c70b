//! Valuation settings loaded from environment variables

use crate::error::{Result, ValuationError};
use crate::valuation::ensemble::ModelWeights;
use crate::valuation::models::MIN_CONFIDENCE_LEVEL;
use crate::valuation::types::ComparableFilter;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 95.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ValuationConfig {
    pub filter: ComparableFilter,
    pub model_weights: ModelWeights,
    /// Percent level of reported confidence ranges
    pub confidence_level_pct: f64,
    /// Fixed valuation date; today when unset
    pub valuation_date: Option<NaiveDate>,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        ValuationConfig {
            filter: ComparableFilter::default(),
            model_weights: ModelWeights::new(),
            confidence_level_pct: DEFAULT_CONFIDENCE_LEVEL,
            valuation_date: None,
        }
    }
}

impl ValuationConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys keep their defaults; set but
    /// malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ValuationConfig::default();

        let filter = ComparableFilter {
            max_distance_km: parse_var(&lookup, "MAX_DISTANCE_KM")?
                .unwrap_or(defaults.filter.max_distance_km),
            min_similarity: parse_var(&lookup, "MIN_SIMILARITY")?
                .unwrap_or(defaults.filter.min_similarity),
            verified_only: parse_var(&lookup, "VERIFIED_ONLY")?
                .unwrap_or(defaults.filter.verified_only),
            same_type_only: parse_var(&lookup, "SAME_TYPE_ONLY")?
                .unwrap_or(defaults.filter.same_type_only),
            max_comparables: parse_var(&lookup, "MAX_COMPARABLES")?
                .unwrap_or(defaults.filter.max_comparables),
        };

        if !filter.max_distance_km.is_finite() || filter.max_distance_km <= 0.0 {
            return Err(ValuationError::Config(
                "MAX_DISTANCE_KM must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&filter.min_similarity) {
            return Err(ValuationError::Config(
                "MIN_SIMILARITY must be within [0, 1]".to_string(),
            ));
        }

        let model_weights = match lookup("MODEL_WEIGHTS") {
            Some(raw) => parse_model_weights(&raw)?,
            None => defaults.model_weights,
        };

        let confidence_level_pct = parse_var(&lookup, "CONFIDENCE_LEVEL")?
            .unwrap_or(defaults.confidence_level_pct);
        if !(MIN_CONFIDENCE_LEVEL..100.0).contains(&confidence_level_pct) {
            return Err(ValuationError::Config(format!(
                "CONFIDENCE_LEVEL must be at least {} and below 100",
                MIN_CONFIDENCE_LEVEL
            )));
        }

        let valuation_date = match lookup("VALUATION_DATE") {
            Some(raw) => Some(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                ValuationError::Config(format!("VALUATION_DATE must be YYYY-MM-DD, got '{}'", raw))
            })?),
            None => None,
        };

        Ok(ValuationConfig {
            filter,
            model_weights,
            confidence_level_pct,
            valuation_date,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ValuationError::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(None),
    }
}

/// Parse `model=weight` pairs separated by commas, e.g.
/// "weighted_comparables=1,price_per_sqm=0.6". Weights must lie in [0, 1].
pub fn parse_model_weights(raw: &str) -> Result<ModelWeights> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (model_id, weight) = pair.split_once('=').ok_or_else(|| {
                ValuationError::Config(format!("model weight '{}' is not model=weight", pair))
            })?;

            let weight: f64 = weight.trim().parse().map_err(|_| {
                ValuationError::Config(format!("model weight '{}' is not a number", pair))
            })?;
            if !(0.0..=1.0).contains(&weight) {
                return Err(ValuationError::Config(format!(
                    "model weight for '{}' must be within [0, 1], got {}",
                    model_id.trim(),
                    weight
                )));
            }

            Ok((model_id.trim().to_string(), weight))
        })
        .collect()
}
