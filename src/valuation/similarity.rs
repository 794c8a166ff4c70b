//! Multi-factor similarity between a subject and one comparable

use crate::error::{ensure_finite, Result};
use crate::valuation::geo::comparable_distance_km;
use crate::valuation::types::{Comparable, Subject};

pub const MIN_SIMILARITY: f64 = 0.1;

const AREA_WEIGHT: f64 = 0.30;
const AGE_WEIGHT: f64 = 0.20;
const ROOMS_WEIGHT: f64 = 0.15;
const CONDITION_WEIGHT: f64 = 0.10;
const DISTANCE_WEIGHT: f64 = 0.05;
const TYPE_MISMATCH_PENALTY: f64 = 0.20;

const AGE_SPAN_YEARS: f64 = 50.0;
const AGE_CAP: f64 = 0.20;
const ROOMS_CAP: f64 = 0.15;
const DISTANCE_SPAN_KM: f64 = 5.0;

/// Score in [0.1, 1.0]; 1.0 means identical in every dimension at zero distance.
///
/// The area term is deliberately left uncapped, so very large size
/// mismatches saturate at the 0.1 floor.
pub fn similarity(subject: &Subject, comparable: &Comparable) -> Result<f64> {
    subject.validate()?;
    let distance_km = comparable_distance_km(subject, comparable)?;

    let mut score = 1.0;

    let area_diff = (subject.area_sqm - comparable.area_sqm).abs() / subject.area_sqm;
    score -= area_diff * AREA_WEIGHT;

    let year_gap = (subject.year_built as f64 - comparable.year_built as f64).abs();
    let age_diff = (year_gap / AGE_SPAN_YEARS).min(AGE_CAP);
    score -= age_diff * AGE_WEIGHT;

    let room_diff = ((subject.rooms as f64 - comparable.rooms as f64).abs()
        / subject.rooms.max(1) as f64)
        .min(ROOMS_CAP);
    score -= room_diff * ROOMS_WEIGHT;

    if subject.property_type != comparable.property_type {
        score -= TYPE_MISMATCH_PENALTY;
    }

    let condition_diff =
        (subject.condition.ordinal() - comparable.condition.ordinal()).abs() as f64 / 3.0;
    score -= condition_diff * CONDITION_WEIGHT;

    score -= (distance_km / DISTANCE_SPAN_KM).min(1.0) * DISTANCE_WEIGHT;

    let score = ensure_finite(score, "similarity")?;
    Ok(score.clamp(MIN_SIMILARITY, 1.0))
}
