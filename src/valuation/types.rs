//! Core data types for the valuation engine
//! Value types only; every transform returns a new value

use crate::error::{Result, ValuationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coordinates { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Out-of-range (or NaN) positions are rejected, never clamped
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValuationError::InvalidCoordinates {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

/// Physical condition of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Condition {
    /// Ordinal rank: poor=1 .. excellent=4
    pub fn ordinal(&self) -> i32 {
        match self {
            Condition::Poor => 1,
            Condition::Fair => 2,
            Condition::Good => 3,
            Condition::Excellent => 4,
        }
    }

    /// Price adjustment relative to a property in good condition
    pub fn price_factor(&self) -> f64 {
        match self {
            Condition::Poor => -0.15,
            Condition::Fair => -0.05,
            Condition::Good => 0.0,
            Condition::Excellent => 0.10,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Excellent => write!(f, "excellent"),
            Condition::Good => write!(f, "good"),
            Condition::Fair => write!(f, "fair"),
            Condition::Poor => write!(f, "poor"),
        }
    }
}

impl FromStr for Condition {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "poor" => Ok(Condition::Poor),
            other => Err(ValuationError::Parse(format!("unknown condition '{}'", other))),
        }
    }
}

/// Property types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Penthouse,
    Studio,
    Duplex,
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyType::Apartment => write!(f, "apartment"),
            PropertyType::House => write!(f, "house"),
            PropertyType::Penthouse => write!(f, "penthouse"),
            PropertyType::Studio => write!(f, "studio"),
            PropertyType::Duplex => write!(f, "duplex"),
        }
    }
}

impl FromStr for PropertyType {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "apartment" => Ok(PropertyType::Apartment),
            "house" => Ok(PropertyType::House),
            "penthouse" => Ok(PropertyType::Penthouse),
            "studio" => Ok(PropertyType::Studio),
            "duplex" => Ok(PropertyType::Duplex),
            other => Err(ValuationError::Parse(format!(
                "unknown property type '{}'",
                other
            ))),
        }
    }
}

/// The property being valued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub location: Coordinates,
    pub area_sqm: f64,
    pub year_built: i32,
    pub rooms: u32,
    pub bathrooms: u32,
    pub condition: Condition,
    pub property_type: PropertyType,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Subject {
    /// Checked before any scoring runs
    pub fn validate(&self) -> Result<()> {
        self.location.validate()?;

        if !self.area_sqm.is_finite() || self.area_sqm <= 0.0 {
            return Err(ValuationError::InvalidSubject(format!(
                "{}: area must be positive, got {}",
                self.id, self.area_sqm
            )));
        }
        if self.rooms == 0 {
            return Err(ValuationError::InvalidSubject(format!(
                "{}: room count must be positive",
                self.id
            )));
        }
        if self.bathrooms == 0 {
            return Err(ValuationError::InvalidSubject(format!(
                "{}: bathroom count must be positive",
                self.id
            )));
        }

        Ok(())
    }
}

/// A closed sale used as pricing evidence.
///
/// The `distance_m`, `similarity`, `adjustments` and `adjusted_price` fields
/// are derived by [`crate::valuation::enrich`] and are `None` on a freshly
/// retrieved record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparable {
    pub id: String,
    pub location: Coordinates,
    pub area_sqm: f64,
    pub year_built: i32,
    pub rooms: u32,
    pub bathrooms: u32,
    pub sale_price: f64,
    pub sale_date: NaiveDate,
    pub days_on_market: u32,
    pub condition: Condition,
    pub property_type: PropertyType,
    #[serde(default)]
    pub floor: Option<i32>,
    pub source: String,
    pub verified: bool,
    pub reliability: f64,

    // Derived
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub adjustments: Option<AdjustmentBreakdown>,
    #[serde(default)]
    pub adjusted_price: Option<f64>,
}

impl Comparable {
    pub fn validate(&self) -> Result<()> {
        self.location.validate()?;

        if !self.area_sqm.is_finite() || self.area_sqm <= 0.0 {
            return Err(ValuationError::invalid_comparable(
                &self.id,
                format!("area must be positive, got {}", self.area_sqm),
            ));
        }
        if !self.sale_price.is_finite() || self.sale_price <= 0.0 {
            return Err(ValuationError::invalid_comparable(
                &self.id,
                format!("sale price must be positive, got {}", self.sale_price),
            ));
        }
        if !(0.0..=1.0).contains(&self.reliability) {
            return Err(ValuationError::invalid_comparable(
                &self.id,
                format!("reliability must be within [0, 1], got {}", self.reliability),
            ));
        }

        Ok(())
    }

    /// Raw sale price per square metre
    pub fn price_per_sqm(&self) -> Option<f64> {
        crate::price_per_sqm(self.sale_price, self.area_sqm)
    }

    /// Adjusted price when enriched, otherwise the raw sale price
    pub fn effective_price(&self) -> f64 {
        self.adjusted_price.unwrap_or(self.sale_price)
    }
}

/// Per-comparable adjustments as signed percentages of the original sale
/// price (5.0 means +5%)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentBreakdown {
    pub area: f64,
    pub condition: f64,
    pub floor: f64,
    pub age: f64,
    pub features: f64,
    pub location: f64,
    pub total: f64,
}

impl AdjustmentBreakdown {
    pub fn new(area: f64, condition: f64, floor: f64, age: f64, features: f64, location: f64) -> Self {
        AdjustmentBreakdown {
            area,
            condition,
            floor,
            age,
            features,
            location,
            total: area + condition + floor + age + features + location,
        }
    }
}

/// Criteria for retrieving and selecting comparables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableFilter {
    pub max_distance_km: f64,
    pub min_similarity: f64,
    pub verified_only: bool,
    pub same_type_only: bool,
    pub max_comparables: usize,
}

impl Default for ComparableFilter {
    fn default() -> Self {
        ComparableFilter {
            max_distance_km: 5.0,
            min_similarity: 0.5,
            verified_only: false,
            same_type_only: false,
            max_comparables: 10,
        }
    }
}

/// Descriptive statistics over a comparable set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub count: usize,
    pub avg_price: f64,
    pub median_price: f64,
    pub avg_price_per_sqm: f64,
    pub median_price_per_sqm: f64,
    pub avg_days_on_market: f64,
}

/// Where an estimate sits relative to the comparable market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketPosition {
    Below,
    At,
    Above,
}

impl std::fmt::Display for MarketPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketPosition::Below => write!(f, "below"),
            MarketPosition::At => write!(f, "at"),
            MarketPosition::Above => write!(f, "above"),
        }
    }
}

/// Estimate interval at a stated confidence level (e.g. 95.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRange {
    pub low: f64,
    pub high: f64,
    pub level_pct: f64,
}

/// Share of an estimate attributable to one comparable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueContribution {
    pub comparable_id: String,
    pub share: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparableSummary {
    pub count: usize,
    pub verified_count: usize,
    pub avg_similarity: f64,
    pub avg_distance_m: f64,
    pub avg_sale_age_months: f64,
}

/// Qualitative warnings attached to a valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    FewComparables,
    LowSimilarity,
    MostlyUnverified,
    DistantComparables,
    StaleSales,
    WidePriceDispersion,
}

impl std::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskFactor::FewComparables => write!(f, "few comparable sales"),
            RiskFactor::LowSimilarity => write!(f, "comparables differ materially from subject"),
            RiskFactor::MostlyUnverified => write!(f, "most comparables are unverified"),
            RiskFactor::DistantComparables => write!(f, "comparables are far from subject"),
            RiskFactor::StaleSales => write!(f, "comparable sales are old"),
            RiskFactor::WidePriceDispersion => write!(f, "adjusted prices are widely dispersed"),
        }
    }
}

/// Output of a single pricing model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub subject_id: String,
    pub model_id: String,
    pub estimated_value: f64,
    pub confidence: f64,
    pub confidence_range: ConfidenceRange,
    pub price_per_sqm: f64,
    pub market_position: MarketPosition,
    pub value_breakdown: Vec<ValueContribution>,
    pub comparables: ComparableSummary,
    pub market: MarketStats,
    pub risk_factors: Vec<RiskFactor>,
}

/// One model's part in an ensemble estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelContribution {
    pub model_id: String,
    /// Configured model weight
    pub weight: f64,
    /// weight * confidence
    pub contribution: f64,
    pub value: f64,
    pub confidence: f64,
}

/// Blended ensemble output. The default value is the empty valuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedValuation {
    pub value: f64,
    pub confidence: f64,
    pub contributions: Vec<ModelContribution>,
}
