//! Pricing models - each turns a subject and its selected comparables into
//! one ValuationResult for the ensemble

use crate::error::{ensure_finite, Result, ValuationError};
use crate::valuation::confidence::{confidence_from_summary, summarize};
use crate::valuation::stats::{market_stats, mean, upper_median};
use crate::valuation::types::{
    Comparable, ComparableSummary, ConfidenceRange, MarketPosition, RiskFactor, Subject,
    ValuationResult, ValueContribution,
};
use chrono::NaiveDate;

pub const WEIGHTED_COMPARABLES: &str = "weighted_comparables";
pub const PRICE_PER_SQM: &str = "price_per_sqm";

/// Estimates within this band of the market price/m2 count as "at" market
const MARKET_BAND: f64 = 0.05;

const FEW_COMPARABLES: usize = 3;
const LOW_SIMILARITY: f64 = 0.6;
const MIN_VERIFIED_RATIO: f64 = 0.5;
const DISTANT_METERS: f64 = 2_000.0;
const STALE_MONTHS: f64 = 12.0;
const WIDE_DISPERSION: f64 = 0.25;

/// Inputs shared by every model in one valuation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelContext {
    pub as_of: NaiveDate,
    /// Confidence level of the reported range, in percent
    pub confidence_level_pct: f64,
}

pub trait PricingModel: Send + Sync {
    fn id(&self) -> &str;

    /// Comparables arrive enriched and ranked best-first
    fn estimate(
        &self,
        subject: &Subject,
        comparables: &[Comparable],
        ctx: &ModelContext,
    ) -> Result<ValuationResult>;
}

/// Similarity x reliability weighted mean of adjusted prices over the
/// top-k comparables
#[derive(Debug, Clone)]
pub struct WeightedComparablesModel {
    pub top_k: usize,
}

impl Default for WeightedComparablesModel {
    fn default() -> Self {
        WeightedComparablesModel { top_k: 6 }
    }
}

impl PricingModel for WeightedComparablesModel {
    fn id(&self) -> &str {
        WEIGHTED_COMPARABLES
    }

    fn estimate(
        &self,
        subject: &Subject,
        comparables: &[Comparable],
        ctx: &ModelContext,
    ) -> Result<ValuationResult> {
        subject.validate()?;
        let used = &comparables[..comparables.len().min(self.top_k)];
        require_comparables(self.id(), used)?;

        let weights: Vec<f64> = used
            .iter()
            .map(|c| c.similarity.unwrap_or(0.0) * c.reliability)
            .collect();
        let total_weight: f64 = weights.iter().sum();
        if total_weight <= 0.0 {
            return Err(ValuationError::ComputationError(format!(
                "{}: comparables carry no weight",
                self.id()
            )));
        }

        let estimate = used
            .iter()
            .zip(&weights)
            .map(|(c, w)| c.effective_price() * w)
            .sum::<f64>()
            / total_weight;

        let breakdown = used
            .iter()
            .zip(&weights)
            .map(|(c, w)| {
                let share = w / total_weight;
                ValueContribution {
                    comparable_id: c.id.clone(),
                    share,
                    amount: (c.effective_price() * share).round(),
                }
            })
            .collect();

        build_result(self.id(), subject, used, ctx, estimate, breakdown)
    }
}

/// Median adjusted price per square metre applied to the subject's area
#[derive(Debug, Clone, Default)]
pub struct PricePerSqmModel;

impl PricingModel for PricePerSqmModel {
    fn id(&self) -> &str {
        PRICE_PER_SQM
    }

    fn estimate(
        &self,
        subject: &Subject,
        comparables: &[Comparable],
        ctx: &ModelContext,
    ) -> Result<ValuationResult> {
        subject.validate()?;
        require_comparables(self.id(), comparables)?;

        let rates: Vec<f64> = comparables
            .iter()
            .filter_map(|c| crate::price_per_sqm(c.effective_price(), c.area_sqm))
            .collect();
        let estimate = upper_median(&rates) * subject.area_sqm;

        let share = 1.0 / comparables.len() as f64;
        let breakdown = comparables
            .iter()
            .map(|c| ValueContribution {
                comparable_id: c.id.clone(),
                share,
                amount: (estimate * share).round(),
            })
            .collect();

        build_result(self.id(), subject, comparables, ctx, estimate, breakdown)
    }
}

/// Reference model set, in reporting order
pub fn default_models() -> Vec<Box<dyn PricingModel>> {
    vec![
        Box::new(WeightedComparablesModel::default()),
        Box::new(PricePerSqmModel),
    ]
}

fn require_comparables(model_id: &str, comparables: &[Comparable]) -> Result<()> {
    if comparables.is_empty() {
        return Err(ValuationError::ComputationError(format!(
            "{}: no comparables to price from",
            model_id
        )));
    }
    Ok(())
}

fn build_result(
    model_id: &str,
    subject: &Subject,
    comparables: &[Comparable],
    ctx: &ModelContext,
    estimate: f64,
    value_breakdown: Vec<ValueContribution>,
) -> Result<ValuationResult> {
    subject.validate()?;
    let estimate = ensure_finite(estimate, "estimated value")?.round();

    let summary = summarize(comparables, subject, ctx.as_of)?;
    let confidence = confidence_from_summary(&summary)?;
    let market = market_stats(comparables);

    let prices: Vec<f64> = comparables.iter().map(|c| c.effective_price()).collect();
    let dispersion = coefficient_of_variation(&prices);

    let price_per_sqm = ensure_finite(estimate / subject.area_sqm, "price per sqm")?;

    Ok(ValuationResult {
        subject_id: subject.id.clone(),
        model_id: model_id.to_string(),
        estimated_value: estimate,
        confidence,
        confidence_range: confidence_range(estimate, &prices, confidence, ctx.confidence_level_pct),
        price_per_sqm,
        market_position: market_position(price_per_sqm, market.avg_price_per_sqm),
        value_breakdown,
        comparables: summary,
        market,
        risk_factors: risk_factors(&summary, dispersion),
    })
}

/// Classify a price/m2 against the market average
pub fn market_position(price_per_sqm: f64, market_price_per_sqm: f64) -> MarketPosition {
    if market_price_per_sqm <= 0.0 {
        return MarketPosition::At;
    }

    let deviation = price_per_sqm / market_price_per_sqm - 1.0;
    if deviation < -MARKET_BAND {
        MarketPosition::Below
    } else if deviation > MARKET_BAND {
        MarketPosition::Above
    } else {
        MarketPosition::At
    }
}

/// Lowest confidence level with a tabulated quantile
pub const MIN_CONFIDENCE_LEVEL: f64 = 80.0;

/// Two-sided normal quantile for the common reporting levels. Levels between
/// table entries use the next lower entry.
fn z_score(level_pct: f64) -> f64 {
    if level_pct >= 99.0 {
        2.576
    } else if level_pct >= 95.0 {
        1.96
    } else if level_pct >= 90.0 {
        1.645
    } else {
        1.282
    }
}

/// Interval from the standard error of the adjusted prices, never narrower
/// than a quarter of the estimate's unconfidence
fn confidence_range(estimate: f64, prices: &[f64], confidence: f64, level_pct: f64) -> ConfidenceRange {
    let standard_error = if prices.len() > 1 {
        sample_std_dev(prices) / (prices.len() as f64).sqrt()
    } else {
        0.0
    };

    let half_width = (z_score(level_pct) * standard_error).max(estimate * (1.0 - confidence) * 0.25);

    ConfidenceRange {
        low: (estimate - half_width).max(0.0).round(),
        high: (estimate + half_width).round(),
        level_pct,
    }
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values);
    if avg <= 0.0 {
        return 0.0;
    }
    sample_std_dev(values) / avg
}

fn risk_factors(summary: &ComparableSummary, dispersion: f64) -> Vec<RiskFactor> {
    let mut risks = Vec::new();

    if summary.count < FEW_COMPARABLES {
        risks.push(RiskFactor::FewComparables);
    }
    if summary.avg_similarity < LOW_SIMILARITY {
        risks.push(RiskFactor::LowSimilarity);
    }
    if summary.count > 0
        && (summary.verified_count as f64 / summary.count as f64) < MIN_VERIFIED_RATIO
    {
        risks.push(RiskFactor::MostlyUnverified);
    }
    if summary.avg_distance_m > DISTANT_METERS {
        risks.push(RiskFactor::DistantComparables);
    }
    if summary.avg_sale_age_months > STALE_MONTHS {
        risks.push(RiskFactor::StaleSales);
    }
    if dispersion > WIDE_DISPERSION {
        risks.push(RiskFactor::WidePriceDispersion);
    }

    risks
}
