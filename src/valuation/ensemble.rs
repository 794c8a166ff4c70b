//! Combine per-model valuations into one weighted estimate

use crate::error::{ensure_finite, Result, ValuationError};
use crate::valuation::types::{ModelContribution, ValuationResult, WeightedValuation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_MODEL_WEIGHT: f64 = 1.0;

/// Model id -> weight. Models without an entry weigh 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelWeights(HashMap<String, f64>);

impl ModelWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, model_id: impl Into<String>, weight: f64) -> Self {
        self.0.insert(model_id.into(), weight);
        self
    }

    pub fn weight_for(&self, model_id: &str) -> f64 {
        self.0.get(model_id).copied().unwrap_or(DEFAULT_MODEL_WEIGHT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for ModelWeights {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        ModelWeights(iter.into_iter().collect())
    }
}

/// Weighted blend of model outputs.
///
/// Each model contributes `weight * confidence` to the value numerator, but
/// both the value and the confidence are divided by the sum of raw weights.
pub fn combine(results: &[ValuationResult], weights: &ModelWeights) -> Result<WeightedValuation> {
    if results.is_empty() {
        return Ok(WeightedValuation::default());
    }

    let mut total_weight = 0.0;
    let mut value_sum = 0.0;
    let mut confidence_sum = 0.0;
    let mut contributions = Vec::with_capacity(results.len());

    for result in results {
        let weight = weights.weight_for(&result.model_id);
        if !weight.is_finite() || weight < 0.0 {
            return Err(ValuationError::ComputationError(format!(
                "invalid weight {} for model {}",
                weight, result.model_id
            )));
        }

        let contribution = weight * result.confidence;
        value_sum += result.estimated_value * contribution;
        confidence_sum += result.confidence * weight;
        total_weight += weight;

        contributions.push(ModelContribution {
            model_id: result.model_id.clone(),
            weight,
            contribution,
            value: result.estimated_value,
            confidence: result.confidence,
        });
    }

    if total_weight == 0.0 {
        debug!("All {} model weights are zero, returning empty valuation", results.len());
        return Ok(WeightedValuation::default());
    }

    let value = ensure_finite(value_sum / total_weight, "weighted value")?;
    let confidence = ensure_finite(confidence_sum / total_weight, "weighted confidence")?;

    debug!(
        "Combined {} models: value={:.0}, confidence={:.3}",
        contributions.len(),
        value,
        confidence
    );

    Ok(WeightedValuation {
        value,
        confidence,
        contributions,
    })
}
