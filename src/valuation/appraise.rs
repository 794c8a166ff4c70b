//! Valuation workflow for one subject: enrich, select, describe, price,
//! combine

use crate::config::ValuationConfig;
use crate::error::{Result, ValuationError};
use crate::valuation::confidence::confidence;
use crate::valuation::enrich::{enrich_all, select_comparables};
use crate::valuation::ensemble::combine;
use crate::valuation::models::{ModelContext, PricingModel};
use crate::valuation::stats::market_stats;
use crate::valuation::types::{
    Comparable, MarketStats, Subject, ValuationResult, WeightedValuation,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything produced for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appraisal {
    pub subject_id: String,
    pub as_of: NaiveDate,
    /// Selected comparables, enriched and ranked
    pub comparables: Vec<Comparable>,
    pub market: MarketStats,
    pub confidence: f64,
    pub results: Vec<ValuationResult>,
    pub valuation: WeightedValuation,
}

/// Value one subject against candidate comparables.
///
/// A model that cannot price the selection (computation error) is left out
/// of the ensemble; every other error is returned.
pub fn appraise(
    subject: &Subject,
    candidates: &[Comparable],
    models: &[Box<dyn PricingModel>],
    config: &ValuationConfig,
    as_of: NaiveDate,
) -> Result<Appraisal> {
    info!("=== Appraising {} ===", subject.id);

    let enriched = enrich_all(subject, candidates)?;
    let comparables = select_comparables(enriched, subject, &config.filter);

    let market = market_stats(&comparables);
    let overall_confidence = confidence(&comparables, subject, as_of)?;

    let ctx = ModelContext {
        as_of,
        confidence_level_pct: config.confidence_level_pct,
    };

    let mut results = Vec::with_capacity(models.len());
    if comparables.is_empty() {
        warn!("No comparables selected for {}, skipping models", subject.id);
    } else {
        for model in models {
            match model.estimate(subject, &comparables, &ctx) {
                Ok(result) => {
                    info!(
                        "{} estimate for {}: {:.0} (confidence {:.2})",
                        model.id(),
                        subject.id,
                        result.estimated_value,
                        result.confidence
                    );
                    results.push(result);
                }
                Err(ValuationError::ComputationError(reason)) => {
                    warn!("{} skipped for {}: {}", model.id(), subject.id, reason);
                }
                Err(e) => return Err(e),
            }
        }
    }

    let valuation = combine(&results, &config.model_weights)?;

    info!(
        "Appraisal for {} complete: {:.0} from {} models, {} comparables",
        subject.id,
        valuation.value,
        results.len(),
        comparables.len()
    );

    Ok(Appraisal {
        subject_id: subject.id.clone(),
        as_of,
        comparables,
        market,
        confidence: overall_confidence,
        results,
        valuation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::ensemble::ModelWeights;
    use crate::valuation::fixtures::{as_of, mock_comparable, mock_subject};
    use crate::valuation::models::{default_models, PRICE_PER_SQM, WEIGHTED_COMPARABLES};
    use crate::valuation::types::{Condition, Coordinates};
    use chrono::Duration;

    fn candidates() -> Vec<Comparable> {
        vec![
            Comparable {
                id: "c-1".to_string(),
                location: Coordinates::new(40.4178, -3.7038),
                sale_price: 310_000.0,
                sale_date: as_of() - Duration::days(45),
                ..mock_comparable()
            },
            Comparable {
                id: "c-2".to_string(),
                location: Coordinates::new(40.4168, -3.7058),
                area_sqm: 90.0,
                sale_price: 280_000.0,
                sale_date: as_of() - Duration::days(90),
                ..mock_comparable()
            },
            Comparable {
                id: "c-3".to_string(),
                location: Coordinates::new(40.4150, -3.7020),
                year_built: 1990,
                condition: Condition::Fair,
                sale_price: 290_000.0,
                sale_date: as_of() - Duration::days(120),
                verified: false,
                ..mock_comparable()
            },
            Comparable {
                id: "too-far".to_string(),
                location: Coordinates::new(41.3874, 2.1686),
                ..mock_comparable()
            },
        ]
    }

    #[test]
    fn test_appraise_end_to_end() {
        let config = ValuationConfig {
            model_weights: ModelWeights::new()
                .with(WEIGHTED_COMPARABLES, 1.0)
                .with(PRICE_PER_SQM, 0.5),
            ..ValuationConfig::default()
        };

        let appraisal = appraise(
            &mock_subject(),
            &candidates(),
            &default_models(),
            &config,
            as_of(),
        )
        .unwrap();

        assert_eq!(appraisal.subject_id, "subject-1");
        assert_eq!(appraisal.comparables.len(), 3);
        assert!(appraisal.comparables.iter().all(|c| c.adjusted_price.is_some()));
        assert_eq!(appraisal.comparables[0].id, "c-1");
        assert_eq!(appraisal.market.count, 3);
        assert!((0.1..=0.95).contains(&appraisal.confidence));

        assert_eq!(appraisal.results.len(), 2);
        assert_eq!(appraisal.valuation.contributions.len(), 2);
        assert!(appraisal.valuation.value > 0.0);
        assert!(appraisal.valuation.confidence > 0.0);
    }

    #[test]
    fn test_appraise_without_comparables() {
        let appraisal = appraise(
            &mock_subject(),
            &[],
            &default_models(),
            &ValuationConfig::default(),
            as_of(),
        )
        .unwrap();

        assert!(appraisal.comparables.is_empty());
        assert_eq!(appraisal.market, MarketStats::default());
        assert_eq!(appraisal.confidence, 0.1);
        assert!(appraisal.results.is_empty());
        assert_eq!(appraisal.valuation, WeightedValuation::default());
    }

    #[test]
    fn test_appraise_skips_unpriceable_model() {
        // Zero reliability leaves the weighted model nothing to weigh
        let candidates: Vec<Comparable> = candidates()
            .into_iter()
            .map(|c| Comparable {
                reliability: 0.0,
                ..c
            })
            .collect();

        let appraisal = appraise(
            &mock_subject(),
            &candidates,
            &default_models(),
            &ValuationConfig::default(),
            as_of(),
        )
        .unwrap();

        let models: Vec<&str> = appraisal.results.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(models, vec![PRICE_PER_SQM]);
    }

    #[test]
    fn test_appraise_rejects_invalid_subject() {
        let mut subject = mock_subject();
        subject.location = Coordinates::new(-95.0, 0.0);

        assert!(matches!(
            appraise(
                &subject,
                &candidates(),
                &default_models(),
                &ValuationConfig::default(),
                as_of()
            ),
            Err(ValuationError::InvalidCoordinates { .. })
        ));
    }
}
