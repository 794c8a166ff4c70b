//! Confidence in a valuation given the quality and quantity of evidence

use crate::error::{ensure_finite, Result};
use crate::valuation::geo::comparable_distance_km;
use crate::valuation::similarity::similarity;
use crate::valuation::types::{Comparable, ComparableSummary, Subject};
use chrono::NaiveDate;

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 0.95;

const BASE_CONFIDENCE: f64 = 0.5;
const COUNT_BONUS_CAP: f64 = 0.2;
const SIMILARITY_WEIGHT: f64 = 0.25;
const VERIFIED_WEIGHT: f64 = 0.15;
const DISTANCE_PENALTY_CAP: f64 = 0.1;
const RECENCY_PENALTY_CAP: f64 = 0.15;

const DAYS_PER_MONTH: f64 = 30.0;

/// Months between sale and valuation date; future-dated sales count as fresh
pub fn sale_age_months(sale_date: NaiveDate, as_of: NaiveDate) -> f64 {
    (as_of - sale_date).num_days().max(0) as f64 / DAYS_PER_MONTH
}

/// Averages over a comparable set. Similarity and distance fall back to
/// being computed when a comparable has not been enriched.
pub fn summarize(
    comparables: &[Comparable],
    subject: &Subject,
    as_of: NaiveDate,
) -> Result<ComparableSummary> {
    if comparables.is_empty() {
        return Ok(ComparableSummary::default());
    }

    let mut similarity_sum = 0.0;
    let mut distance_km_sum = 0.0;
    let mut age_months_sum = 0.0;
    let mut verified_count = 0;

    for comparable in comparables {
        similarity_sum += match comparable.similarity {
            Some(score) => score,
            None => similarity(subject, comparable)?,
        };
        distance_km_sum += comparable_distance_km(subject, comparable)?;
        age_months_sum += sale_age_months(comparable.sale_date, as_of);
        if comparable.verified {
            verified_count += 1;
        }
    }

    let n = comparables.len() as f64;

    Ok(ComparableSummary {
        count: comparables.len(),
        verified_count,
        avg_similarity: similarity_sum / n,
        avg_distance_m: distance_km_sum / n * 1000.0,
        avg_sale_age_months: age_months_sum / n,
    })
}

/// Overall confidence in [0.1, 0.95]
pub fn confidence(comparables: &[Comparable], subject: &Subject, as_of: NaiveDate) -> Result<f64> {
    subject.validate()?;

    // No evidence: fixed floor, not the formula on an empty set
    if comparables.is_empty() {
        return Ok(MIN_CONFIDENCE);
    }

    let summary = summarize(comparables, subject, as_of)?;
    confidence_from_summary(&summary)
}

pub(crate) fn confidence_from_summary(summary: &ComparableSummary) -> Result<f64> {
    if summary.count == 0 {
        return Ok(MIN_CONFIDENCE);
    }

    let n = summary.count as f64;
    let avg_distance_km = summary.avg_distance_m / 1000.0;

    let mut score = BASE_CONFIDENCE;
    score += (n / 10.0).min(COUNT_BONUS_CAP);
    score += summary.avg_similarity * SIMILARITY_WEIGHT;
    score += summary.verified_count as f64 / n * VERIFIED_WEIGHT;
    score -= (avg_distance_km / 5.0).min(DISTANCE_PENALTY_CAP);
    score -= (summary.avg_sale_age_months / 12.0).min(RECENCY_PENALTY_CAP);

    let score = ensure_finite(score, "confidence")?;
    Ok(score.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValuationError;
    use crate::valuation::fixtures::{as_of, mock_comparable, mock_subject};
    use chrono::Duration;

    #[test]
    fn test_empty_set_is_floor() {
        let score = confidence(&[], &mock_subject(), as_of()).unwrap();
        assert_eq!(score, 0.1);
    }

    #[test]
    fn test_invalid_subject_rejected() {
        let subject = Subject {
            area_sqm: 0.0,
            ..mock_subject()
        };
        let comparable = Comparable {
            similarity: Some(0.9),
            distance_m: Some(100.0),
            ..mock_comparable()
        };

        assert!(matches!(
            confidence(&[comparable], &subject, as_of()),
            Err(ValuationError::InvalidSubject(_))
        ));
        assert!(matches!(
            confidence(&[], &subject, as_of()),
            Err(ValuationError::InvalidSubject(_))
        ));
    }

    #[test]
    fn test_sale_age_months() {
        let today = as_of();
        assert_eq!(sale_age_months(today, today), 0.0);
        assert_eq!(sale_age_months(today - Duration::days(90), today), 3.0);
        assert_eq!(sale_age_months(today + Duration::days(10), today), 0.0);
    }

    #[test]
    fn test_single_comparable_formula() {
        let comparable = Comparable {
            similarity: Some(0.8),
            distance_m: Some(250.0),
            sale_date: as_of() - Duration::days(30),
            verified: true,
            ..mock_comparable()
        };

        // 0.5 + 0.1 + 0.2 + 0.15 - 0.05 - 1/12
        let expected = 0.5 + 0.1 + 0.2 + 0.15 - 0.05 - 1.0 / 12.0;
        let score = confidence(&[comparable], &mock_subject(), as_of()).unwrap();
        assert!((score - expected).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_penalties_are_capped() {
        let comparables: Vec<Comparable> = (0..2)
            .map(|i| Comparable {
                id: format!("comp-{}", i),
                similarity: Some(0.4),
                distance_m: Some(40_000.0),
                sale_date: as_of() - Duration::days(3_650),
                verified: false,
                ..mock_comparable()
            })
            .collect();

        // 0.5 + 0.2 + 0.1 + 0 - 0.1 - 0.15
        let score = confidence(&comparables, &mock_subject(), as_of()).unwrap();
        assert!((score - 0.55).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_strong_evidence_capped_at_max() {
        let comparables: Vec<Comparable> = (0..12)
            .map(|i| Comparable {
                id: format!("comp-{}", i),
                sale_date: as_of(),
                ..mock_comparable()
            })
            .collect();

        let score = confidence(&comparables, &mock_subject(), as_of()).unwrap();
        assert_eq!(score, MAX_CONFIDENCE);
    }

    #[test]
    fn test_unenriched_comparables_are_scored() {
        // Identical comparable at the subject's location, sold today
        let comparable = Comparable {
            sale_date: as_of(),
            verified: false,
            ..mock_comparable()
        };

        // 0.5 + 0.1 + 1.0 * 0.25
        let score = confidence(&[comparable], &mock_subject(), as_of()).unwrap();
        assert!((score - 0.85).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_confidence_stays_in_bounds() {
        let subject = mock_subject();

        for count in 1..15 {
            for similarity in [0.1, 0.5, 1.0] {
                for distance_m in [0.0, 1_000.0, 100_000.0] {
                    for age_days in [0, 200, 5_000] {
                        for verified in [true, false] {
                            let comparables: Vec<Comparable> = (0..count)
                                .map(|i| Comparable {
                                    id: format!("comp-{}", i),
                                    similarity: Some(similarity),
                                    distance_m: Some(distance_m),
                                    sale_date: as_of() - Duration::days(age_days),
                                    verified,
                                    ..mock_comparable()
                                })
                                .collect();

                            let score = confidence(&comparables, &subject, as_of()).unwrap();
                            assert!(
                                (MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&score),
                                "score {} out of bounds",
                                score
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_summary() {
        let comparables = vec![
            Comparable {
                id: "a".to_string(),
                similarity: Some(0.9),
                distance_m: Some(1_000.0),
                verified: true,
                sale_date: as_of() - Duration::days(60),
                ..mock_comparable()
            },
            Comparable {
                id: "b".to_string(),
                similarity: Some(0.5),
                distance_m: Some(3_000.0),
                verified: false,
                sale_date: as_of() - Duration::days(120),
                ..mock_comparable()
            },
        ];

        let summary = summarize(&comparables, &mock_subject(), as_of()).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.verified_count, 1);
        assert!((summary.avg_similarity - 0.7).abs() < 1e-9);
        assert!((summary.avg_distance_m - 2_000.0).abs() < 1e-6);
        assert!((summary.avg_sale_age_months - 3.0).abs() < 1e-9);
    }
}
