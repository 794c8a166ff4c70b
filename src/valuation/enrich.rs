//! Enrichment functions - derive distance, similarity and adjustments for
//! comparables, then select the evidence set for a subject

use crate::error::{Result, ValuationError};
use crate::valuation::adjust::adjust;
use crate::valuation::geo::distance_m;
use crate::valuation::similarity::similarity;
use crate::valuation::types::{Comparable, ComparableFilter, Subject};
use tracing::{debug, info, warn};

/// Attach the distance to the subject in meters
pub fn with_distance(comparable: Comparable, subject: &Subject) -> Result<Comparable> {
    let meters = distance_m(subject.location, comparable.location)?;

    Ok(Comparable {
        distance_m: Some(meters),
        ..comparable
    })
}

/// Attach the similarity score
pub fn with_similarity(comparable: Comparable, subject: &Subject) -> Result<Comparable> {
    let score = similarity(subject, &comparable)?;

    Ok(Comparable {
        similarity: Some(score),
        ..comparable
    })
}

/// Attach the adjusted price and its breakdown
pub fn with_adjustments(comparable: Comparable, subject: &Subject) -> Result<Comparable> {
    let adjustment = adjust(&comparable, subject)?;

    debug!(
        "Adjusted {}: {:.0} -> {:.0} ({:+.1}%)",
        comparable.id, comparable.sale_price, adjustment.adjusted_price, adjustment.breakdown.total
    );

    Ok(Comparable {
        adjustments: Some(adjustment.breakdown),
        adjusted_price: Some(adjustment.adjusted_price),
        ..comparable
    })
}

/// Run all derivations on a copy of the comparable
pub fn enrich_comparable(comparable: &Comparable, subject: &Subject) -> Result<Comparable> {
    comparable.validate()?;

    let enriched = with_distance(comparable.clone(), subject)?;
    let enriched = with_similarity(enriched, subject)?;
    with_adjustments(enriched, subject)
}

/// Enrich every comparable for the subject.
///
/// The subject is validated up front and its errors are returned. Invalid
/// comparable records are skipped with a warning.
pub fn enrich_all(subject: &Subject, comparables: &[Comparable]) -> Result<Vec<Comparable>> {
    subject.validate()?;
    info!("Enriching {} comparables for {}", comparables.len(), subject.id);

    let mut enriched = Vec::with_capacity(comparables.len());
    let mut skipped = 0;

    for comparable in comparables {
        match enrich_comparable(comparable, subject) {
            Ok(record) => enriched.push(record),
            Err(e @ ValuationError::InvalidComparable { .. })
            | Err(e @ ValuationError::InvalidCoordinates { .. }) => {
                skipped += 1;
                warn!("Skipping comparable {}: {}", comparable.id, e);
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Enrichment complete: {} comparables ({} skipped)",
        enriched.len(),
        skipped
    );

    Ok(enriched)
}

/// Filter enriched comparables and rank them by similarity, best first.
/// Comparables without derived distance or similarity are dropped.
pub fn select_comparables(
    comparables: Vec<Comparable>,
    subject: &Subject,
    filter: &ComparableFilter,
) -> Vec<Comparable> {
    let max_distance_m = filter.max_distance_km * 1000.0;

    let mut selected: Vec<Comparable> = comparables
        .into_iter()
        .filter(|c| c.distance_m.is_some_and(|d| d <= max_distance_m))
        .filter(|c| c.similarity.is_some_and(|s| s >= filter.min_similarity))
        .filter(|c| !filter.verified_only || c.verified)
        .filter(|c| !filter.same_type_only || c.property_type == subject.property_type)
        .collect();

    selected.sort_by(|a, b| {
        let a_score = a.similarity.unwrap_or(0.0);
        let b_score = b.similarity.unwrap_or(0.0);
        b_score
            .total_cmp(&a_score)
            .then_with(|| a.id.cmp(&b.id))
    });
    selected.truncate(filter.max_comparables);

    debug!(
        "Selected {} comparables for {} (max {})",
        selected.len(),
        subject.id,
        filter.max_comparables
    );

    selected
}
