//! Comparable retrieval

use crate::error::Result;
use crate::valuation::geo::distance_km;
use crate::valuation::types::{Comparable, ComparableFilter, Subject};
use tracing::{debug, warn};

/// Supplies candidate comparables for a subject
pub trait ComparableSource {
    fn search(&self, subject: &Subject, filter: &ComparableFilter) -> Result<Vec<Comparable>>;
}

/// In-memory pool of closed sales
#[derive(Debug, Clone, Default)]
pub struct SalesPool {
    sales: Vec<Comparable>,
}

impl SalesPool {
    /// Invalid sale records are dropped with a warning
    pub fn new(sales: Vec<Comparable>) -> Self {
        let total = sales.len();
        let sales: Vec<Comparable> = sales
            .into_iter()
            .filter(|sale| match sale.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Dropping sale {}: {}", sale.id, e);
                    false
                }
            })
            .collect();

        debug!("Sales pool ready: {} of {} records", sales.len(), total);
        SalesPool { sales }
    }

    pub fn len(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }
}

impl ComparableSource for SalesPool {
    /// Radius, type and verification prefilter. Similarity limits are left to
    /// selection after enrichment.
    fn search(&self, subject: &Subject, filter: &ComparableFilter) -> Result<Vec<Comparable>> {
        subject.validate()?;

        let mut found = Vec::new();
        for sale in &self.sales {
            if sale.id == subject.id {
                continue;
            }
            if filter.same_type_only && sale.property_type != subject.property_type {
                continue;
            }
            if filter.verified_only && !sale.verified {
                continue;
            }
            if distance_km(subject.location, sale.location)? > filter.max_distance_km {
                continue;
            }
            found.push(sale.clone());
        }

        debug!("Found {} candidate sales for {}", found.len(), subject.id);
        Ok(found)
    }
}
