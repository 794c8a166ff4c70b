//! Comparable-based valuation engine
//!
//! The leaf functions (`distance_km`, `similarity`, `adjust`, `market_stats`,
//! `confidence`, `combine`) are pure and independent. `appraise` composes
//! them into the per-subject workflow.

pub mod adjust;
pub mod appraise;
pub mod confidence;
pub mod enrich;
pub mod ensemble;
pub mod geo;
pub mod models;
pub mod parse;
pub mod similarity;
pub mod source;
pub mod stats;
pub mod types;

pub use adjust::{adjust, Adjustment};
pub use appraise::{appraise, Appraisal};
pub use confidence::confidence;
pub use ensemble::{combine, ModelWeights};
pub use geo::{distance_km, distance_m};
pub use models::{default_models, ModelContext, PricingModel};
pub use similarity::similarity;
pub use source::{ComparableSource, SalesPool};
pub use stats::market_stats;
pub use types::*;
