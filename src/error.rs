//! Error types for the valuation engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Invalid coordinates: lat={lat}, lng={lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    #[error("Invalid comparable {id}: {reason}")]
    InvalidComparable { id: String, reason: String },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValuationError {
    pub fn invalid_comparable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidComparable {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValuationError>;

/// Reject NaN and infinite results instead of letting them flow downstream.
pub fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValuationError::ComputationError(format!(
            "{} is not finite ({})",
            what, value
        )))
    }
}
