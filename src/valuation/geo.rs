//! Great-circle distance between coordinates

use crate::error::Result;
use crate::valuation::types::{Comparable, Coordinates, Subject};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres
pub fn distance_km(a: Coordinates, b: Coordinates) -> Result<f64> {
    a.validate()?;
    b.validate()?;

    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    // h can drift a hair above 1.0 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    Ok(EARTH_RADIUS_KM * c)
}

/// Haversine distance in meters
pub fn distance_m(a: Coordinates, b: Coordinates) -> Result<f64> {
    Ok(distance_km(a, b)? * 1000.0)
}

/// Distance from subject to comparable in kilometres, preferring the
/// comparable's derived distance when it has been enriched
pub fn comparable_distance_km(subject: &Subject, comparable: &Comparable) -> Result<f64> {
    match comparable.distance_m {
        Some(meters) => Ok(meters / 1000.0),
        None => distance_km(subject.location, comparable.location),
    }
}
