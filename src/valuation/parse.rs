//! Parse functions - load subjects (JSON) and comparable sales (CSV)

use crate::error::{Result, ValuationError};
use crate::valuation::types::{Comparable, Coordinates, Subject};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Only the first few bad rows are logged
const MAX_LOGGED_ERRORS: usize = 10;

/// Comparable sales CSV row structure
#[derive(Debug, Deserialize)]
struct SaleRow {
    id: String,
    lat: f64,
    lng: f64,
    area_sqm: f64,
    year_built: i32,
    rooms: u32,
    bathrooms: u32,
    sale_price: String, // may carry $ and thousands separators
    sale_date: String,  // YYYY-MM-DD
    days_on_market: u32,
    condition: String,
    property_type: String,
    floor: Option<i32>,
    source: String,
    verified: String,
    reliability: f64,
}

/// Load subjects from a JSON array file
pub fn load_subjects(path: &Path) -> Result<Vec<Subject>> {
    info!("Loading subjects from {:?}", path);
    let json = fs::read_to_string(path)?;
    parse_subjects(&json)
}

pub fn parse_subjects(json: &str) -> Result<Vec<Subject>> {
    let subjects: Vec<Subject> = serde_json::from_str(json)?;
    info!("Parsed {} subjects", subjects.len());
    Ok(subjects)
}

/// Load comparable sales from a CSV file
pub fn load_sales(path: &Path) -> Result<Vec<Comparable>> {
    info!("Loading comparable sales from {:?}", path);
    let file = fs::File::open(path)?;
    parse_sales(file)
}

/// Parse comparable sales CSV. Malformed rows are skipped.
pub fn parse_sales<R: Read>(input: R) -> Result<Vec<Comparable>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut sales = Vec::new();
    let mut parse_errors = 0;

    for (idx, result) in reader.deserialize::<SaleRow>().enumerate() {
        let parsed = result
            .map_err(ValuationError::from)
            .and_then(parse_sale_row);

        match parsed {
            Ok(sale) => sales.push(sale),
            Err(e) => {
                parse_errors += 1;
                if parse_errors <= MAX_LOGGED_ERRORS {
                    warn!("Failed to parse sale row {}: {}", idx, e);
                }
            }
        }
    }

    info!(
        "Parsed {} comparable sales ({} errors)",
        sales.len(),
        parse_errors
    );

    Ok(sales)
}

fn parse_sale_row(row: SaleRow) -> Result<Comparable> {
    let sale_price = parse_price(&row.sale_price)?;
    let sale_date = parse_date(&row.sale_date)?;

    Ok(Comparable {
        id: row.id,
        location: Coordinates::new(row.lat, row.lng),
        area_sqm: row.area_sqm,
        year_built: row.year_built,
        rooms: row.rooms,
        bathrooms: row.bathrooms,
        sale_price,
        sale_date,
        days_on_market: row.days_on_market,
        condition: row.condition.parse()?,
        property_type: row.property_type.parse()?,
        floor: row.floor,
        source: row.source,
        verified: parse_flag(&row.verified)?,
        reliability: row.reliability,
        distance_m: None,
        similarity: None,
        adjustments: None,
        adjusted_price: None,
    })
}

/// Parse a price such as "$450,000"
fn parse_price(raw: &str) -> Result<f64> {
    let clean = raw.replace(['$', '€', ','], "");
    clean
        .trim()
        .parse::<f64>()
        .map_err(|_| ValuationError::Parse(format!("invalid price '{}'", raw)))
}

/// Parse date string in YYYY-MM-DD format
fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValuationError::Parse(format!("invalid date '{}'", raw)))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" | "" => Ok(false),
        other => Err(ValuationError::Parse(format!("invalid flag '{}'", other))),
    }
}
