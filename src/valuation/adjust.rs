//! Price adjustments from a comparable's sale price to the subject
//!
//! Factors compound multiplicatively on the sale price, while the breakdown
//! reports each factor as a plain percentage of the original price. The two
//! views intentionally disagree once more than one factor is non-zero;
//! display code relies on the percentage figures.

use crate::error::{ensure_finite, Result};
use crate::valuation::types::{AdjustmentBreakdown, Comparable, Subject};

/// Share of the area ratio passed through to price
const AREA_PASS_THROUGH: f64 = 0.8;
const AGE_RATE_PER_YEAR: f64 = 0.005;
const AGE_CAP: f64 = 0.20;
const FLOOR_RATE_PER_LEVEL: f64 = 0.02;
const FLOOR_CAP: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub adjusted_price: f64,
    pub breakdown: AdjustmentBreakdown,
}

/// Adjust a comparable's sale price to the subject's characteristics.
/// The price is rounded to the nearest currency unit.
pub fn adjust(comparable: &Comparable, subject: &Subject) -> Result<Adjustment> {
    subject.validate()?;
    comparable.validate()?;

    let area = AREA_PASS_THROUGH * (subject.area_sqm / comparable.area_sqm - 1.0);

    let age = ((subject.year_built as f64 - comparable.year_built as f64) * AGE_RATE_PER_YEAR)
        .clamp(-AGE_CAP, AGE_CAP);

    let condition = subject.condition.price_factor() - comparable.condition.price_factor();

    // Only when both sides know their floor
    let floor = match (subject.floor, comparable.floor) {
        (Some(subject_floor), Some(comp_floor)) => {
            ((subject_floor as f64 - comp_floor as f64) * FLOOR_RATE_PER_LEVEL)
                .clamp(-FLOOR_CAP, FLOOR_CAP)
        }
        _ => 0.0,
    };

    let mut price = comparable.sale_price;
    price *= 1.0 + area;
    price *= 1.0 + age;
    price *= 1.0 + condition;
    price *= 1.0 + floor;

    let adjusted_price = ensure_finite(price.round(), "adjusted price")?;

    Ok(Adjustment {
        adjusted_price,
        breakdown: AdjustmentBreakdown::new(
            area * 100.0,
            condition * 100.0,
            floor * 100.0,
            age * 100.0,
            0.0,
            0.0,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValuationError;
    use crate::valuation::fixtures::{mock_comparable, mock_subject};
    use crate::valuation::types::Condition;

    #[test]
    fn test_identical_comparable_unchanged() {
        let adjustment = adjust(&mock_comparable(), &mock_subject()).unwrap();

        assert_eq!(adjustment.adjusted_price, 300_000.0);
        assert_eq!(adjustment.breakdown, AdjustmentBreakdown::default());
    }

    #[test]
    fn test_area_adjustment_partial_pass_through() {
        let subject = mock_subject(); // 100 m2
        let mut comparable = mock_comparable();
        comparable.area_sqm = 80.0;

        // ratio 1.25 -> 1 + 0.8 * 0.25
        let adjustment = adjust(&comparable, &subject).unwrap();
        assert_eq!(adjustment.adjusted_price, 360_000.0);
        assert!((adjustment.breakdown.area - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_age_adjustment_clamped() {
        let subject = mock_subject(); // built 2000
        let mut comparable = mock_comparable();

        comparable.year_built = 1990;
        let adjustment = adjust(&comparable, &subject).unwrap();
        assert_eq!(adjustment.adjusted_price, 315_000.0);
        assert!((adjustment.breakdown.age - 5.0).abs() < 1e-9);

        comparable.year_built = 1900;
        let adjustment = adjust(&comparable, &subject).unwrap();
        assert_eq!(adjustment.adjusted_price, 360_000.0);
        assert!((adjustment.breakdown.age - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_condition_adjustment() {
        let subject = mock_subject(); // good
        let mut comparable = mock_comparable();
        comparable.condition = Condition::Poor;

        let adjustment = adjust(&comparable, &subject).unwrap();
        assert_eq!(adjustment.adjusted_price, 345_000.0);
        assert!((adjustment.breakdown.condition - 15.0).abs() < 1e-9);

        comparable.condition = Condition::Excellent;
        let adjustment = adjust(&comparable, &subject).unwrap();
        assert_eq!(adjustment.adjusted_price, 270_000.0);
    }

    #[test]
    fn test_extreme_years_and_floors_stay_clamped() {
        let subject = mock_subject();
        let mut comparable = mock_comparable();
        comparable.year_built = i32::MIN;
        comparable.floor = Some(i32::MAX);

        let adjustment = adjust(&comparable, &subject).unwrap();
        assert!((adjustment.breakdown.age - 20.0).abs() < 1e-9);
        assert!((adjustment.breakdown.floor + 15.0).abs() < 1e-9);
        // 300000 * 1.20 * 0.85
        assert_eq!(adjustment.adjusted_price, 306_000.0);
    }

    #[test]
    fn test_floor_adjustment_requires_both_floors() {
        let subject = mock_subject(); // floor 3
        let mut comparable = mock_comparable();

        comparable.floor = Some(1);
        let adjustment = adjust(&comparable, &subject).unwrap();
        assert_eq!(adjustment.adjusted_price, 312_000.0);
        assert!((adjustment.breakdown.floor - 4.0).abs() < 1e-9);

        comparable.floor = Some(30);
        let adjustment = adjust(&comparable, &subject).unwrap();
        assert!((adjustment.breakdown.floor + 15.0).abs() < 1e-9);

        comparable.floor = None;
        let adjustment = adjust(&comparable, &subject).unwrap();
        assert_eq!(adjustment.breakdown.floor, 0.0);
        assert_eq!(adjustment.adjusted_price, 300_000.0);
    }

    #[test]
    fn test_factors_compound() {
        let subject = mock_subject();
        let mut comparable = mock_comparable();
        comparable.area_sqm = 80.0; // +20%
        comparable.condition = Condition::Poor; // +15%

        let adjustment = adjust(&comparable, &subject).unwrap();

        // 300000 * 1.2 * 1.15, not 300000 * 1.35
        assert_eq!(adjustment.adjusted_price, 414_000.0);
        assert!((adjustment.breakdown.total - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_parts_sum_to_total() {
        let subject = mock_subject();

        for (area, year, condition, floor) in [
            (55.0, 1965, Condition::Fair, Some(0)),
            (140.0, 2021, Condition::Excellent, Some(7)),
            (99.5, 1999, Condition::Poor, None),
        ] {
            let mut comparable = mock_comparable();
            comparable.area_sqm = area;
            comparable.year_built = year;
            comparable.condition = condition;
            comparable.floor = floor;

            let b = adjust(&comparable, &subject).unwrap().breakdown;
            let sum = b.area + b.condition + b.floor + b.age + b.features + b.location;
            assert!((b.total - sum).abs() < 1e-9);
        }
    }

    #[test]
    fn test_newer_subject_raises_price() {
        let comparable = mock_comparable(); // built 2000
        let mut previous = f64::MIN;

        // 1960..=2040 stays inside the +/-20% clamp
        for year in 1961..2040 {
            let mut subject = mock_subject();
            subject.year_built = year;

            let price = adjust(&comparable, &subject).unwrap().adjusted_price;
            assert!(price > previous, "year {}: {} <= {}", year, price, previous);
            previous = price;
        }
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut subject = mock_subject();
        subject.rooms = 0;
        assert!(matches!(
            adjust(&mock_comparable(), &subject),
            Err(ValuationError::InvalidSubject(_))
        ));

        let mut comparable = mock_comparable();
        comparable.sale_price = 0.0;
        assert!(matches!(
            adjust(&comparable, &mock_subject()),
            Err(ValuationError::InvalidComparable { .. })
        ));
    }
}
