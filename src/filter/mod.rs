//! Row filtering by country, category, brand, and date range.

use crate::domain::{FilterCriteria, Observation};

/// Rows that passed a filter, plus the criteria that produced them.
///
/// An empty `rows` is a valid outcome. "Not filtered yet" is the absence of a
/// `Filtered` value, never an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered<T> {
    pub rows: Vec<T>,
    pub criteria: FilterCriteria,
    pub input_rows: usize,
}

impl<T> Filtered<T> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Keep the rows matching every predicate in `criteria`.
pub fn apply<T: Observation + Clone>(rows: &[T], criteria: &FilterCriteria) -> Filtered<T> {
    let kept = if criteria.is_unrestricted() {
        rows.to_vec()
    } else {
        rows.iter().filter(|row| matches(*row, criteria)).cloned().collect()
    };
    Filtered {
        rows: kept,
        criteria: criteria.clone(),
        input_rows: rows.len(),
    }
}

/// Conjunction of the criteria predicates. Rows without a brand ignore the
/// brand predicate.
pub fn matches<T: Observation>(row: &T, criteria: &FilterCriteria) -> bool {
    if !criteria.countries.is_empty() && !criteria.countries.contains(row.country()) {
        return false;
    }
    if !criteria.categories.is_empty() && !criteria.categories.contains(row.category()) {
        return false;
    }
    if !criteria.brands.is_empty() {
        if let Some(brand) = row.brand() {
            if !criteria.brands.contains(brand) {
                return false;
            }
        }
    }
    match &criteria.date_range {
        Some(range) => range.contains(row.date()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{DateRange, InflationRecord, Month, ProductPriceRecord, SourceTag};

    fn product(id: &str, brand: &str, country: &str, date: (i32, u32, u32)) -> ProductPriceRecord {
        ProductPriceRecord {
            product_id: id.into(),
            brand: brand.into(),
            category: "dairy products".into(),
            country: country.into(),
            observed_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            price: 1.0,
            currency: "EUR".into(),
            source: SourceTag::Live,
        }
    }

    fn yearly_inflation() -> Vec<InflationRecord> {
        let mut rows = Vec::new();
        for country in ["DE", "FR", "IT"] {
            for month in 1..=12 {
                rows.push(InflationRecord {
                    country: country.into(),
                    category: "meat".into(),
                    period: Month::new(2023, month).unwrap(),
                    rate: month as f64,
                    source: SourceTag::Synthetic,
                });
            }
        }
        rows
    }

    #[test]
    fn empty_criteria_is_identity() {
        let rows = yearly_inflation();
        let out = apply(&rows, &FilterCriteria::default());
        assert_eq!(out.rows, rows);
        assert_eq!(out.input_rows, rows.len());
    }

    #[test]
    fn country_and_quarter_filter() {
        let rows = yearly_inflation();
        let q1 = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
        )
        .unwrap();
        let criteria = FilterCriteria::default().with_countries(["DE"]).with_date_range(q1);
        let out = apply(&rows, &criteria);

        assert_eq!(out.rows.len(), 3);
        assert!(out.rows.iter().all(|r| r.country == "DE"));
        assert!(out.rows.iter().all(|r| r.period.year() == 2023 && r.period.month() <= 3));
        assert!(out.rows.iter().all(|r| r.source == SourceTag::Synthetic));
    }

    #[test]
    fn brand_predicate_applies_to_products_only() {
        let criteria = FilterCriteria::default().with_brands(["Arla"]);
        let products = vec![
            product("P1", "arla", "DE", (2023, 1, 1)),
            product("P2", "danone", "DE", (2023, 1, 1)),
        ];
        let out = apply(&products, &criteria);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].product_id, "P1");

        let inflation = yearly_inflation();
        assert_eq!(apply(&inflation, &criteria).rows.len(), inflation.len());
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let rows = yearly_inflation();
        let out = apply(&rows, &FilterCriteria::default().with_countries(["PT"]));
        assert!(out.is_empty());
        assert_eq!(out.input_rows, rows.len());
    }

    #[test]
    fn date_range_is_inclusive() {
        let rows = vec![
            product("P1", "arla", "DE", (2023, 1, 1)),
            product("P1", "arla", "DE", (2023, 3, 31)),
            product("P1", "arla", "DE", (2023, 4, 1)),
        ];
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
        )
        .unwrap();
        let out = apply(&rows, &FilterCriteria::default().with_date_range(range));
        assert_eq!(out.rows.len(), 2);
    }
}
