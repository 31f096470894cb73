//! Deterministic synthetic rows for both datasets.
//!
//! Rows are emitted as text, in the same shape the warehouse returns, so they
//! pass through the normalizer like live rows. Only the seed decides the
//! output: two calls with the same seed produce identical rows.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::domain::vocabulary::{CATEGORIES, COUNTRY_CODES};
use crate::domain::{DatasetKind, Month, RawInflationRow, RawPriceRow};

/// Default seed for offline runs.
pub const DEFAULT_SEED: u64 = 42;

/// First month of the synthetic range (2020-01) and its length (through 2023-12).
const START_YEAR: i32 = 2020;
const MONTHS: usize = 48;

const PRODUCTS_PER_CATEGORY: usize = 3;

const BRANDS: [&str; 12] = [
    "Nestlé", "Danone", "Unilever", "Kraft Heinz", "Carrefour", "Lidl", "Aldi", "Barilla",
    "Ferrero", "Dr. Oetker", "Arla", "Müller",
];

pub fn synthetic_inflation(seed: u64) -> Vec<RawInflationRow> {
    let mut rng = StdRng::seed_from_u64(dataset_seed(seed, DatasetKind::Inflation));
    let months = sample_months();
    let mut rows = Vec::with_capacity(COUNTRY_CODES.len() * CATEGORIES.len() * months.len());

    for (country_idx, country) in COUNTRY_CODES.iter().enumerate() {
        for category in CATEGORIES {
            let factor = category_inflation_factor(category);
            for &month in &months {
                let z: f64 = rng.sample(StandardNormal);
                let rate = regime_rate(month, country_idx) * factor + 0.25 * z;
                rows.push(RawInflationRow {
                    country: Some(country.to_string()),
                    category: Some(display_label(category)),
                    period: Some(month.first_day().format("%Y-%m-%d").to_string()),
                    rate: Some(format!("{rate:.3}")),
                });
            }
        }
    }
    rows
}

pub fn synthetic_products(seed: u64) -> Vec<RawPriceRow> {
    let mut rng = StdRng::seed_from_u64(dataset_seed(seed, DatasetKind::Product));
    let months = sample_months();
    let mut rows = Vec::with_capacity(
        COUNTRY_CODES.len() * CATEGORIES.len() * PRODUCTS_PER_CATEGORY * months.len(),
    );

    for (country_idx, country) in COUNTRY_CODES.iter().enumerate() {
        // Some countries are pricier than others.
        let country_factor = 1.0 + (country_idx % 3) as f64 * 0.1;

        for (category_idx, category) in CATEGORIES.iter().enumerate() {
            let base_price = category_base_price(category);

            for product_idx in 0..PRODUCTS_PER_CATEGORY {
                let product_id = format!("{country}-{:02}{}", category_idx + 1, product_idx + 1);
                let brand = BRANDS[rng.gen_range(0..BRANDS.len())];
                let product_factor = 0.9 + product_idx as f64 * 0.05 + rng.r#gen::<f64>() * 0.2;

                for &month in &months {
                    let jitter = 0.98 + rng.r#gen::<f64>() * 0.04;
                    let price = base_price
                        * country_factor
                        * product_factor
                        * time_factor(month, category)
                        * jitter;
                    rows.push(RawPriceRow {
                        product_id: Some(product_id.clone()),
                        brand: Some(brand.to_string()),
                        category: Some(display_label(category)),
                        country: Some(country.to_string()),
                        observed_date: Some(month.first_day().format("%Y-%m-%d").to_string()),
                        price: Some(format!("{price:.2}")),
                        currency: Some("EUR".to_string()),
                    });
                }
            }
        }
    }
    rows
}

fn dataset_seed(seed: u64, kind: DatasetKind) -> u64 {
    match kind {
        DatasetKind::Inflation => seed ^ 0x5151_a7e0_0000_0001,
        DatasetKind::Product => seed ^ 0x9e37_79b9_7f4a_7c15,
    }
}

fn sample_months() -> Vec<Month> {
    let mut months = Vec::with_capacity(MONTHS);
    let mut current = Month::new(START_YEAR, 1);
    while let Some(month) = current {
        if months.len() == MONTHS {
            break;
        }
        months.push(month);
        current = month.succ();
    }
    months
}

// Regimes: flat 2020, mid-2021 spike, 2022 peak, 2023 decline.
fn regime_rate(month: Month, country_idx: usize) -> f64 {
    let (year, m) = (month.year(), month.month() as f64);
    let i = country_idx as f64;
    match year {
        2021 if month.month() >= 6 => 3.5 + (country_idx % 3) as f64,
        2022 => 5.0 + (country_idx % 4) as f64,
        2023 if month.month() <= 6 => 4.0 - m * 0.2 + (country_idx % 3) as f64,
        2023 => 2.5 - (m - 6.0) * 0.1 + (country_idx % 2) as f64,
        _ => 2.0 + i * 0.05,
    }
}

fn category_inflation_factor(category: &str) -> f64 {
    match category {
        "dairy products" | "meat" => 1.2,
        "fruit" | "vegetables" => 1.3,
        "beverages" => 0.8,
        _ => 1.0,
    }
}

fn category_base_price(category: &str) -> f64 {
    match category {
        "bread and cereals" => 2.8,
        "meat" => 8.5,
        "fish" => 10.0,
        "dairy products" => 3.5,
        "fruit" => 2.5,
        "vegetables" => 2.2,
        "beverages" => 1.5,
        "confectionery" => 9.0,
        _ => 4.0,
    }
}

fn time_factor(month: Month, category: &str) -> f64 {
    let m = month.month() as f64;
    match month.year() {
        2021 if month.month() >= 6 => 1.03,
        2022 => {
            // Energy costs hit some categories harder.
            if matches!(category, "dairy products" | "meat") {
                1.08 * 1.04
            } else {
                1.08
            }
        }
        2023 if month.month() <= 6 => 1.06 - m * 0.002,
        2023 => 1.05 - (m - 6.0) * 0.001,
        _ => 1.0,
    }
}

/// "dairy products" -> "Dairy products"
fn display_label(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_yields_identical_rows() {
        assert_eq!(synthetic_inflation(7), synthetic_inflation(7));
        assert_eq!(synthetic_products(7), synthetic_products(7));
    }

    #[test]
    fn different_seeds_diverge() {
        assert_ne!(synthetic_products(1), synthetic_products(2));
    }

    #[test]
    fn inflation_covers_every_country_category_month() {
        let rows = synthetic_inflation(DEFAULT_SEED);
        assert_eq!(rows.len(), COUNTRY_CODES.len() * CATEGORIES.len() * MONTHS);
        assert_eq!(rows[0].period.as_deref(), Some("2020-01-01"));
        assert_eq!(rows[MONTHS - 1].period.as_deref(), Some("2023-12-01"));
    }

    #[test]
    fn product_rows_are_complete_and_positive() {
        let rows = synthetic_products(DEFAULT_SEED);
        assert_eq!(
            rows.len(),
            COUNTRY_CODES.len() * CATEGORIES.len() * PRODUCTS_PER_CATEGORY * MONTHS
        );
        for row in &rows {
            let price: f64 = row.price.as_deref().unwrap().parse().unwrap();
            assert!(price > 0.0);
            assert!(row.brand.is_some() && row.currency.is_some());
        }
    }

    #[test]
    fn display_label_capitalizes_first_letter() {
        assert_eq!(display_label("dairy products"), "Dairy products");
        assert_eq!(display_label(""), "");
    }
}
