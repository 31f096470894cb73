//! Reference vocabulary and the string normalization rules used for joining.

use std::collections::BTreeSet;

/// Country codes covered by the reference data.
pub const COUNTRY_CODES: [&str; 8] = ["DE", "FR", "ES", "IT", "NL", "BE", "AT", "PT"];

/// Food categories shared by the inflation and product datasets.
pub const CATEGORIES: [&str; 8] = [
    "bread and cereals",
    "meat",
    "fish",
    "dairy products",
    "fruit",
    "vegetables",
    "beverages",
    "confectionery",
];

/// Country codes compare trimmed and upper-cased.
pub fn normalize_country(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Categories and brands compare trimmed, with runs of whitespace collapsed,
/// lower-cased.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Known dimension values; rows outside it lower the consistency score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceVocabulary {
    countries: BTreeSet<String>,
    categories: BTreeSet<String>,
}

impl ReferenceVocabulary {
    pub fn new<C, K>(countries: C, categories: K) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            countries: countries
                .into_iter()
                .map(|c| normalize_country(c.as_ref()))
                .collect(),
            categories: categories
                .into_iter()
                .map(|c| normalize_label(c.as_ref()))
                .collect(),
        }
    }

    pub fn contains_country(&self, country: &str) -> bool {
        self.countries.contains(country)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }
}

impl Default for ReferenceVocabulary {
    fn default() -> Self {
        Self::new(COUNTRY_CODES, CATEGORIES)
    }
}
