//! Price/inflation alignment.
//!
//! Product prices are averaged per (country, category, month) bucket and
//! left-joined to the inflation rate for the same key. Buckets with no
//! inflation row are kept with an empty rate.
//!
//! The price change of a bucket is measured against the previous month that
//! has prices for the same group. When months are missing in between, that
//! baseline is older than the prior calendar month.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{
    ComparisonPoint, ComparisonSeries, InflationRecord, Month, ProductPriceRecord, SourceTag,
};

#[derive(Debug, Clone, Copy)]
struct Bucket {
    sum: f64,
    count: usize,
    source: SourceTag,
}

/// Build the comparison series, ordered by period, country, category.
pub fn aggregate(inflation: &[InflationRecord], products: &[ProductPriceRecord]) -> ComparisonSeries {
    let mut groups: BTreeMap<(&str, &str), BTreeMap<Month, Bucket>> = BTreeMap::new();
    for p in products {
        let bucket = groups
            .entry((p.country.as_str(), p.category.as_str()))
            .or_default()
            .entry(Month::of(p.observed_date))
            .or_insert(Bucket {
                sum: 0.0,
                count: 0,
                source: p.source,
            });
        bucket.sum += p.price;
        bucket.count += 1;
    }

    let mut rates: HashMap<(&str, &str, Month), &InflationRecord> = HashMap::new();
    for r in inflation {
        rates
            .entry((r.country.as_str(), r.category.as_str(), r.period))
            .or_insert(r);
    }

    let mut series = Vec::new();
    for ((country, category), buckets) in groups {
        let mut previous: Option<f64> = None;
        for (period, bucket) in buckets {
            let avg_price = bucket.sum / bucket.count as f64;
            let rate = rates.get(&(country, category, period));
            series.push(ComparisonPoint {
                period,
                country: country.to_string(),
                category: category.to_string(),
                avg_price,
                avg_price_change_pct: previous.and_then(|prev| pct_change(prev, avg_price)),
                inflation_rate_pct: rate.map(|r| r.rate),
                price_source: bucket.source,
                inflation_source: rate.map(|r| r.source),
                product_count: bucket.count,
            });
            previous = Some(avg_price);
        }
    }

    series.sort_by(|a, b| {
        a.period
            .cmp(&b.period)
            .then_with(|| a.country.cmp(&b.country))
            .then_with(|| a.category.cmp(&b.category))
    });
    series
}

fn pct_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let change = (current - previous) / previous * 100.0;
    change.is_finite().then_some(change)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn price(id: &str, country: &str, category: &str, ymd: (i32, u32, u32), value: f64) -> ProductPriceRecord {
        ProductPriceRecord {
            product_id: id.into(),
            brand: "arla".into(),
            category: category.into(),
            country: country.into(),
            observed_date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            price: value,
            currency: "EUR".into(),
            source: SourceTag::Live,
        }
    }

    fn rate(country: &str, category: &str, year: i32, month: u32, value: f64) -> InflationRecord {
        InflationRecord {
            country: country.into(),
            category: category.into(),
            period: Month::new(year, month).unwrap(),
            rate: value,
            source: SourceTag::Synthetic,
        }
    }

    #[test]
    fn missing_inflation_keeps_the_bucket() {
        let products = vec![price("P1", "US", "dairy", (2023, 1, 10), 2.0)];
        let inflation = vec![rate("DE", "dairy", 2023, 1, 8.0)];
        let series = aggregate(&inflation, &products);

        assert_eq!(series.len(), 1);
        let point = &series[0];
        assert_eq!((point.country.as_str(), point.category.as_str()), ("US", "dairy"));
        assert_eq!(point.period, Month::new(2023, 1).unwrap());
        assert_eq!(point.inflation_rate_pct, None);
        assert_eq!(point.inflation_source, None);
        assert_eq!(point.avg_price_change_pct, None);
    }

    #[test]
    fn averages_and_changes_per_group() {
        let products = vec![
            price("P1", "DE", "dairy", (2023, 1, 1), 1.0),
            price("P2", "DE", "dairy", (2023, 1, 15), 3.0),
            price("P1", "DE", "dairy", (2023, 2, 1), 2.2),
            price("P2", "DE", "dairy", (2023, 2, 15), 2.2),
        ];
        let inflation = vec![rate("DE", "dairy", 2023, 1, 9.5), rate("DE", "dairy", 2023, 2, 9.0)];
        let series = aggregate(&inflation, &products);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].avg_price, 2.0);
        assert_eq!(series[0].product_count, 2);
        assert_eq!(series[0].avg_price_change_pct, None);
        assert_eq!(series[0].inflation_rate_pct, Some(9.5));

        let change = series[1].avg_price_change_pct.unwrap();
        assert!((change - 10.0).abs() < 1e-9, "expected 10%, got {change}");
        assert_eq!(series[1].inflation_rate_pct, Some(9.0));
    }

    #[test]
    fn orders_by_period_then_country_then_category() {
        let products = vec![
            price("P1", "FR", "meat", (2023, 2, 1), 1.0),
            price("P2", "DE", "meat", (2023, 2, 1), 1.0),
            price("P3", "DE", "fish", (2023, 2, 1), 1.0),
            price("P4", "FR", "fish", (2023, 1, 1), 1.0),
        ];
        let series = aggregate(&[], &products);
        let keys: Vec<(String, &str, &str)> = series
            .iter()
            .map(|p| (p.period.to_string(), p.country.as_str(), p.category.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2023-01".to_string(), "FR", "fish"),
                ("2023-02".to_string(), "DE", "fish"),
                ("2023-02".to_string(), "DE", "meat"),
                ("2023-02".to_string(), "FR", "meat"),
            ]
        );
    }

    #[test]
    fn provenance_tags_flow_through() {
        let products = vec![price("P1", "DE", "meat", (2023, 1, 1), 4.0)];
        let inflation = vec![rate("DE", "meat", 2023, 1, 6.0)];
        let series = aggregate(&inflation, &products);
        assert_eq!(series[0].price_source, SourceTag::Live);
        assert_eq!(series[0].inflation_source, Some(SourceTag::Synthetic));
    }

    #[test]
    fn empty_inputs_give_empty_series() {
        assert!(aggregate(&[], &[]).is_empty());
        assert!(aggregate(&[rate("DE", "meat", 2023, 1, 1.0)], &[]).is_empty());
    }

    #[test]
    fn zero_previous_price_has_no_change() {
        assert_eq!(pct_change(0.0, 1.0), None);
        assert_eq!(pct_change(2.0, 1.0), Some(-50.0));
    }

    #[test]
    fn price_change_spans_missing_months() {
        let products = vec![
            price("P1", "DE", "meat", (2023, 1, 10), 2.0),
            price("P1", "DE", "meat", (2023, 3, 10), 2.5),
        ];
        let series = aggregate(&[], &products);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].period, Month::new(2023, 3).unwrap());
        // March compares with January; February has no bucket.
        assert_eq!(series[1].avg_price_change_pct, Some(25.0));
    }
}
