//! Shape, preview and descriptive statistics of a loaded dataset.

use crate::core::error::MetricError;
use crate::core::record::{DERIVED_COLUMNS, Record, RecordSet, SOURCE_COLUMNS};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shape {
    pub rows: usize,
    pub columns: usize,
}

/// Summary statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: &'static str,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation. Undefined for a single value.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

pub fn shape(records: &RecordSet) -> Shape {
    Shape {
        rows: records.len(),
        columns: SOURCE_COLUMNS + DERIVED_COLUMNS,
    }
}

pub fn head(records: &RecordSet, n: usize) -> &[Record] {
    let slice = records.as_slice();
    &slice[..n.min(slice.len())]
}

/// Statistics for quantity, unit price and revenue.
pub fn describe(records: &RecordSet) -> Result<Vec<ColumnStats>, MetricError> {
    if records.is_empty() {
        return Err(MetricError::EmptyDataset {
            metric: "descriptive statistics",
        });
    }

    let columns: [(&'static str, fn(&Record) -> f64); 3] = [
        ("Quantity", |r: &Record| r.quantity() as f64),
        ("UnitPrice", Record::unit_price),
        ("Revenue", Record::revenue),
    ];

    Ok(columns
        .into_iter()
        .map(|(name, value)| column_stats(name, records.iter().map(value).collect()))
        .collect())
}

fn column_stats(column: &'static str, mut values: Vec<f64>) -> ColumnStats {
    values.sort_by(f64::total_cmp);
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    });

    ColumnStats {
        column,
        count,
        mean,
        std,
        min: values[0],
        p25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        p75: quantile(&values, 0.75),
        max: values[count - 1],
    }
}

/// Linear interpolation between the two closest ranks of sorted `values`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::RawRecord;
    use chrono::NaiveDate;

    fn records(lines: &[(f64, i64)]) -> RecordSet {
        lines
            .iter()
            .map(|&(price, qty)| RawRecord {
                invoice_no: "536365".to_string(),
                stock_code: "84029G".to_string(),
                description: "KNITTED UNION FLAG HOT WATER BOTTLE".to_string(),
                quantity: qty,
                invoice_date: NaiveDate::from_ymd_opt(2010, 12, 1)
                    .unwrap()
                    .and_hms_opt(8, 26, 0)
                    .unwrap(),
                unit_price: price,
                customer_id: Some("17850".to_string()),
                country: "United Kingdom".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_shape_and_head() {
        let data = records(&[(1.0, 1), (2.0, 2), (3.0, 3)]);
        assert_eq!(
            shape(&data),
            Shape {
                rows: 3,
                columns: 11
            }
        );
        assert_eq!(head(&data, 2).len(), 2);
        assert_eq!(head(&data, 10).len(), 3);
        assert_eq!(head(&data, 2)[1].quantity(), 2);
    }

    #[test]
    fn test_describe_quantity() {
        let data = records(&[(1.0, 1), (1.0, 2), (1.0, 3), (1.0, 4)]);
        let stats = describe(&data).unwrap();
        let quantity = &stats[0];

        assert_eq!(quantity.column, "Quantity");
        assert_eq!(quantity.count, 4);
        assert_eq!(quantity.mean, 2.5);
        assert_eq!(quantity.min, 1.0);
        assert_eq!(quantity.p25, 1.75);
        assert_eq!(quantity.median, 2.5);
        assert_eq!(quantity.p75, 3.25);
        assert_eq!(quantity.max, 4.0);
        let std = quantity.std.unwrap();
        assert!((std - 1.290_994).abs() < 1e-6);
    }

    #[test]
    fn test_describe_revenue_and_single_row() {
        let data = records(&[(2.5, -4)]);
        let stats = describe(&data).unwrap();
        assert_eq!(stats[2].column, "Revenue");
        assert_eq!(stats[2].mean, -10.0);
        assert_eq!(stats[2].std, None);
        assert_eq!(stats[2].median, -10.0);
    }

    #[test]
    fn test_describe_empty() {
        assert!(matches!(
            describe(&RecordSet::default()),
            Err(MetricError::EmptyDataset { .. })
        ));
    }
}
