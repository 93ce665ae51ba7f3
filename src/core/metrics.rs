//! KPI derivations over a loaded [`RecordSet`].
//!
//! Every metric is a pure function built on [`group_by`]. They all refuse an
//! empty record set with [`MetricError::EmptyDataset`] so callers never draw
//! an empty chart by accident.

use crate::core::error::MetricError;
use crate::core::record::{Period, Record, RecordSet};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use tracing::debug;

/// A value aggregated over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyValue<T> {
    pub period: Period,
    pub value: T,
}

impl<T> MonthlyValue<T> {
    pub fn month(&self) -> u32 {
        self.period.month
    }

    pub fn year(&self) -> i32 {
        self.period.year
    }
}

/// Whether a purchase was the customer's first in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum UserType {
    New,
    Existing,
}

impl Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserType::New => write!(f, "New"),
            UserType::Existing => write!(f, "Existing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTypeRevenue {
    pub period: Period,
    pub user_type: UserType,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRevenue {
    pub country: String,
    pub revenue: f64,
}

/// Countries sorted by total revenue, highest first. Countries with equal
/// revenue keep the order in which they first appear in the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CountryRanking {
    entries: Vec<CountryRevenue>,
}

impl CountryRanking {
    pub fn entries(&self) -> &[CountryRevenue] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `n` best performing countries, best first.
    pub fn top_n(&self, n: usize) -> &[CountryRevenue] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// The `n` worst performing countries, in ranking order (worst last).
    /// Overlaps with [`CountryRanking::top_n`] when there are fewer than
    /// `2 * n` countries.
    pub fn bottom_n(&self, n: usize) -> &[CountryRevenue] {
        &self.entries[self.entries.len().saturating_sub(n)..]
    }

    pub fn total_revenue(&self) -> f64 {
        self.entries.iter().map(|e| e.revenue).sum()
    }
}

/// Groups records by the key `key_fn` extracts and folds each group into an
/// accumulator. Records for which `key_fn` returns `None` are left out.
/// Groups come back in the order their key was first seen.
pub fn group_by<'a, K, A>(
    records: &'a RecordSet,
    key_fn: impl Fn(&'a Record) -> Option<K>,
    init: impl Fn() -> A,
    fold: impl Fn(&mut A, &'a Record),
) -> Vec<(K, A)>
where
    K: Eq + Hash + Clone,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, A)> = Vec::new();

    for record in records {
        let Some(key) = key_fn(record) else {
            continue;
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, init()));
            groups.len() - 1
        });
        fold(&mut groups[slot].1, record);
    }

    groups
}

fn ensure_not_empty(records: &RecordSet, metric: &'static str) -> Result<(), MetricError> {
    if records.is_empty() {
        debug!(metric, "Refusing to aggregate an empty dataset");
        return Err(MetricError::EmptyDataset { metric });
    }
    Ok(())
}

fn by_period<T>(groups: Vec<(Period, T)>) -> Vec<MonthlyValue<T>> {
    let mut values: Vec<MonthlyValue<T>> = groups
        .into_iter()
        .map(|(period, value)| MonthlyValue { period, value })
        .collect();
    values.sort_by_key(|v| v.period);
    values
}

/// Total revenue per month.
pub fn monthly_revenue(records: &RecordSet) -> Result<Vec<MonthlyValue<f64>>, MetricError> {
    ensure_not_empty(records, "monthly revenue")?;
    let groups = group_by(
        records,
        |r| Some(r.period()),
        || 0.0,
        |total, r| *total += r.revenue(),
    );
    Ok(by_period(groups))
}

/// Total quantity sold per month, returns included.
pub fn monthly_units_sold(records: &RecordSet) -> Result<Vec<MonthlyValue<i64>>, MetricError> {
    const METRIC: &str = "monthly units sold";
    ensure_not_empty(records, METRIC)?;
    // Summed in 128 bits: a handful of extreme quantities cannot wrap.
    let groups = group_by(
        records,
        |r| Some(r.period()),
        || 0_i128,
        |total, r| *total += i128::from(r.quantity()),
    )
    .into_iter()
    .map(|(period, total)| {
        i64::try_from(total)
            .map(|total| (period, total))
            .map_err(|_| MetricError::Overflow {
                metric: METRIC,
                period,
            })
    })
    .collect::<Result<Vec<_>, _>>()?;
    Ok(by_period(groups))
}

/// Distinct customers per month. Rows without a customer id still make their
/// month appear, but are never counted.
pub fn monthly_active_customers(
    records: &RecordSet,
) -> Result<Vec<MonthlyValue<usize>>, MetricError> {
    ensure_not_empty(records, "monthly active customers")?;
    let groups = group_by(
        records,
        |r| Some(r.period()),
        HashSet::new,
        |customers, r| {
            if let Some(id) = r.customer_id() {
                customers.insert(id);
            }
        },
    );
    Ok(by_period(
        groups
            .into_iter()
            .map(|(period, customers)| (period, customers.len()))
            .collect(),
    ))
}

/// Mean revenue per invoice for each month: the month's invoiced revenue
/// divided by its number of distinct invoices. Rows without an invoice number
/// are left out, and so is a month with none.
pub fn monthly_average_order_value(
    records: &RecordSet,
) -> Result<Vec<MonthlyValue<f64>>, MetricError> {
    ensure_not_empty(records, "monthly average order value")?;
    let groups = group_by(
        records,
        |r| r.invoice_no().map(|_| r.period()),
        || (0.0, HashSet::new()),
        |(total, invoices), r| {
            *total += r.revenue();
            if let Some(invoice) = r.invoice_no() {
                invoices.insert(invoice);
            }
        },
    );
    Ok(by_period(
        groups
            .into_iter()
            .map(|(period, (total, invoices))| (period, total / invoices.len() as f64))
            .collect(),
    ))
}

/// Revenue per country, highest first.
pub fn country_revenue_ranking(records: &RecordSet) -> Result<CountryRanking, MetricError> {
    ensure_not_empty(records, "country revenue ranking")?;
    let mut entries: Vec<CountryRevenue> = group_by(
        records,
        |r| Some(r.country()),
        || 0.0,
        |total, r| *total += r.revenue(),
    )
    .into_iter()
    .map(|(country, revenue)| CountryRevenue {
        country: country.to_string(),
        revenue,
    })
    .collect();

    // Stable sort: ties stay in first-seen order.
    entries.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    Ok(CountryRanking { entries })
}

/// Earliest invoice date of every customer in the dataset.
pub fn customer_first_purchases(records: &RecordSet) -> HashMap<&str, NaiveDateTime> {
    let mut first_purchases: HashMap<&str, NaiveDateTime> = HashMap::new();
    for record in records {
        if let Some(id) = record.customer_id() {
            first_purchases
                .entry(id)
                .and_modify(|first| *first = (*first).min(record.invoice_date()))
                .or_insert(record.invoice_date());
        }
    }
    first_purchases
}

fn user_type(record: &Record, first_purchases: &HashMap<&str, NaiveDateTime>) -> Option<UserType> {
    let first = first_purchases.get(record.customer_id()?)?;
    if record.invoice_date() > *first {
        Some(UserType::Existing)
    } else {
        Some(UserType::New)
    }
}

/// The [`UserType`] of every record, in record order. `None` for records with
/// no customer id.
pub fn classify_user_types(records: &RecordSet) -> Vec<Option<UserType>> {
    let first_purchases = customer_first_purchases(records);
    records
        .iter()
        .map(|r| user_type(r, &first_purchases))
        .collect()
}

/// Revenue per month split between first purchases and repeat purchases.
/// Records without a customer id are left out.
pub fn new_vs_existing_revenue(records: &RecordSet) -> Result<Vec<UserTypeRevenue>, MetricError> {
    ensure_not_empty(records, "new vs existing revenue")?;
    let first_purchases = customer_first_purchases(records);
    let mut rows: Vec<UserTypeRevenue> = group_by(
        records,
        |r| user_type(r, &first_purchases).map(|t| (r.period(), t)),
        || 0.0,
        |total, r| *total += r.revenue(),
    )
    .into_iter()
    .map(|((period, user_type), revenue)| UserTypeRevenue {
        period,
        user_type,
        revenue,
    })
    .collect();

    rows.sort_by_key(|row| (row.period, row.user_type));
    Ok(rows)
}

/// Every KPI of the business snapshot view, computed in one pass over the
/// metric functions.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessSnapshot {
    pub monthly_revenue: Vec<MonthlyValue<f64>>,
    pub monthly_units_sold: Vec<MonthlyValue<i64>>,
    pub monthly_active_customers: Vec<MonthlyValue<usize>>,
    pub monthly_average_order_value: Vec<MonthlyValue<f64>>,
    pub country_ranking: CountryRanking,
    pub top_countries: Vec<CountryRevenue>,
    pub bottom_countries: Vec<CountryRevenue>,
    pub new_vs_existing_revenue: Vec<UserTypeRevenue>,
}

impl BusinessSnapshot {
    pub fn compute(records: &RecordSet, top_n: usize) -> Result<Self, MetricError> {
        let country_ranking = country_revenue_ranking(records)?;
        Ok(BusinessSnapshot {
            monthly_revenue: monthly_revenue(records)?,
            monthly_units_sold: monthly_units_sold(records)?,
            monthly_active_customers: monthly_active_customers(records)?,
            monthly_average_order_value: monthly_average_order_value(records)?,
            top_countries: country_ranking.top_n(top_n).to_vec(),
            bottom_countries: country_ranking.bottom_n(top_n).to_vec(),
            country_ranking,
            new_vs_existing_revenue: new_vs_existing_revenue(records)?,
        })
    }
}
