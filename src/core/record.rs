//! Invoice line items and the immutable record set they live in.

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use std::fmt::Display;

/// Country used when a row carries no country at all.
pub const UNSPECIFIED_COUNTRY: &str = "Unspecified";

/// Number of source columns plus derived columns carried by every record.
pub const SOURCE_COLUMNS: usize = 8;
pub const DERIVED_COLUMNS: usize = 3;

/// A line item as read from the source, before any field is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: f64,
    pub customer_id: Option<String>,
    pub country: String,
}

/// One invoice line item with its derived fields.
///
/// Fields are private: `revenue`, `invoice_month` and `invoice_year` are only
/// ever computed from the source fields in [`Record::from`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    invoice_no: String,
    stock_code: String,
    description: String,
    quantity: i64,
    invoice_date: NaiveDateTime,
    unit_price: f64,
    customer_id: Option<String>,
    country: String,
    revenue: f64,
    invoice_month: u32,
    invoice_year: i32,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        let country = match raw.country.trim() {
            "" => UNSPECIFIED_COUNTRY.to_string(),
            c => c.to_string(),
        };
        let customer_id = raw
            .customer_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Record {
            revenue: raw.unit_price * raw.quantity as f64,
            invoice_month: raw.invoice_date.month(),
            invoice_year: raw.invoice_date.year(),
            invoice_no: raw.invoice_no,
            stock_code: raw.stock_code,
            description: raw.description,
            quantity: raw.quantity,
            invoice_date: raw.invoice_date,
            unit_price: raw.unit_price,
            customer_id,
            country,
        }
    }
}

impl Record {
    pub fn invoice_no(&self) -> Option<&str> {
        Some(self.invoice_no.as_str()).filter(|s| !s.is_empty())
    }

    pub fn stock_code(&self) -> &str {
        &self.stock_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn invoice_date(&self) -> NaiveDateTime {
        self.invoice_date
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn revenue(&self) -> f64 {
        self.revenue
    }

    pub fn invoice_month(&self) -> u32 {
        self.invoice_month
    }

    pub fn invoice_year(&self) -> i32 {
        self.invoice_year
    }

    pub fn period(&self) -> Period {
        Period {
            year: self.invoice_year,
            month: self.invoice_month,
        }
    }
}

/// Calendar month used as a grouping key. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Ordered, immutable collection of records produced by a single load.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }
}

impl FromIterator<RawRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Record::from).collect())
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
