//! Parses delimited sales data into a [`RecordSet`].
//!
//! A schema mismatch rejects the whole load. Individual rows that cannot be
//! parsed are skipped and reported in the [`LoadReport`], unless the loader
//! runs in strict mode, where the first such row aborts the load.

use crate::core::config::{Encoding, LoaderConfig};
use crate::core::error::LoadError;
use crate::core::record::{RawRecord, RecordSet};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ByteRecord, ReaderBuilder};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// A row left out of the record set, with the 1-based line it was read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub rows_read: u64,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub records: RecordSet,
    pub report: LoadReport,
}

/// Position of each known column in the header row.
#[derive(Debug)]
struct ColumnMap {
    invoice_no: Option<usize>,
    stock_code: Option<usize>,
    description: Option<usize>,
    quantity: usize,
    invoice_date: usize,
    unit_price: usize,
    customer_id: usize,
    country: usize,
}

const REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("quantity", "Quantity"),
    ("invoicedate", "InvoiceDate"),
    ("unitprice", "UnitPrice"),
    ("customerid", "CustomerID"),
    ("country", "Country"),
];

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| normalize_header(h) == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|(name, _)| find(name).is_none())
            .map(|(_, display)| display.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns(missing));
        }

        // Required lookups are known to succeed past this point.
        let position = |name: &str| find(name).unwrap_or_default();
        Ok(ColumnMap {
            invoice_no: find("invoiceno"),
            stock_code: find("stockcode"),
            description: find("description"),
            quantity: position("quantity"),
            invoice_date: position("invoicedate"),
            unit_price: position("unitprice"),
            customer_id: position("customerid"),
            country: position("country"),
        })
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim_start_matches("\u{ef}\u{bb}\u{bf}")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Reads sales datasets according to a [`LoaderConfig`].
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    config: LoaderConfig,
}

impl DatasetLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn load<R: Read>(&self, reader: R) -> Result<LoadOutcome, LoadError> {
        self.load_with_progress(reader, &|| ())
    }

    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<LoadOutcome, LoadError> {
        let file = std::fs::File::open(path.as_ref())?;
        self.load(file)
    }

    /// Same as [`DatasetLoader::load`], calling `on_row` after every data row.
    pub fn load_with_progress<R: Read>(
        &self,
        reader: R,
        on_row: &dyn Fn(),
    ) -> Result<LoadOutcome, LoadError> {
        let delimiter = u8::try_from(self.config.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(LoadError::InvalidDelimiter(self.config.delimiter))?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_reader(reader);

        let headers = rdr
            .byte_headers()?
            .iter()
            .map(|field| self.decode(field))
            .collect::<Result<Vec<_>, _>>()
            .map_err(LoadError::InvalidHeader)?;
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::EmptyHeader);
        }
        let columns = ColumnMap::resolve(&headers)?;
        debug!(?columns, "Resolved dataset columns");

        let mut raw_records = Vec::new();
        let mut report = LoadReport::default();
        let mut row = ByteRecord::new();

        loop {
            let parsed = match rdr.read_byte_record(&mut row) {
                Ok(false) => break,
                Ok(true) => {
                    let line = row.position().map_or(0, |p| p.line());
                    self.parse_row(&row, &columns).map_err(|reason| (line, reason))
                }
                Err(e) => match e.kind() {
                    csv::ErrorKind::UnequalLengths { pos, .. } => {
                        let line = pos.as_ref().map_or(0, |p| p.line());
                        Err((line, "wrong number of fields".to_string()))
                    }
                    _ => return Err(e.into()),
                },
            };
            report.rows_read += 1;
            on_row();

            match parsed {
                Ok(raw) => raw_records.push(raw),
                Err((line, reason)) => {
                    if self.config.strict {
                        return Err(LoadError::MalformedRow { line, reason });
                    }
                    debug!(line, %reason, "Skipping malformed row");
                    report.skipped.push(SkippedRow { line, reason });
                }
            }
        }

        if !report.skipped.is_empty() {
            warn!(
                skipped = report.skipped.len(),
                rows = report.rows_read,
                "Some rows could not be parsed and were left out"
            );
        }

        let records: RecordSet = raw_records.into_iter().collect();
        info!(records = records.len(), "Dataset loaded");
        Ok(LoadOutcome { records, report })
    }

    fn decode(&self, field: &[u8]) -> Result<String, String> {
        match self.config.encoding {
            Encoding::Latin1 => Ok(field.iter().map(|&b| b as char).collect()),
            Encoding::Utf8 => std::str::from_utf8(field)
                .map(str::to_string)
                .map_err(|e| format!("invalid UTF-8: {e}")),
        }
    }

    fn parse_row(&self, row: &ByteRecord, columns: &ColumnMap) -> Result<RawRecord, String> {
        let field = |idx: usize| -> Result<String, String> {
            row.get(idx)
                .map_or(Ok(String::new()), |bytes| self.decode(bytes))
        };
        let optional = |idx: Option<usize>| idx.map_or(Ok(String::new()), |i| field(i));

        let quantity_text = field(columns.quantity)?;
        let quantity = parse_quantity(quantity_text.trim())
            .ok_or_else(|| format!("invalid Quantity '{}'", quantity_text.trim()))?;

        let price_text = field(columns.unit_price)?;
        let unit_price = price_text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| format!("invalid UnitPrice '{}'", price_text.trim()))?;

        let date_text = field(columns.invoice_date)?;
        let invoice_date = parse_date(date_text.trim(), self.config.date_format.as_deref())
            .ok_or_else(|| format!("invalid InvoiceDate '{}'", date_text.trim()))?;

        let customer_id = Some(field(columns.customer_id)?).filter(|c| !c.trim().is_empty());

        Ok(RawRecord {
            invoice_no: optional(columns.invoice_no)?.trim().to_string(),
            stock_code: optional(columns.stock_code)?.trim().to_string(),
            description: optional(columns.description)?.trim().to_string(),
            quantity,
            invoice_date,
            unit_price,
            customer_id,
            country: field(columns.country)?,
        })
    }
}

/// Accepts integers, and floats with no fractional part ("6.0") that fit in
/// an `i64`.
fn parse_quantity(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|q| q.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(q))
            .map(|q| q as i64)
    })
}

fn parse_date(text: &str, custom_format: Option<&str>) -> Option<NaiveDateTime> {
    if let Some(format) = custom_format {
        return NaiveDateTime::parse_from_str(text, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            });
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,12/1/2010 8:26,2.55,17850,United Kingdom
536365,71053,WHITE METAL LANTERN,6,12/1/2010 8:26,3.39,17850,United Kingdom
C536379,D,Discount,-1,12/1/2010 9:41,27.5,14527,United Kingdom
536414,22139,,56,12/1/2010 11:52,0,,United Kingdom
536370,22728,ALARM CLOCK BAKELIKE PINK,24,12/1/2010 8:45,3.75,12583,France
";

    #[test]
    fn test_load_sample_csv() {
        let outcome = DatasetLoader::default().load(SAMPLE_CSV.as_bytes()).unwrap();
        let records = outcome.records;

        assert_eq!(records.len(), 5);
        assert_eq!(outcome.report.rows_read, 5);
        assert!(outcome.report.skipped.is_empty());

        let first = &records.as_slice()[0];
        assert_eq!(first.invoice_no(), Some("536365"));
        assert_eq!(first.stock_code(), "85123A");
        assert_eq!(first.quantity(), 6);
        assert!((first.revenue() - 15.3).abs() < 1e-9);
        assert_eq!(first.invoice_month(), 12);
        assert_eq!(first.invoice_year(), 2010);
        assert_eq!(first.customer_id(), Some("17850"));

        let discount = &records.as_slice()[2];
        assert_eq!(discount.quantity(), -1);
        assert_eq!(discount.revenue(), -27.5);

        let anonymous = &records.as_slice()[3];
        assert_eq!(anonymous.customer_id(), None);
        assert_eq!(anonymous.description(), "");
    }

    #[test]
    fn test_missing_required_columns_rejects_load() {
        let csv = "InvoiceNo,Quantity,UnitPrice\n1,2,3.0\n";
        let err = DatasetLoader::default().load(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["InvoiceDate", "CustomerID", "Country"]);
            }
            other => panic!("Expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = DatasetLoader::default().load("".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::EmptyHeader));
    }

    #[test]
    fn test_header_matching_is_lenient() {
        let csv = "\u{feff}quantity, Invoice_Date ,UNIT PRICE,customer_id,country\n\
                   3,2011-01-05 10:00:00,1.5,A1,Germany\n";
        let outcome = DatasetLoader::new(LoaderConfig {
            encoding: Encoding::Utf8,
            ..LoaderConfig::default()
        })
        .load(csv.as_bytes())
        .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records.as_slice()[0].invoice_no(), None);
        assert_eq!(outcome.records.as_slice()[0].revenue(), 4.5);
    }

    #[test]
    fn test_malformed_rows_are_skipped_and_reported() {
        let csv = "\
Quantity,InvoiceDate,UnitPrice,CustomerID,Country
2,2011-01-05,1.0,A,UK
two,2011-01-05,1.0,A,UK
2,yesterday,1.0,A,UK
2,2011-01-05,cheap,A,UK
2,2011-01-05
4,2011-02-01,2.0,B,FR
";
        let outcome = DatasetLoader::default().load(csv.as_bytes()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.report.rows_read, 6);

        let lines: Vec<u64> = outcome.report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
        assert!(outcome.report.skipped[0].reason.contains("Quantity"));
        assert!(outcome.report.skipped[1].reason.contains("InvoiceDate"));
        assert!(outcome.report.skipped[2].reason.contains("UnitPrice"));
        assert_eq!(outcome.report.skipped[3].reason, "wrong number of fields");
    }

    #[test]
    fn test_out_of_range_quantity_is_skipped() {
        let csv = "\
Quantity,InvoiceDate,UnitPrice,CustomerID,Country
1e30,2011-01-05,1.0,A,UK
3.0,2011-01-06,1.0,A,UK
";
        let outcome = DatasetLoader::default().load(csv.as_bytes()).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records.as_slice()[0].quantity(), 3);
        assert_eq!(outcome.report.skipped.len(), 1);
        assert_eq!(outcome.report.skipped[0].line, 2);
        assert_eq!(outcome.report.skipped[0].reason, "invalid Quantity '1e30'");
    }

    #[test]
    fn test_strict_mode_aborts_on_malformed_row() {
        let csv = "\
Quantity,InvoiceDate,UnitPrice,CustomerID,Country
2,2011-01-05,1.0,A,UK
2,not a date,1.0,A,UK
";
        let loader = DatasetLoader::new(LoaderConfig {
            strict: true,
            ..LoaderConfig::default()
        });
        match loader.load(csv.as_bytes()).unwrap_err() {
            LoadError::MalformedRow { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("not a date"));
            }
            other => panic!("Expected MalformedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_latin1_descriptions_are_decoded() {
        let mut bytes = b"Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country\n".to_vec();
        bytes.extend_from_slice(b"CR\xc8ME BRUL\xc9E,1,2011-03-01,4.0,C,France\n");

        let outcome = DatasetLoader::default().load(bytes.as_slice()).unwrap();
        assert_eq!(outcome.records.as_slice()[0].description(), "CRÈME BRULÉE");

        let utf8 = DatasetLoader::new(LoaderConfig {
            encoding: Encoding::Utf8,
            ..LoaderConfig::default()
        });
        let outcome = utf8.load(bytes.as_slice()).unwrap();
        assert!(outcome.records.is_empty());
        assert!(outcome.report.skipped[0].reason.contains("invalid UTF-8"));
    }

    #[test]
    fn test_custom_delimiter_and_date_format() {
        let csv = "\
Quantity;InvoiceDate;UnitPrice;CustomerID;Country
5;05.01.2011 14:30;2.0;A;UK
";
        let loader = DatasetLoader::new(LoaderConfig {
            delimiter: ';',
            date_format: Some("%d.%m.%Y %H:%M".to_string()),
            ..LoaderConfig::default()
        });
        let outcome = loader.load(csv.as_bytes()).unwrap();
        let record = &outcome.records.as_slice()[0];
        assert_eq!(record.invoice_month(), 1);
        assert_eq!(record.invoice_date().to_string(), "2011-01-05 14:30:00");
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let loader = DatasetLoader::new(LoaderConfig {
            delimiter: '¦',
            ..LoaderConfig::default()
        });
        let err = loader.load("a".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDelimiter('¦')));
    }

    #[test]
    fn test_progress_callback_runs_per_row() {
        let count = std::cell::Cell::new(0);
        DatasetLoader::default()
            .load_with_progress(SAMPLE_CSV.as_bytes(), &|| count.set(count.get() + 1))
            .unwrap();
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_parse_quantity_and_dates() {
        assert_eq!(parse_quantity("12"), Some(12));
        assert_eq!(parse_quantity("-3.0"), Some(-3));
        assert_eq!(parse_quantity("1.5"), None);
        assert_eq!(parse_quantity("1e3"), Some(1000));
        assert_eq!(parse_quantity("1e30"), None);
        assert_eq!(parse_quantity("-1e19"), None);
        assert_eq!(parse_quantity("inf"), None);
        assert_eq!(parse_quantity("NaN"), None);
        assert_eq!(parse_quantity("9223372036854775807"), Some(i64::MAX));
        assert!(parse_date("12/9/2011 12:50", None).is_some());
        assert!(parse_date("2011-12-09T12:50:00", None).is_some());
        assert_eq!(
            parse_date("2011-12-09", None).unwrap().time(),
            NaiveTime::MIN
        );
        assert!(parse_date("09/12/2011 12:50", Some("%Y")).is_none());
    }
}
