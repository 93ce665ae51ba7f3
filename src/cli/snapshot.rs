use super::{analysis, ui};
use crate::core::LoadReport;
use crate::core::metrics::{BusinessSnapshot, CountryRevenue, MonthlyValue, UserType};
use crate::core::profile;
use crate::core::session::LoadedDataset;
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Serialize;
use std::collections::BTreeMap;

/// Shape of the `--json` output.
#[derive(Serialize)]
struct SnapshotDocument<'a> {
    store: &'a str,
    source: String,
    fingerprint: &'a str,
    load_report: &'a LoadReport,
    #[serde(flatten)]
    snapshot: &'a BusinessSnapshot,
}

fn monthly_table<T: Copy>(
    values: &[MonthlyValue<T>],
    label: &str,
    to_f64: impl Fn(T) -> f64,
    format_fn: impl Fn(T) -> String,
) -> Table {
    let max = values
        .iter()
        .map(|v| to_f64(v.value).abs())
        .fold(0.0, f64::max);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Month"),
        ui::header_cell(label),
        ui::header_cell(""),
    ]);
    for v in values {
        table.add_row(vec![
            Cell::new(v.period.to_string()),
            ui::number_cell(format_fn(v.value)),
            ui::bar_cell(to_f64(v.value), max),
        ]);
    }
    table
}

/// Countries with their share of the listed total, like the labels of a pie.
/// Shares are only meaningful when every listed revenue is non-negative and
/// the total is positive; otherwise they show as N/A.
fn country_table(countries: &[CountryRevenue]) -> Table {
    let total: f64 = countries.iter().map(|c| c.revenue).sum();
    let has_shares = total > 0.0 && countries.iter().all(|c| c.revenue >= 0.0);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Country"),
        ui::header_cell("Revenue"),
        ui::header_cell("Share"),
    ]);
    for country in countries {
        let share = has_shares.then(|| country.revenue / total * 100.0);
        table.add_row(vec![
            Cell::new(&country.country),
            ui::number_cell(format!("{:.2}", country.revenue)),
            share.map_or_else(
                || ui::format_optional_cell(None::<f64>, |s| s.to_string()),
                |s| ui::format_percentage_cell(s, |s| format!("{s:.1}%")),
            ),
        ]);
    }
    table
}

fn new_vs_existing_table(snapshot: &BusinessSnapshot) -> Table {
    let mut by_period: BTreeMap<_, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for row in &snapshot.new_vs_existing_revenue {
        let entry = by_period.entry(row.period).or_default();
        match row.user_type {
            UserType::New => entry.0 = Some(row.revenue),
            UserType::Existing => entry.1 = Some(row.revenue),
        }
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Month"),
        ui::header_cell(&UserType::New.to_string()),
        ui::header_cell(&UserType::Existing.to_string()),
    ]);
    for (period, (new, existing)) in by_period {
        table.add_row(vec![
            Cell::new(period.to_string()),
            ui::format_optional_cell(new, |v| format!("{v:.2}")),
            ui::format_optional_cell(existing, |v| format!("{v:.2}")),
        ]);
    }
    table
}

pub fn render(snapshot: &BusinessSnapshot, top_n: usize) -> String {
    let sections = [
        (
            "Monthly Revenue Overview",
            monthly_table(
                &snapshot.monthly_revenue,
                "Revenue (in Millions)",
                |v| v,
                |v| format!("{:.3}", v / 1_000_000.0),
            ),
        ),
        (
            "Monthly Items Sold Overview",
            monthly_table(
                &snapshot.monthly_units_sold,
                "Items Sold",
                |v| v as f64,
                |v| v.to_string(),
            ),
        ),
        (
            "Monthly Active Customers",
            monthly_table(
                &snapshot.monthly_active_customers,
                "Active Customers",
                |v| v as f64,
                |v| v.to_string(),
            ),
        ),
        (
            "Average Revenue per Invoice",
            monthly_table(
                &snapshot.monthly_average_order_value,
                "Revenue",
                |v| v,
                |v| format!("{v:.2}"),
            ),
        ),
        (
            "Best Countries (Revenue)",
            country_table(&snapshot.top_countries),
        ),
        (
            "Worst Countries (Revenue)",
            country_table(&snapshot.bottom_countries),
        ),
        (
            "New vs Existing Customer Revenue",
            new_vs_existing_table(snapshot),
        ),
    ];

    let mut output = String::new();
    for (title, table) in sections {
        output.push_str(&format!(
            "\n{}\n\n{table}\n",
            ui::style_text(title, ui::StyleType::Section)
        ));
    }
    output.push_str(&format!(
        "\n{} {}\n",
        ui::style_text("Countries ranked:", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!(
                "{} (showing top and bottom {top_n})",
                snapshot.country_ranking.len()
            ),
            ui::StyleType::Subtle
        )
    ));
    output
}

pub fn run(
    store_name: &str,
    dataset: &LoadedDataset,
    top_n: usize,
    preview_rows: usize,
    json: bool,
) -> Result<()> {
    // Nothing is printed unless every metric succeeded.
    let snapshot = BusinessSnapshot::compute(dataset.records(), top_n)
        .context("Failed to compute business snapshot")?;

    if json {
        let document = SnapshotDocument {
            store: store_name,
            source: dataset.source.to_string(),
            fingerprint: dataset.fingerprint.as_str(),
            load_report: dataset.report(),
            snapshot: &snapshot,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&document).context("Failed to serialize snapshot")?
        );
        return Ok(());
    }

    println!(
        "{}: {}",
        ui::style_text(store_name, ui::StyleType::Title),
        ui::style_text(&dataset.source.to_string(), ui::StyleType::Subtle)
    );
    ui::print_section("Display Data");
    println!(
        "{}",
        analysis::preview_table(profile::head(dataset.records(), preview_rows))
    );
    ui::print_separator();
    print!("{}", render(&snapshot, top_n));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatasetLoader;

    const CSV: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
1,A,Mug,4,2021-01-05,2.5,A,UK
2,B,Jar,10,2021-01-20,1.0,A,UK
3,C,Tin,2,2021-02-01,5.0,B,FR
";

    #[test]
    fn test_render_contains_every_section() {
        let records = DatasetLoader::default().load(CSV.as_bytes()).unwrap().records;
        let snapshot = BusinessSnapshot::compute(&records, 5).unwrap();
        let output = render(&snapshot, 5);

        for title in [
            "Monthly Revenue Overview",
            "Monthly Items Sold Overview",
            "Monthly Active Customers",
            "Average Revenue per Invoice",
            "Best Countries (Revenue)",
            "Worst Countries (Revenue)",
            "New vs Existing Customer Revenue",
        ] {
            assert!(output.contains(title), "missing section {title}");
        }
        assert!(output.contains("2021-01"));
        assert!(output.contains("66.7%"));
        assert!(output.contains("33.3%"));
    }

    #[test]
    fn test_country_shares_need_non_negative_revenue() {
        let countries = |revenues: &[f64]| -> Vec<CountryRevenue> {
            revenues
                .iter()
                .enumerate()
                .map(|(i, &revenue)| CountryRevenue {
                    country: format!("C{i}"),
                    revenue,
                })
                .collect()
        };

        let positive = country_table(&countries(&[30.0, 10.0])).to_string();
        assert!(positive.contains("75.0%"));
        assert!(positive.contains("25.0%"));
        assert!(!positive.contains("N/A"));

        // A country dominated by returns would push the others above 100%.
        let with_returns = country_table(&countries(&[30.0, -10.0])).to_string();
        assert!(!with_returns.contains('%'));
        assert_eq!(with_returns.matches("N/A").count(), 2);
    }

    #[test]
    fn test_snapshot_document_serializes_flat() {
        let records = DatasetLoader::default().load(CSV.as_bytes()).unwrap().records;
        let snapshot = BusinessSnapshot::compute(&records, 1).unwrap();
        let report = LoadReport::default();
        let document = SnapshotDocument {
            store: "DeJa Vu Stores",
            source: "sales.csv".to_string(),
            fingerprint: "abc",
            load_report: &report,
            snapshot: &snapshot,
        };

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["store"], "DeJa Vu Stores");
        assert_eq!(value["monthly_revenue"][0]["value"], 20.0);
        assert_eq!(value["monthly_revenue"][0]["period"]["month"], 1);
        assert_eq!(value["country_ranking"][0]["country"], "UK");
        assert_eq!(value["top_countries"].as_array().unwrap().len(), 1);
        assert_eq!(value["new_vs_existing_revenue"][1]["user_type"], "Existing");
    }
}
