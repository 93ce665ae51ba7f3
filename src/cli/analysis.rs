use super::ui;
use crate::core::Record;
use crate::core::profile::{self, ColumnStats};
use crate::core::session::LoadedDataset;
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

/// Table of the first records, with their derived fields.
pub fn preview_table(rows: &[Record]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(
        [
            "InvoiceNo",
            "StockCode",
            "Description",
            "Quantity",
            "InvoiceDate",
            "UnitPrice",
            "CustomerID",
            "Country",
            "Revenue",
            "Month",
            "Year",
        ]
        .map(ui::header_cell),
    );

    for record in rows {
        table.add_row(vec![
            Cell::new(record.invoice_no().unwrap_or("")),
            Cell::new(record.stock_code()),
            Cell::new(record.description()),
            ui::number_cell(record.quantity().to_string()),
            Cell::new(record.invoice_date().format("%Y-%m-%d %H:%M").to_string()),
            ui::number_cell(format!("{:.2}", record.unit_price())),
            ui::format_optional_cell(record.customer_id(), str::to_string),
            Cell::new(record.country()),
            ui::number_cell(format!("{:.2}", record.revenue())),
            ui::number_cell(record.invoice_month().to_string()),
            ui::number_cell(record.invoice_year().to_string()),
        ]);
    }
    table
}

/// Pandas-style `describe()` layout: one row per statistic, one column per
/// numeric field.
pub fn describe_table(stats: &[ColumnStats]) -> Table {
    let mut table = ui::new_styled_table();
    let mut header = vec![ui::header_cell("")];
    header.extend(stats.iter().map(|s| ui::header_cell(s.column)));
    table.set_header(header);

    let rows: [(&str, fn(&ColumnStats) -> Option<f64>); 8] = [
        ("count", |s: &ColumnStats| Some(s.count as f64)),
        ("mean", |s: &ColumnStats| Some(s.mean)),
        ("std", |s: &ColumnStats| s.std),
        ("min", |s: &ColumnStats| Some(s.min)),
        ("25%", |s: &ColumnStats| Some(s.p25)),
        ("50%", |s: &ColumnStats| Some(s.median)),
        ("75%", |s: &ColumnStats| Some(s.p75)),
        ("max", |s: &ColumnStats| Some(s.max)),
    ];
    for (label, value) in rows {
        let mut cells = vec![Cell::new(label)];
        cells.extend(
            stats
                .iter()
                .map(|s| ui::format_optional_cell(value(s), |v| format!("{v:.2}"))),
        );
        table.add_row(cells);
    }
    table
}

pub fn run(dataset: &LoadedDataset, preview_rows: usize, show_shape: bool) -> Result<()> {
    let records = dataset.records();

    ui::print_section("Display Data");
    println!("{}", preview_table(profile::head(records, preview_rows)));

    if show_shape {
        let shape = profile::shape(records);
        ui::print_section("Data Shape");
        println!(
            "{} {}; {} {}",
            ui::style_text(&ui::group_thousands(shape.rows), ui::StyleType::TotalValue),
            ui::style_text("rows", ui::StyleType::TotalLabel),
            ui::style_text(&ui::group_thousands(shape.columns), ui::StyleType::TotalValue),
            ui::style_text("columns", ui::StyleType::TotalLabel)
        );

        let stats = profile::describe(records).context("Failed to describe dataset")?;
        ui::print_section("Descriptive Statistics");
        println!("{}", describe_table(&stats));
    }

    Ok(())
}
