pub mod cli;
pub mod core;

use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::core::session::{LoadedDataset, Session};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Dashboard views reachable from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// KPI snapshot; `top` overrides the configured number of countries.
    Snapshot { json: bool, top: Option<usize> },
    /// Data preview, optionally with shape and descriptive statistics.
    Analysis { rows: Option<usize>, shape: bool },
    About,
}

pub fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    source: Option<&Path>,
) -> Result<()> {
    info!("DeJa Vu dashboard starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    if command == AppCommand::About {
        cli::about::run(&config.store_name);
        return Ok(());
    }

    let store_name = config.store_name.clone();
    let (top_countries, preview_rows) = (config.top_countries, config.preview_rows);
    let mut session = Session::new(config);
    let dataset = load_with_spinner(&mut session, source)?;

    match command {
        AppCommand::Snapshot { json, top } => cli::snapshot::run(
            &store_name,
            dataset,
            top.unwrap_or(top_countries),
            preview_rows,
            json,
        ),
        AppCommand::Analysis { rows, shape } => {
            cli::analysis::run(dataset, rows.unwrap_or(preview_rows), shape)
        }
        AppCommand::About => unreachable!("About is handled before loading"),
    }
}

fn load_with_spinner<'a>(
    session: &'a mut Session,
    source: Option<&Path>,
) -> Result<&'a LoadedDataset> {
    let pb = ui::new_row_spinner("Loading dataset");
    let loaded = session.load(source, &|| pb.inc(1));
    pb.finish_and_clear();

    let dataset = loaded.context("Failed to load dataset")?;
    let skipped = &dataset.report().skipped;
    if !skipped.is_empty() {
        eprintln!(
            "{}",
            ui::style_text(
                &format!(
                    "Skipped {} malformed row(s) out of {}; run with --verbose for details",
                    ui::group_thousands(skipped.len()),
                    ui::group_thousands(dataset.report().rows_read as usize)
                ),
                ui::StyleType::Error
            )
        );
    }
    Ok(dataset)
}
