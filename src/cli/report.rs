use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::error::Result;
use crate::export::{to_delimited, write_export};
use crate::fmt::{day_first, money};
use crate::importer::{load_source, parse_json_payload, SourceKind};
use crate::models::ReportContext;
use crate::pipeline::{build_from_csv, build_from_payload, PipelineConfig, ReportRun};
use crate::reports::share_pct;
use crate::settings::{load_rules_file, load_settings};

use super::{parse_date_opt, OutputFormat};

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn print_table(run: &ReportRun) {
    let report = &run.report;
    let period = if report.period_start == report.period_end {
        day_first(report.period_start)
    } else {
        format!("{} - {}", day_first(report.period_start), day_first(report.period_end))
    };
    println!(
        "{} {} ({})",
        report.location_label.bold(),
        period,
        run.source.dimmed()
    );

    let mut table = Table::new();
    table.set_header(vec!["Item", "Code", "Unit price", "Qty", "Excl. tax", "Incl. tax", "Category"]);
    for item in &report.items {
        table.add_row(vec![
            Cell::new(&item.name),
            Cell::new(&item.code),
            right(money(item.unit_price)),
            right(item.quantity.to_string()),
            right(money(item.amount_excl_tax)),
            right(money(item.amount_incl_tax)),
            Cell::new(&item.category),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL".green().bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        right(money(report.total_excl_tax)),
        right(money(report.total_incl_tax)),
        Cell::new(""),
    ]);
    println!("Products\n{table}");

    let mut cats = Table::new();
    cats.set_header(vec!["Category", "Qty", "Incl. tax", "%"]);
    for cat in &report.by_category {
        cats.add_row(vec![
            Cell::new(&cat.category),
            right(cat.quantity_sum.to_string()),
            right(money(cat.amount_sum)),
            right(format!("{:.1}%", share_pct(cat.amount_sum, report.total_incl_tax))),
        ]);
    }
    println!("Categories\n{cats}");
    println!("{} orders, {} products", run.order_count, report.items.len());
}

pub fn print_run(run: &ReportRun, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(run),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&run.report)?),
        OutputFormat::Csv => {
            let bytes = to_delimited(&run.report)?;
            print!("{}", String::from_utf8_lossy(&bytes[crate::export::UTF8_BOM.len()..]));
        }
    }
    Ok(())
}

pub fn save_export(run: &ReportRun, path: &Path) -> Result<()> {
    write_export(&to_delimited(&run.report)?, path)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

pub fn run(
    file: &str,
    source: Option<&str>,
    date: Option<String>,
    location: Option<String>,
    rules: Option<String>,
    format: OutputFormat,
    output: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();
    if let Some(path) = rules {
        settings.category_rules = load_rules_file(&path)?;
    }
    let config = PipelineConfig::from_settings(&settings);
    let day = parse_date_opt(&date)?;
    let label = location.unwrap_or_else(|| settings.location_name.clone());
    let ctx = ReportContext::single_day(&label, day);

    let loaded = load_source(Path::new(file), source)?;
    let run = match loaded.kind {
        SourceKind::SalesCsv => build_from_csv(&loaded.content, &ctx, &config)?,
        SourceKind::JsonPayload => {
            let payload = parse_json_payload(&loaded.content)?;
            build_from_payload(&payload, &ctx, &config)
        }
    };

    print_run(&run, format)?;
    if let Some(out) = output {
        save_export(&run, &PathBuf::from(out))?;
    }
    Ok(())
}
