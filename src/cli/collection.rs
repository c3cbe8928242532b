use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::collection::{summarize, summarize_csv, to_csv, CsvCollectionSummary};
use crate::error::{PosError, Result};
use crate::export::write_export;
use crate::fmt::{day_first, money};
use crate::importer::parse_json_payload;
use crate::settings::load_settings;
use crate::toteat::{FetchOutcome, ToteatClient};

use super::parse_date_opt;

pub fn run(file: Option<String>, date: Option<String>, csv: Option<String>, json: bool) -> Result<()> {
    let settings = load_settings();
    let day = parse_date_opt(&date)?;

    if let Some(path) = file.as_deref().filter(|p| is_csv(p)) {
        if csv.is_some() {
            return Err(PosError::Other(
                "--csv needs a collection payload, not an uploaded CSV".to_string(),
            ));
        }
        let summary = summarize_csv(&std::fs::read_to_string(path)?, settings.pricing.amount_locale)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_csv_summary(&summary);
        }
        return Ok(());
    }

    let payload = match file {
        Some(path) => parse_json_payload(&std::fs::read_to_string(&path)?)?,
        None => match ToteatClient::new(&settings.toteat)?.fetch_collection(day) {
            FetchOutcome::Fetched { payload, .. } => payload,
            FetchOutcome::Failed { message } => return Err(PosError::Upstream(message)),
        },
    };

    let summary = summarize(&payload, day, settings.pricing.amount_locale);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} {}: {} shifts, {} registers, total {}",
            "Collection".bold(),
            day_first(day),
            summary.total_shifts,
            summary.total_registers,
            money(summary.total_amount).green()
        );
        let mut table = Table::new();
        table.set_header(vec!["Payment method", "Amount", "%"]);
        for pm in &summary.payment_methods {
            table.add_row(vec![
                Cell::new(&pm.method),
                Cell::new(money(pm.amount)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}%", pm.percentage)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }

    if let Some(path) = csv {
        write_export(&to_csv(&summary)?, Path::new(&path))?;
        eprintln!("Wrote {path}");
    }
    Ok(())
}

fn is_csv(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn print_csv_summary(summary: &CsvCollectionSummary) {
    println!(
        "{}: {} records, total {}",
        "Collection CSV".bold(),
        summary.total_records,
        money(summary.grand_total).green()
    );

    let mut methods = Table::new();
    methods.set_header(vec!["Payment method", "Amount", "%"]);
    for m in &summary.by_payment_method {
        methods.add_row(vec![
            Cell::new(&m.method),
            Cell::new(money(m.total)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}%", m.percentage)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{methods}");

    for (heading, groups) in [("Shift", &summary.by_shift), ("Register", &summary.by_register)] {
        let mut table = Table::new();
        table.set_header(vec![heading, "Amount"]);
        for g in groups {
            table.add_row(vec![
                Cell::new(&g.label),
                Cell::new(money(g.total)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
}
