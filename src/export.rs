use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::fmt::{day_first, slug};
use crate::models::Report;

/// Prefix that makes spreadsheet tools read the file as UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const ITEM_COLUMNS: [&str; 7] = [
    "Menu item name",
    "Menu item code",
    "Menu item list price",
    "Quantity sold",
    "Sales total excl. tax",
    "Sales total incl. tax",
    "Category",
];

/// Fixed report layout: summary rows, a blank row, the column header, then
/// one row per product in report order. An empty row stands for the blank line.
pub fn layout_rows(report: &Report) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["Location name".to_string(), report.location_label.clone()],
        vec!["Begin date".to_string(), day_first(report.period_start)],
        vec!["End date".to_string(), day_first(report.period_end)],
        vec![
            "Total revenue excl. tax".to_string(),
            report.total_excl_tax.to_string(),
        ],
        vec![
            "Total revenue incl. tax".to_string(),
            report.total_incl_tax.to_string(),
        ],
        Vec::new(),
        ITEM_COLUMNS.iter().map(|c| c.to_string()).collect(),
    ];

    for item in &report.items {
        rows.push(vec![
            item.name.clone(),
            item.code.clone(),
            item.unit_price.to_string(),
            item.quantity.to_string(),
            item.amount_excl_tax.to_string(),
            item.amount_incl_tax.to_string(),
            item.category.clone(),
        ]);
    }
    rows
}

/// BOM-prefixed CSV of rows of any width. Empty rows become blank lines.
pub(crate) fn delimited(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut out = UTF8_BOM.to_vec();
    for (i, block) in rows.split(|row| row.is_empty()).enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(&mut out);
        for row in block {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    Ok(out)
}

pub fn to_delimited(report: &Report) -> Result<Vec<u8>> {
    delimited(&layout_rows(report))
}

/// `<data_dir>/exports/ventas_<location>_<YYYY-MM-DD>.csv`
pub fn default_export_path(data_dir: &Path, location_label: &str, date: NaiveDate) -> PathBuf {
    let name = format!("ventas_{}_{}.csv", slug(location_label), date.format("%Y-%m-%d"));
    data_dir.join("exports").join(name)
}

pub fn write_export(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
