use std::path::Path;

use serde_json::Value;

use crate::amount::{parse_amount_str, parse_quantity_str, AmountLocale};
use crate::error::{PosError, Result};
use crate::models::RawItem;
use crate::normalizer::decode_escapes;
use crate::splitter::split_line;

// ---------------------------------------------------------------------------
// Source kinds, dispatched by enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    /// Sales export uploaded by hand: `ID, Producto, Cantidad, Valor Venta, ...`
    SalesCsv,
    /// Raw vendor API payload saved as JSON.
    JsonPayload,
}

impl SourceKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::SalesCsv => "sales_csv",
            Self::JsonPayload => "json",
        }
    }

    pub fn detect(file_path: &Path, content: &str) -> Self {
        let by_extension = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match by_extension.as_deref() {
            Some("csv") | Some("txt") => Self::SalesCsv,
            Some("json") => Self::JsonPayload,
            _ => {
                let start = content.trim_start_matches('\u{feff}').trim_start();
                if start.starts_with('{') || start.starts_with('[') {
                    Self::JsonPayload
                } else {
                    Self::SalesCsv
                }
            }
        }
    }
}

pub fn get_by_key(key: &str) -> Option<SourceKind> {
    [SourceKind::SalesCsv, SourceKind::JsonPayload]
        .into_iter()
        .find(|k| k.key() == key)
}

/// File content and how to read it.
pub struct LoadedSource {
    pub kind: SourceKind,
    pub content: String,
}

pub fn load_source(file_path: &Path, format_key: Option<&str>) -> Result<LoadedSource> {
    let content = std::fs::read_to_string(file_path)?;
    let kind = match format_key {
        Some(key) => get_by_key(key).ok_or_else(|| PosError::UnknownFormat(key.to_string()))?,
        None => SourceKind::detect(file_path, &content),
    };
    Ok(LoadedSource { kind, content })
}

pub fn parse_json_payload(content: &str) -> Result<Value> {
    Ok(serde_json::from_str(content.trim_start_matches('\u{feff}'))?)
}

// ---------------------------------------------------------------------------
// Sales CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Columns {
    code: Option<usize>,
    name: Option<usize>,
    quantity: Option<usize>,
    net_sales: Option<usize>,
}

fn position(headers: &[String], pred: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(|h| pred(h.as_str()))
}

fn detect_columns(headers: &[String]) -> Columns {
    Columns {
        code: position(headers, |h| {
            h == "id" || h.contains("codigo") || h.contains("código") || h.contains("code")
        }),
        name: position(headers, |h| {
            h.contains("producto") || h.contains("product") || h.contains("nombre")
        }),
        quantity: position(headers, |h| {
            h.contains("cantidad") || h.contains("quantity") || h.contains("qty")
        }),
        net_sales: position(headers, |h| {
            h.contains("valor venta") || h.contains("venta") || h.contains("sales") || h.contains("total")
        }),
    }
}

pub struct ParsedCsv {
    pub items: Vec<RawItem>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Parses a sales export. Amounts are tax-exclusive with no tax column, so
/// items leave tax to the default rate.
pub fn parse_sales_csv(content: &str, locale: AmountLocale) -> Result<ParsedCsv> {
    let content = content.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = content.split('\n').filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(PosError::UnknownFormat(
            "CSV is empty or has no data rows".to_string(),
        ));
    }

    let headers: Vec<String> = split_line(lines[0]).iter().map(|h| h.to_lowercase()).collect();
    let cols = detect_columns(&headers);

    let mut items = Vec::new();
    let mut rows_skipped = 0usize;
    for line in &lines[1..] {
        let values = split_line(line);
        if values.len() < 4 {
            rows_skipped += 1;
            continue;
        }
        let get = |idx: Option<usize>| idx.and_then(|i| values.get(i)).map(String::as_str).unwrap_or("");

        items.push(RawItem {
            name: decode_escapes(get(cols.name)).trim().to_string(),
            code: get(cols.code).to_string(),
            quantity: parse_quantity_str(get(cols.quantity)),
            net_amount: Some(parse_amount_str(get(cols.net_sales), locale)),
            tax_amount: None,
            gross_amount: None,
            category: String::new(),
        });
    }

    Ok(ParsedCsv {
        rows_read: lines.len() - 1,
        rows_skipped,
        items,
    })
}
