use chrono::NaiveDate;
use serde::Serialize;

/// One line-item candidate as pulled out of a source payload, before tax
/// splitting and categorization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawItem {
    pub name: String,
    pub code: String,
    pub quantity: u64,
    /// Amount as found in the source. Tax-exclusive unless a tax figure says otherwise.
    pub net_amount: Option<f64>,
    pub tax_amount: Option<f64>,
    pub gross_amount: Option<f64>,
    /// Category supplied by the source; empty when the source has none.
    pub category: String,
}

/// Canonical output unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub code: String,
    pub quantity: u64,
    pub unit_price: i64,
    pub amount_excl_tax: i64,
    pub amount_incl_tax: i64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub quantity_sum: u64,
    pub amount_sum: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub location_label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_excl_tax: i64,
    pub total_incl_tax: i64,
    pub items: Vec<LineItem>,
    pub by_category: Vec<CategoryTotal>,
}

/// Caller-supplied labels for a report.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub location_label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl ReportContext {
    pub fn single_day(location_label: &str, date: NaiveDate) -> Self {
        Self {
            location_label: location_label.to_string(),
            period_start: date,
            period_end: date,
        }
    }
}
