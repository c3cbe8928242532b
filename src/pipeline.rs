use serde_json::Value;
use tracing::{info, warn};

use crate::amount::AmountLocale;
use crate::categorizer::Categorizer;
use crate::error::{PosError, Result};
use crate::importer::parse_sales_csv;
use crate::models::{LineItem, RawItem, Report, ReportContext};
use crate::normalizer::normalize;
use crate::reports::aggregate;
use crate::settings::Settings;
use crate::tax::{split_tax, TaxInput};
use crate::toteat::FetchOutcome;

/// Static configuration of the report pipeline, built once at the composition root.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub tax_rate_percent: f64,
    pub locale: AmountLocale,
    pub categorizer: Categorizer,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tax_rate_percent: settings.pricing.tax_rate_percent,
            locale: settings.pricing.amount_locale,
            categorizer: Categorizer::new(
                settings.category_rules.clone(),
                &settings.pricing.default_category,
            ),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// A built report plus what it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRun {
    pub report: Report,
    /// Orders, registers or rows the items came from.
    pub order_count: usize,
    /// Extraction strategy or importer that produced the items.
    pub source: &'static str,
}

/// Tax split and categorization of one candidate.
pub fn finish_item(raw: &RawItem, config: &PipelineConfig) -> LineItem {
    let split = split_tax(
        TaxInput {
            net: raw.net_amount,
            tax: raw.tax_amount,
            gross: raw.gross_amount,
        },
        config.tax_rate_percent,
    );
    let category = if raw.category.trim().is_empty() {
        config.categorizer.categorize(&raw.name).to_string()
    } else {
        raw.category.clone()
    };
    let unit_price = if raw.quantity > 0 {
        (split.excl_tax as f64 / raw.quantity as f64).round() as i64
    } else {
        0
    };
    LineItem {
        name: raw.name.clone(),
        code: raw.code.clone(),
        quantity: raw.quantity,
        unit_price,
        amount_excl_tax: split.excl_tax,
        amount_incl_tax: split.incl_tax,
        category,
    }
}

pub fn finish_items(raw: &[RawItem], config: &PipelineConfig) -> Vec<LineItem> {
    raw.iter().map(|r| finish_item(r, config)).collect()
}

pub fn build_from_payload(payload: &Value, ctx: &ReportContext, config: &PipelineConfig) -> ReportRun {
    let normalized = normalize(payload, config.locale);
    let source = normalized.strategy.map(|s| s.key()).unwrap_or("none");
    if normalized.items.is_empty() {
        warn!("payload produced no line items; report will be empty");
    }
    let items = finish_items(&normalized.items, config);
    let report = aggregate(&items, ctx);
    info!(
        source,
        items = items.len(),
        products = report.items.len(),
        total_incl_tax = report.total_incl_tax,
        "report built"
    );
    ReportRun {
        report,
        order_count: normalized.record_count,
        source,
    }
}

pub fn build_from_csv(content: &str, ctx: &ReportContext, config: &PipelineConfig) -> Result<ReportRun> {
    let parsed = parse_sales_csv(content, config.locale)?;
    if parsed.rows_skipped > 0 {
        warn!(skipped = parsed.rows_skipped, "short CSV rows skipped");
    }
    let items = finish_items(&parsed.items, config);
    let report = aggregate(&items, ctx);
    info!(
        rows = parsed.rows_read,
        products = report.items.len(),
        total_incl_tax = report.total_incl_tax,
        "report built from CSV"
    );
    Ok(ReportRun {
        report,
        order_count: parsed.items.len(),
        source: "sales_csv",
    })
}

/// Refuses failed fetches outright: nothing is normalized without data.
pub fn build_from_fetch(outcome: FetchOutcome, ctx: &ReportContext, config: &PipelineConfig) -> Result<ReportRun> {
    match outcome {
        FetchOutcome::Fetched { payload, .. } => Ok(build_from_payload(&payload, ctx, config)),
        FetchOutcome::Failed { message } => Err(PosError::Upstream(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ctx() -> ReportContext {
        ReportContext::single_day("Domani Providencia", NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
    }

    #[test]
    fn test_end_to_end_orders() {
        let payload = json!([
            {"name": "Margherita", "quantity": 2, "netAmount": 10000},
            {"name": "Coca Cola", "quantity": 1, "netAmount": 1500, "taxAmount": 0}
        ]);
        let run = build_from_payload(&payload, &ctx(), &PipelineConfig::default());
        let report = &run.report;

        let pizza = report.items.iter().find(|i| i.name == "Margherita").unwrap();
        assert_eq!(pizza.amount_excl_tax, 10000);
        assert_eq!(pizza.amount_incl_tax, 11900);
        assert_eq!(pizza.unit_price, 5000);
        assert_eq!(pizza.category, "PIZZAS");

        let coke = report.items.iter().find(|i| i.name == "Coca Cola").unwrap();
        assert_eq!(coke.amount_excl_tax, 1500);
        assert_eq!(coke.amount_incl_tax, 1500);
        assert_eq!(coke.category, "AGUAS JUGOS & BEBIDAS");

        assert_eq!(report.total_excl_tax, 11500);
        assert_eq!(report.total_incl_tax, 13400);
        assert_eq!(run.source, "orders");
        assert_eq!(run.order_count, 2);
    }

    #[test]
    fn test_pipeline_is_repeatable() {
        let payload = json!({"shifts": {"1": {"registers": {"7": [{"paymentMethods": [
            {"paymentMethodID": 1, "paymentMethod": "Efectivo", "amount": "1.234,"}
        ]}]}}}});
        let config = PipelineConfig::default();
        let first = build_from_payload(&payload, &ctx(), &config);
        let second = build_from_payload(&payload, &ctx(), &config);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.report).unwrap(),
            serde_json::to_string(&second.report).unwrap()
        );
    }

    #[test]
    fn test_source_category_kept() {
        let raw = RawItem {
            name: "Margherita".to_string(),
            quantity: 1,
            net_amount: Some(100.0),
            category: "ESPECIALES".to_string(),
            ..Default::default()
        };
        let item = finish_item(&raw, &PipelineConfig::default());
        assert_eq!(item.category, "ESPECIALES");
    }

    #[test]
    fn test_zero_quantity_has_no_unit_price() {
        let raw = RawItem {
            name: "Gelato".to_string(),
            quantity: 0,
            net_amount: Some(3000.0),
            ..Default::default()
        };
        let item = finish_item(&raw, &PipelineConfig::default());
        assert_eq!(item.unit_price, 0);
        assert_eq!(item.amount_incl_tax, 3570);
    }

    #[test]
    fn test_empty_payload_gives_empty_report() {
        let run = build_from_payload(&json!({}), &ctx(), &PipelineConfig::default());
        assert_eq!(run.report.total_incl_tax, 0);
        assert!(run.report.items.is_empty());
        assert_eq!(run.source, "none");
    }

    #[test]
    fn test_failed_fetch_is_not_processed() {
        let outcome = FetchOutcome::Failed {
            message: "Token without API permissions".to_string(),
        };
        let err = build_from_fetch(outcome, &ctx(), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PosError::Upstream(ref m) if m.contains("permissions")));
    }

    #[test]
    fn test_csv_pipeline() {
        let csv = "ID,Producto,Cantidad,Valor Venta\n1,Margherita,2,10000\n2,Margherita,1,5000\n";
        let run = build_from_csv(csv, &ctx(), &PipelineConfig::default()).unwrap();
        assert_eq!(run.report.items.len(), 1);
        assert_eq!(run.report.items[0].quantity, 3);
        assert_eq!(run.report.total_excl_tax, 15000);
        assert_eq!(run.report.total_incl_tax, 17850);
        assert_eq!(run.order_count, 2);
    }
}
