use std::collections::HashMap;

use crate::models::{CategoryTotal, LineItem, Report, ReportContext};

// ---------------------------------------------------------------------------
// Product rollup
// ---------------------------------------------------------------------------

/// Groups by exact name. Sums quantity and both amounts; code, unit price and
/// category come from the first item seen. Highest quantity first, ties in
/// first-seen order.
pub fn rollup_products(items: &[LineItem]) -> Vec<LineItem> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<LineItem> = Vec::new();

    for item in items {
        match index.get(item.name.as_str()) {
            Some(&i) => {
                let group = &mut groups[i];
                group.quantity += item.quantity;
                group.amount_excl_tax += item.amount_excl_tax;
                group.amount_incl_tax += item.amount_incl_tax;
            }
            None => {
                index.insert(item.name.as_str(), groups.len());
                groups.push(item.clone());
            }
        }
    }

    groups.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    groups
}

// ---------------------------------------------------------------------------
// Category rollup
// ---------------------------------------------------------------------------

/// Quantity and tax-inclusive amount per category, largest amount first.
pub fn rollup_categories(items: &[LineItem]) -> Vec<CategoryTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for item in items {
        match index.get(item.category.as_str()) {
            Some(&i) => {
                totals[i].quantity_sum += item.quantity;
                totals[i].amount_sum += item.amount_incl_tax;
            }
            None => {
                index.insert(item.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: item.category.clone(),
                    quantity_sum: item.quantity,
                    amount_sum: item.amount_incl_tax,
                });
            }
        }
    }

    totals.sort_by(|a, b| b.amount_sum.cmp(&a.amount_sum));
    totals
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

pub fn aggregate(items: &[LineItem], ctx: &ReportContext) -> Report {
    // Totals come from the ungrouped items so they do not depend on grouping.
    let total_excl_tax: i64 = items.iter().map(|i| i.amount_excl_tax).sum();
    let total_incl_tax: i64 = items.iter().map(|i| i.amount_incl_tax).sum();

    Report {
        location_label: ctx.location_label.clone(),
        period_start: ctx.period_start,
        period_end: ctx.period_end,
        total_excl_tax,
        total_incl_tax,
        items: rollup_products(items),
        by_category: rollup_categories(items),
    }
}

/// Share of `part` in `total` as a percentage; 0 when there is no total.
pub fn share_pct(part: i64, total: i64) -> f64 {
    if total != 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(name: &str, qty: u64, excl: i64, incl: i64, category: &str) -> LineItem {
        LineItem {
            name: name.to_string(),
            code: format!("C-{name}"),
            quantity: qty,
            unit_price: if qty > 0 { excl / qty as i64 } else { 0 },
            amount_excl_tax: excl,
            amount_incl_tax: incl,
            category: category.to_string(),
        }
    }

    fn ctx() -> ReportContext {
        ReportContext::single_day("Domani Providencia", NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
    }

    #[test]
    fn test_grand_total_ignores_grouping() {
        let items = vec![
            item("A", 1, 84, 100, "X"),
            item("A", 1, 42, 50, "X"),
            item("B", 1, 25, 30, "Y"),
        ];
        let report = aggregate(&items, &ctx());
        assert_eq!(report.total_incl_tax, 180);
        assert_eq!(report.total_excl_tax, 151);
        assert_eq!(report.items.len(), 2);
        let a = report.items.iter().find(|i| i.name == "A").unwrap();
        assert_eq!(a.quantity, 2);
        assert_eq!(a.amount_incl_tax, 150);
        let b = report.items.iter().find(|i| i.name == "B").unwrap();
        assert_eq!(b.amount_incl_tax, 30);
        let grouped: i64 = report.items.iter().map(|i| i.amount_incl_tax).sum();
        assert_eq!(grouped, report.total_incl_tax);
    }

    #[test]
    fn test_names_group_exactly() {
        let items = vec![
            item("Margherita", 1, 10, 12, "PIZZAS"),
            item("margherita", 1, 10, 12, "PIZZAS"),
            item("Margherita ", 1, 10, 12, "PIZZAS"),
        ];
        assert_eq!(rollup_products(&items).len(), 3);
    }

    #[test]
    fn test_first_seen_fields_kept() {
        let mut second = item("A", 5, 500, 595, "OTHER");
        second.code = "later".to_string();
        second.unit_price = 999;
        let items = vec![item("A", 1, 100, 119, "FIRST"), second];
        let rolled = rollup_products(&items);
        assert_eq!(rolled[0].code, "C-A");
        assert_eq!(rolled[0].unit_price, 100);
        assert_eq!(rolled[0].category, "FIRST");
        assert_eq!(rolled[0].quantity, 6);
    }

    #[test]
    fn test_products_sorted_by_quantity_stable() {
        let items = vec![
            item("low", 1, 1, 1, "X"),
            item("tie1", 3, 1, 1, "X"),
            item("high", 9, 1, 1, "X"),
            item("tie2", 3, 1, 1, "X"),
        ];
        let names: Vec<_> = rollup_products(&items).into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["high", "tie1", "tie2", "low"]);
    }

    #[test]
    fn test_categories_sorted_by_amount_stable() {
        let items = vec![
            item("a", 1, 0, 100, "BEBIDAS"),
            item("b", 2, 0, 500, "PIZZAS"),
            item("c", 1, 0, 100, "POSTRES"),
            item("d", 4, 0, 50, "BEBIDAS"),
        ];
        let cats = rollup_categories(&items);
        let order: Vec<_> = cats.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(order, vec!["PIZZAS", "BEBIDAS", "POSTRES"]);
        assert_eq!(cats[1].quantity_sum, 5);
        assert_eq!(cats[1].amount_sum, 150);
    }

    #[test]
    fn test_empty_input() {
        let report = aggregate(&[], &ctx());
        assert_eq!(report.total_excl_tax, 0);
        assert_eq!(report.total_incl_tax, 0);
        assert!(report.items.is_empty());
        assert!(report.by_category.is_empty());
        assert_eq!(report.location_label, "Domani Providencia");
    }

    #[test]
    fn test_share_pct() {
        assert_eq!(share_pct(25, 100), 25.0);
        assert_eq!(share_pct(5, 0), 0.0);
    }
}
