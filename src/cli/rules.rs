use comfy_table::{Cell, Table};

use crate::categorizer::Categorizer;
use crate::error::Result;
use crate::settings::load_settings;

fn categorizer() -> Categorizer {
    let settings = load_settings();
    Categorizer::new(settings.category_rules, &settings.pricing.default_category)
}

pub fn list() -> Result<()> {
    let categorizer = categorizer();
    let mut table = Table::new();
    table.set_header(vec!["#", "Category", "Keywords"]);
    for (i, rule) in categorizer.rules().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&rule.category),
            Cell::new(rule.keywords.join(", ")),
        ]);
    }
    println!("Rules (first match wins)\n{table}");
    println!("No match: {}", categorizer.default_category());
    Ok(())
}

pub fn test(name: &str) -> Result<()> {
    let categorizer = categorizer();
    let category = categorizer.categorize(name);
    match categorizer.matching_rule(name) {
        Some(i) => println!("'{name}' \u{2192} {category} (rule {})", i + 1),
        None => println!("'{name}' \u{2192} {category} (default)"),
    }
    Ok(())
}
