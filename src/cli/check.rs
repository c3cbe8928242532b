use colored::Colorize;

use crate::error::Result;
use crate::settings::{load_settings, settings_file_exists, settings_path};
use crate::toteat::ToteatClient;

pub fn run() -> Result<()> {
    let settings = load_settings();

    let file_state = if settings_file_exists() { "found" } else { "not found, using defaults" };
    println!("Settings: {} ({file_state})", settings_path().display());
    println!("Location: {}", settings.location_name);
    println!("Data directory: {}", settings.data_dir);
    println!("Tax rate: {}%", settings.pricing.tax_rate_percent);
    println!("Category rules: {}", settings.category_rules.len());
    if settings.email.to.trim().is_empty() {
        println!("Email: {}", "no recipient (EMAIL_TO)".yellow());
    } else {
        println!("Email: {} \u{2192} {}", settings.email.from, settings.email.to);
    }

    let status = ToteatClient::new(&settings.toteat)?.check_connection();
    let state = if status.connected {
        "connected".green().bold()
    } else {
        "not connected".red().bold()
    };
    println!("Toteat ({}): {state}", status.mode);
    println!("  {}", status.message);
    Ok(())
}
