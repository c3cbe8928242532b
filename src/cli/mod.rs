pub mod check;
pub mod collection;
pub mod fetch;
pub mod init;
pub mod report;
pub mod rules;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::error::{PosError, Result};

/// `--date YYYY-MM-DD`, defaulting to yesterday (the last closed business day).
pub(crate) fn parse_date_opt(date: &Option<String>) -> Result<NaiveDate> {
    match date {
        Some(d) => NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
            .map_err(|_| PosError::Other(format!("Invalid date '{d}', expected YYYY-MM-DD"))),
        None => Ok(chrono::Local::now().date_naive() - chrono::Duration::days(1)),
    }
}

#[derive(Parser)]
#[command(
    name = "posreport",
    version,
    about = "Daily sales reports from point-of-sale exports and the Toteat API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a settings file with every default filled in, ready to edit.
    Init {
        /// Where exports and the outbox live (default: ~/Documents/posreport)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Location name printed on reports
        #[arg(long)]
        location: Option<String>,
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Build a report from a sales CSV export or a saved JSON payload.
    Report {
        /// Path to a .csv export or a .json API payload
        file: String,
        /// Source format key (sales_csv, json); detected when omitted
        #[arg(long)]
        source: Option<String>,
        /// Report date: YYYY-MM-DD (default: yesterday)
        #[arg(long)]
        date: Option<String>,
        /// Location label (default: from settings)
        #[arg(long)]
        location: Option<String>,
        /// Category rules JSON file replacing the configured rules
        #[arg(long)]
        rules: Option<String>,
        /// How to print the report
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Also write the spreadsheet export to this path
        #[arg(long)]
        output: Option<String>,
    },
    /// Fetch a day of data from the Toteat API and export the sales report.
    Fetch {
        /// Report date: YYYY-MM-DD (default: yesterday)
        #[arg(long)]
        date: Option<String>,
        /// Export path (default: <data_dir>/exports/ventas_<location>_<date>.csv)
        #[arg(long)]
        output: Option<String>,
        /// Queue the report email in the outbox
        #[arg(long)]
        notify: bool,
        /// How to print the report
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Payment-method breakdown of a day's till collection.
    Collection {
        /// Saved collection payload, or an uploaded collection `.csv`;
        /// fetched from the API when omitted
        file: Option<String>,
        /// Collection date: YYYY-MM-DD (default: yesterday)
        #[arg(long)]
        date: Option<String>,
        /// Write the per-payment CSV to this path
        #[arg(long)]
        csv: Option<String>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect the category rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Show configuration and test the Toteat connection.
    Check,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List category rules in evaluation order.
    List,
    /// Show which category an item name gets.
    Test {
        /// Menu item name, e.g. 'Pizza Margherita'
        name: String,
    },
}
