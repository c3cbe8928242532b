mod amount;
mod categorizer;
mod cli;
mod collection;
mod error;
mod export;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod notify;
mod pipeline;
mod reports;
mod settings;
mod splitter;
mod tax;
mod toteat;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;

use cli::{Cli, Commands, RulesCommands};

fn init_logging() {
    let level = settings::load_settings()
        .log_level
        .trim()
        .parse::<Level>()
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            location,
            force,
        } => cli::init::run(data_dir, location, force),
        Commands::Report {
            file,
            source,
            date,
            location,
            rules,
            format,
            output,
        } => cli::report::run(&file, source.as_deref(), date, location, rules, format, output),
        Commands::Fetch {
            date,
            output,
            notify,
            format,
        } => cli::fetch::run(date, output, notify, format),
        Commands::Collection {
            file,
            date,
            csv,
            json,
        } => cli::collection::run(file, date, csv, json),
        Commands::Rules { command } => match command {
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Test { name } => cli::rules::test(&name),
        },
        Commands::Check => cli::check::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
