use std::path::PathBuf;

use crate::error::Result;
use crate::export::{default_export_path, to_delimited, write_export};
use crate::models::ReportContext;
use crate::notify::{Attachment, Notifier, NotifyOutcome, OutboxNotifier, SalesReportEmail, SalesSummary};
use crate::pipeline::{build_from_fetch, PipelineConfig};
use crate::settings::load_settings;
use crate::toteat::ToteatClient;

use super::report::print_run;
use super::{parse_date_opt, OutputFormat};

pub fn run(date: Option<String>, output: Option<String>, notify: bool, format: OutputFormat) -> Result<()> {
    let settings = load_settings();
    let day = parse_date_opt(&date)?;
    let ctx = ReportContext::single_day(&settings.location_name, day);
    let config = PipelineConfig::from_settings(&settings);

    let client = ToteatClient::new(&settings.toteat)?;
    let run = build_from_fetch(client.fetch_collection(day), &ctx, &config)?;
    print_run(&run, format)?;

    let data_dir = PathBuf::from(&settings.data_dir);
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_export_path(&data_dir, &settings.location_name, day));
    let bytes = to_delimited(&run.report)?;
    write_export(&bytes, &path)?;
    eprintln!("Wrote {}", path.display());

    if notify {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "ventas.csv".to_string());
        let email = SalesReportEmail::compose(
            &settings,
            day,
            &SalesSummary::from_run(&run),
            Attachment { file_name, bytes },
        );
        match OutboxNotifier::for_data_dir(&data_dir).send(&email)? {
            NotifyOutcome::Delivered { location } => eprintln!("Email queued: {location}"),
            NotifyOutcome::Skipped { reason } => eprintln!("Email skipped: {reason}"),
        }
    }
    Ok(())
}
