use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::fmt::{day_first, money};
use crate::pipeline::ReportRun;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub product_count: usize,
    pub order_count: usize,
    pub total_incl_tax: i64,
}

impl SalesSummary {
    pub fn from_run(run: &ReportRun) -> Self {
        Self {
            product_count: run.report.items.len(),
            order_count: run.order_count,
            total_incl_tax: run.report.total_incl_tax,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesReportEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachment: Attachment,
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl SalesReportEmail {
    pub fn compose(
        settings: &Settings,
        date: NaiveDate,
        summary: &SalesSummary,
        attachment: Attachment,
    ) -> Self {
        let day = day_first(date);
        let location = escape_html(&settings.location_name);
        let html = format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\n\
             <h2>Sales report - {location}</h2>\n\
             <p>Attached is the sales report for <strong>{day}</strong>.</p>\n\
             <ul>\n\
             <li><strong>Products sold:</strong> {products}</li>\n\
             <li><strong>Orders processed:</strong> {orders}</li>\n\
             <li><strong>Total incl. tax:</strong> {total}</li>\n\
             </ul>\n\
             <p style=\"color: #666; font-size: 12px;\">Attachment: {file}</p>\n\
             </div>\n",
            products = summary.product_count,
            orders = summary.order_count,
            total = money(summary.total_incl_tax),
            file = escape_html(&attachment.file_name),
        );
        Self {
            from: settings.email.from.clone(),
            to: settings.email.to.trim().to_string(),
            subject: format!("{} - {day}", settings.email.subject_prefix),
            html,
            attachment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    Delivered { location: String },
    Skipped { reason: String },
}

/// Hands a composed report email to some transport.
pub trait Notifier {
    fn send(&self, email: &SalesReportEmail) -> Result<NotifyOutcome>;
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Writes each message as a `.json` envelope plus its attachment into a
/// directory that an external mail relay picks up.
pub struct OutboxNotifier {
    dir: PathBuf,
}

#[derive(Serialize)]
struct Envelope<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    attachment: &'a str,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("outbox"))
    }
}

impl Notifier for OutboxNotifier {
    fn send(&self, email: &SalesReportEmail) -> Result<NotifyOutcome> {
        if email.to.is_empty() {
            warn!("no recipient configured, email not queued");
            return Ok(NotifyOutcome::Skipped {
                reason: "No recipient configured (EMAIL_TO)".to_string(),
            });
        }

        std::fs::create_dir_all(&self.dir)?;
        let attachment_path = self.dir.join(&email.attachment.file_name);
        std::fs::write(&attachment_path, &email.attachment.bytes)?;

        let stem = Path::new(&email.attachment.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "message".to_string());
        let envelope_path = self.dir.join(format!("{stem}.json"));
        let envelope = Envelope {
            from: &email.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            attachment: &email.attachment.file_name,
        };
        std::fs::write(&envelope_path, serde_json::to_string_pretty(&envelope)?)?;

        info!(to = %email.to, path = %envelope_path.display(), "email queued");
        Ok(NotifyOutcome::Delivered {
            location: envelope_path.display().to_string(),
        })
    }
}
