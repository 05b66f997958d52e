//! CLI commands for reports
//!
//! The firm dashboard and the monthly tax summary, on screen or as CSV.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Subcommand;

use crate::error::{TaxboxError, TaxboxResult};
use crate::models::TaxMonth;
use crate::reports::{FirmDashboardReport, TaxSummaryReport};
use crate::services::FirmService;

use super::context::{CliContext, Outcome};

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Health of every active client of a firm
    #[command(alias = "health")]
    Dashboard {
        /// Firm name or ID
        firm: String,

        /// Export to CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// VAT and WHT totals for one month of the selected organization
    #[command(alias = "tax-summary")]
    Tax {
        /// Month (e.g., "2025-01"), default this month
        #[arg(short, long)]
        month: Option<String>,

        /// Export to CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn csv_writer(output: &Path) -> TaxboxResult<BufWriter<File>> {
    let file = File::create(output).map_err(|e| {
        TaxboxError::Export(format!("Failed to create file {}: {}", output.display(), e))
    })?;
    Ok(BufWriter::new(file))
}

pub fn handle_report_command(ctx: &CliContext<'_>, cmd: ReportCommands) -> TaxboxResult<Outcome> {
    let actor = ctx.actor()?;
    let today = Local::now().date_naive();

    match cmd {
        ReportCommands::Dashboard { firm, output } => {
            let firm = FirmService::new(ctx.storage, actor).find_firm(&firm)?;
            let report = FirmDashboardReport::generate(ctx.storage, actor, firm.id, today)?;

            let text = match output {
                Some(path) => {
                    report.export_csv(csv_writer(&path)?)?;
                    format!("Dashboard exported to: {}\n", path.display())
                }
                None => report.format_terminal(),
            };
            Outcome::text(text).with_data(&report)
        }

        ReportCommands::Tax { month, output } => {
            let month = match month {
                Some(m) => TaxMonth::parse(&m).ok_or_else(|| {
                    TaxboxError::Validation(format!("Invalid month: '{}'. Use YYYY-MM", m))
                })?,
                None => TaxMonth::of(today),
            };
            let org = ctx.organization_id()?;
            let report = TaxSummaryReport::generate(ctx.storage, actor, org, month)?;

            let text = match output {
                Some(path) => {
                    report.export_csv(csv_writer(&path)?)?;
                    format!("Tax summary exported to: {}\n", path.display())
                }
                None => report.format_terminal(),
            };
            Outcome::text(text).with_data(&report)
        }
    }
}
