//! CLI commands for exports
//!
//! Bookkeeping exports for GENERIC, PEAK, FLOWACCOUNT and EXPRESS, saved
//! export profiles, export history and full organization snapshots.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::display::{format_export_history, format_profiles};
use crate::error::{TaxboxError, TaxboxResult};
use crate::export::snapshot;
use crate::models::{ExportFormat, ExportTarget, NotificationEvent};
use crate::services::{ExportRequest, ExportService};

use super::context::{parse_choice, parse_date, CliContext, Outcome};

const TARGETS: &str = "generic, peak, flowaccount, express";
const FORMATS: &str = "xlsx, csv, zip";

/// Snapshot format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SnapshotFormat {
    /// JSON, machine-readable
    Json,
    /// YAML, human-readable
    Yaml,
}

/// Export subcommands
#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export boxes for a bookkeeping program
    Run {
        /// Target program (generic, peak, flowaccount, express)
        #[arg(short, long)]
        target: Option<String>,
        /// Artifact format (xlsx, csv, zip)
        #[arg(short, long, default_value = "xlsx")]
        format: String,
        /// Use a saved profile instead of --target/--format
        #[arg(short, long, conflicts_with_all = ["target", "completed_only"])]
        profile: Option<String>,
        /// Only completed boxes
        #[arg(long)]
        completed_only: bool,
        /// Earliest document date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest document date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// File or directory to write to (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a data: URL instead of writing a file
        #[arg(long)]
        data_url: bool,
    },
    /// Save an export profile
    AddProfile {
        name: String,
        #[arg(short, long)]
        target: String,
        #[arg(short, long, default_value = "xlsx")]
        format: String,
        #[arg(long)]
        completed_only: bool,
    },
    /// List export profiles
    Profiles,
    /// Delete an export profile
    DeleteProfile {
        /// Profile name or ID
        profile: String,
    },
    /// Show past export runs
    History,
    /// Write every record of the organization to one file
    Snapshot {
        /// Output file path
        output: PathBuf,
        #[arg(short, long, value_enum, default_value = "json")]
        format: SnapshotFormat,
    },
}

fn create_file(path: &Path) -> TaxboxResult<File> {
    File::create(path).map_err(|e| {
        TaxboxError::Export(format!("Failed to create file {}: {}", path.display(), e))
    })
}

pub fn handle_export_command(ctx: &CliContext<'_>, cmd: ExportCommands) -> TaxboxResult<Outcome> {
    let service = ExportService::new(ctx.storage, ctx.actor()?);
    let org = ctx.organization_id()?;

    match cmd {
        ExportCommands::Run {
            target,
            format,
            profile,
            completed_only,
            from,
            to,
            output,
            data_url,
        } => {
            let mut request = match profile {
                Some(p) => ExportRequest::from_profile(&service.find_profile(org, &p)?),
                None => {
                    let target = match target {
                        Some(t) => parse_choice(&t, "target", TARGETS, ExportTarget::parse)?,
                        None => ctx.storage.settings.default_export_target,
                    };
                    let format = parse_choice(&format, "format", FORMATS, ExportFormat::parse)?;
                    let mut request = ExportRequest::new(org, target, format);
                    request.completed_only = completed_only;
                    request
                }
            };
            request.from = from.as_deref().map(parse_date).transpose()?;
            request.to = to.as_deref().map(parse_date).transpose()?;

            let outcome = service.run_export(&request)?;
            let artifact = &outcome.artifact;
            let history = &outcome.history;

            let mut text = String::new();
            let mut data = json!({
                "file_name": artifact.file_name,
                "mime_type": artifact.mime_type,
                "size": artifact.bytes.len(),
                "history": history,
            });
            if data_url {
                let url = artifact.to_data_url();
                text.push_str(&url);
                text.push('\n');
                data["data_url"] = json!(url);
            } else {
                let path = match output {
                    Some(p) if p.is_dir() => p.join(&artifact.file_name),
                    Some(p) => p,
                    None => PathBuf::from(&artifact.file_name),
                };
                std::fs::write(&path, &artifact.bytes).map_err(|e| {
                    TaxboxError::Export(format!("Failed to write {}: {}", path.display(), e))
                })?;
                text.push_str(&format!(
                    "Exported {} boxes for {} to: {}\n",
                    history.row_count,
                    history.target,
                    path.display()
                ));
                data["path"] = json!(path);
            }
            for skipped in &history.skipped_files {
                text.push_str(&format!("  skipped unreadable file: {}\n", skipped));
            }

            let message = format!(
                "{} export ready: {} ({} boxes)",
                history.target, artifact.file_name, history.row_count
            );
            Ok(Outcome::text(text)
                .with_data(&data)?
                .notify(org, NotificationEvent::ExportCompleted, message))
        }

        ExportCommands::AddProfile {
            name,
            target,
            format,
            completed_only,
        } => {
            let target = parse_choice(&target, "target", TARGETS, ExportTarget::parse)?;
            let format = parse_choice(&format, "format", FORMATS, ExportFormat::parse)?;
            let profile = service.create_profile(org, &name, target, format, completed_only)?;
            Outcome::text(format!(
                "Saved export profile: {} ({} {})\n",
                profile.name, profile.target, profile.format
            ))
            .with_data(&profile)
        }

        ExportCommands::Profiles => {
            let profiles = service.list_profiles(org)?;
            Outcome::text(format_profiles(&profiles)).with_data(&profiles)
        }

        ExportCommands::DeleteProfile { profile } => {
            let found = service.find_profile(org, &profile)?;
            let deleted = service.delete_profile(found.id)?;
            Outcome::text(format!("Deleted export profile: {}\n", deleted.name)).with_data(&deleted)
        }

        ExportCommands::History => {
            let history = service.history(org)?;
            Outcome::text(format_export_history(&history)).with_data(&history)
        }

        ExportCommands::Snapshot { output, format } => {
            let snap = service.snapshot(org)?;
            let mut writer = BufWriter::new(create_file(&output)?);
            match format {
                SnapshotFormat::Json => snapshot::write_json(&snap, &mut writer)?,
                SnapshotFormat::Yaml => snapshot::write_yaml(&snap, &mut writer)?,
            }
            writer
                .flush()
                .map_err(|e| TaxboxError::Export(e.to_string()))?;
            let text = format!(
                "Snapshot of {} written to: {}\n  Boxes: {}  Files: {}  Payments: {}\n",
                snap.organization.name,
                output.display(),
                snap.metadata.box_count,
                snap.metadata.file_count,
                snap.metadata.payment_count
            );
            Outcome::text(text).with_data(&snap.metadata)
        }
    }
}
