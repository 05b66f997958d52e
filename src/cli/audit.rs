//! Audit log CLI commands

use clap::Subcommand;

use crate::display::format_audit_entries;
use crate::error::TaxboxResult;
use crate::services::{AccessService, Capability};

use super::context::{CliContext, Outcome};

/// Audit subcommands
#[derive(Subcommand)]
pub enum AuditCommands {
    /// Recent changes in the selected organization
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Full history of one record, by its short ID (e.g. box-1a2b3c4d)
    Entity {
        id: String,
    },
}

pub fn handle_audit_command(ctx: &CliContext<'_>, cmd: AuditCommands) -> TaxboxResult<Outcome> {
    let org = ctx.organization_id()?;
    AccessService::new(ctx.storage).require(ctx.actor()?, org, Capability::Manage)?;
    let org_key = org.to_string();

    let entries = match cmd {
        AuditCommands::List { limit } => ctx.storage.audit().read_recent(limit, Some(&org_key))?,
        AuditCommands::Entity { id } => ctx
            .storage
            .audit()
            .read_for_entity(&id)?
            .into_iter()
            .filter(|e| e.organization_id.as_deref() == Some(org_key.as_str()))
            .collect(),
    };
    Outcome::text(format_audit_entries(&entries)).with_data(&entries)
}
