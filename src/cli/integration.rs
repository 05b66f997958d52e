//! Integration CLI commands: LINE, Slack, Discord, webhooks and e-mail

use std::time::Duration;

use clap::Subcommand;

use crate::display::format_integrations;
use crate::error::TaxboxResult;
use crate::models::{Integration, IntegrationKind, NotificationEvent};
use crate::notify::HttpTransport;
use crate::services::{IntegrationService, NewIntegration};

use super::context::{parse_choice, CliContext, Outcome};

const EVENTS: &str =
    "box_submitted, docs_requested, box_completed, payment_recorded, task_assigned, export_completed";

/// Integration subcommands
#[derive(Subcommand)]
pub enum IntegrationCommands {
    /// Add an integration
    Add {
        /// Name shown in listings
        name: String,
        /// Kind (line, slack, discord, webhook, email)
        #[arg(short, long)]
        kind: String,
        /// Webhook URL, or the recipient address for e-mail
        #[arg(short, long)]
        target: String,
        /// Access token (LINE Notify, bearer for webhooks)
        #[arg(long)]
        token: Option<String>,
        /// Events to send, comma separated (default: all)
        #[arg(short, long, value_delimiter = ',')]
        events: Vec<String>,
    },
    /// List integrations
    List,
    /// Start sending to an integration
    Enable { name: String },
    /// Stop sending to an integration
    Disable { name: String },
    /// Delete an integration
    Remove { name: String },
    /// Send a test message
    Test { name: String },
}

pub fn handle_integration_command(
    ctx: &CliContext<'_>,
    cmd: IntegrationCommands,
) -> TaxboxResult<Outcome> {
    let service = IntegrationService::new(ctx.storage, ctx.actor()?);
    let org = ctx.organization_id()?;

    match cmd {
        IntegrationCommands::Add {
            name,
            kind,
            target,
            token,
            events,
        } => {
            let kind = parse_choice(
                &kind,
                "kind",
                "line, slack, discord, webhook, email",
                IntegrationKind::parse,
            )?;
            let events = events
                .iter()
                .map(|e| parse_choice(e, "event", EVENTS, NotificationEvent::parse))
                .collect::<TaxboxResult<Vec<_>>>()?;
            let integration = service.create(
                org,
                NewIntegration {
                    kind,
                    name,
                    target,
                    token,
                    events,
                },
            )?;
            Outcome::text(format!("Added {} integration: {}\n", integration.kind, integration.name))
                .with_data(&integration.redacted())
        }

        IntegrationCommands::List => {
            let integrations = service.list(org)?;
            let redacted: Vec<Integration> = integrations.iter().map(Integration::redacted).collect();
            Outcome::text(format_integrations(&integrations)).with_data(&redacted)
        }

        IntegrationCommands::Enable { name } => {
            let found = service.find(org, &name)?;
            let updated = service.set_enabled(found.id, true)?;
            Outcome::text(format!("Enabled {}\n", updated.name)).with_data(&updated.redacted())
        }

        IntegrationCommands::Disable { name } => {
            let found = service.find(org, &name)?;
            let updated = service.set_enabled(found.id, false)?;
            Outcome::text(format!("Disabled {}\n", updated.name)).with_data(&updated.redacted())
        }

        IntegrationCommands::Remove { name } => {
            let found = service.find(org, &name)?;
            let removed = service.remove(found.id)?;
            Outcome::text(format!("Removed integration: {}\n", removed.name))
                .with_data(&removed.redacted())
        }

        IntegrationCommands::Test { name } => {
            let found = service.find(org, &name)?;
            let transport =
                HttpTransport::new(Duration::from_secs(ctx.storage.settings.http_timeout_secs))?;
            service.test(found.id, &transport)?;
            Ok(Outcome::text(format!("Test message sent to {}\n", found.name)))
        }
    }
}
