//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.
//! Every handler returns an [`Outcome`]; `main` prints it as text or as the
//! `{ success, data, error }` JSON object and sends any queued notification.

pub mod audit;
pub mod boxes;
pub mod catalog;
pub mod config;
pub mod context;
pub mod doc;
pub mod export;
pub mod firm;
pub mod integration;
pub mod org;
pub mod payment;
pub mod report;
pub mod task;

pub use audit::{handle_audit_command, AuditCommands};
pub use boxes::{handle_box_command, BoxCommands};
pub use catalog::{handle_catalog_command, CatalogCommands};
pub use config::{handle_config_command, handle_init, handle_user_command, ConfigCommands, UserCommands};
pub use context::{CliContext, CommandResult, Notice, Outcome};
pub use doc::{handle_doc_command, DocCommands};
pub use export::{handle_export_command, ExportCommands};
pub use firm::{handle_firm_command, FirmCommands};
pub use integration::{handle_integration_command, IntegrationCommands};
pub use org::{handle_org_command, OrgCommands};
pub use payment::{handle_payment_command, PaymentCommands};
pub use report::{handle_report_command, ReportCommands};
pub use task::{handle_task_command, TaskCommands};

use std::time::Duration;

use clap::Subcommand;

use crate::error::TaxboxResult;
use crate::notify::{DispatchReport, HttpTransport, Notifier, WebhookTransport};
use crate::storage::Storage;

/// Top-level commands
#[derive(Subcommand)]
pub enum Commands {
    /// Prepare the data directory, optionally registering the first user
    Init {
        /// E-mail of the first user, made the default user
        #[arg(short, long)]
        email: Option<String>,
        /// Display name of the first user
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Organization management commands
    #[command(subcommand)]
    Org(OrgCommands),

    /// Accounting firm commands
    #[command(subcommand)]
    Firm(FirmCommands),

    /// Categories, contacts and cost centers
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Document boxes and their review workflow
    #[command(subcommand)]
    Box(BoxCommands),

    /// Files attached to boxes
    #[command(subcommand)]
    Doc(DocCommands),

    /// Payments against boxes
    #[command(subcommand)]
    Payment(PaymentCommands),

    /// Follow-up tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Bookkeeping exports and snapshots
    #[command(subcommand)]
    Export(ExportCommands),

    /// Outbound notifications
    #[command(subcommand)]
    Integration(IntegrationCommands),

    /// Firm dashboard and tax summaries
    #[command(subcommand)]
    Report(ReportCommands),

    /// Audit log
    #[command(subcommand)]
    Audit(AuditCommands),
}

/// Run one command
pub fn run(ctx: &CliContext<'_>, command: Commands) -> TaxboxResult<Outcome> {
    match command {
        Commands::Init { email, name } => handle_init(ctx.storage, email, name),
        Commands::Config(cmd) => handle_config_command(ctx.storage, cmd),
        Commands::User(cmd) => handle_user_command(ctx, cmd),
        Commands::Org(cmd) => handle_org_command(ctx, cmd),
        Commands::Firm(cmd) => handle_firm_command(ctx, cmd),
        Commands::Catalog(cmd) => handle_catalog_command(ctx, cmd),
        Commands::Box(cmd) => handle_box_command(ctx, cmd),
        Commands::Doc(cmd) => handle_doc_command(ctx, cmd),
        Commands::Payment(cmd) => handle_payment_command(ctx, cmd),
        Commands::Task(cmd) => handle_task_command(ctx, cmd),
        Commands::Export(cmd) => handle_export_command(ctx, cmd),
        Commands::Integration(cmd) => handle_integration_command(ctx, cmd),
        Commands::Report(cmd) => handle_report_command(ctx, cmd),
        Commands::Audit(cmd) => handle_audit_command(ctx, cmd),
    }
}

/// Deliver a queued notice with `transport`
pub fn deliver(
    storage: &Storage,
    transport: &dyn WebhookTransport,
    notice: &Notice,
) -> TaxboxResult<DispatchReport> {
    Notifier::new(storage, transport).dispatch(notice.organization_id, notice.event, &notice.message)
}

/// Deliver a queued notice over HTTP
///
/// Skips building an HTTP client when no integration listens for the event.
pub fn send_notice(storage: &Storage, notice: &Notice) -> TaxboxResult<DispatchReport> {
    if storage
        .integrations
        .subscribers(notice.organization_id, notice.event)?
        .is_empty()
    {
        return Ok(DispatchReport::default());
    }
    let transport = HttpTransport::new(Duration::from_secs(storage.settings.http_timeout_secs))?;
    deliver(storage, &transport, notice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocType, IntegrationKind, NotificationEvent};
    use crate::notify::testing::RecordingTransport;
    use crate::services::testutil::Fixture;
    use crate::services::{DocumentService, IntegrationService, NewIntegration};

    fn ctx(fx: &Fixture) -> CliContext<'_> {
        CliContext::new(&fx.storage, Some("owner@example.com".into()), None)
    }

    #[test]
    fn test_submit_queues_notice() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, None);
        DocumentService::new(&fx.storage, fx.owner)
            .attach_bytes(doc_box.id, DocType::Receipt, "receipt.pdf", b"%PDF-1.4")
            .unwrap();
        let outcome = run(
            &ctx(&fx),
            Commands::Box(BoxCommands::Submit {
                box_ref: doc_box.box_number.clone(),
            }),
        )
        .unwrap();

        let notice = outcome.notice.unwrap();
        assert_eq!(notice.event, NotificationEvent::BoxSubmitted);
        assert_eq!(notice.organization_id, fx.org);
        assert!(notice.message.contains(&doc_box.box_number));
        assert_eq!(outcome.data.unwrap()["status"], "PENDING");
    }

    #[test]
    fn test_deliver_reaches_subscribers() {
        let fx = Fixture::new();
        IntegrationService::new(&fx.storage, fx.owner)
            .create(
                fx.org,
                NewIntegration {
                    kind: IntegrationKind::Discord,
                    name: "Team".into(),
                    target: "https://discord.example/hook".into(),
                    token: None,
                    events: vec![NotificationEvent::BoxCompleted],
                },
            )
            .unwrap();
        let transport = RecordingTransport::default();
        let notice = Notice {
            organization_id: fx.org,
            event: NotificationEvent::BoxCompleted,
            message: "EXP-202501-0001 was completed".into(),
        };

        let report = deliver(&fx.storage, &transport, &notice).unwrap();
        assert_eq!(report.delivered.len(), 1);
        assert_eq!(transport.sent.borrow().len(), 1);
    }

    #[test]
    fn test_single_organization_is_implicit() {
        let fx = Fixture::new();
        let outcome = run(&ctx(&fx), Commands::Org(OrgCommands::Show)).unwrap();
        assert!(outcome.text.contains("Siam Widgets"));
    }

    #[test]
    fn test_missing_user_is_config_error() {
        let fx = Fixture::new();
        let ctx = CliContext::new(&fx.storage, None, None);
        let err = run(&ctx, Commands::Org(OrgCommands::List)).unwrap_err();
        assert!(matches!(err, crate::error::TaxboxError::Config(_)));
    }
}
