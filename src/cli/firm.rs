//! Accounting firm CLI commands
//!
//! Client relation commands name the client organization with the global
//! `--org` option.

use clap::Subcommand;

use crate::display::format_clients;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{AccountingFirm, FirmClientRelation, FirmRole, Organization};
use crate::services::{FirmService, OrganizationService};

use super::context::{parse_choice, CliContext, Outcome};

/// Firm subcommands
#[derive(Subcommand)]
pub enum FirmCommands {
    /// Register an accounting firm; you become its owner
    Create {
        /// Firm name
        name: String,
        /// 13-digit tax ID
        #[arg(short, long)]
        tax_id: String,
    },
    /// Add a registered user to a firm
    AddMember {
        /// Firm name or ID
        firm: String,
        /// User e-mail
        email: String,
        /// Role (owner, manager, accountant)
        #[arg(short, long, default_value = "accountant")]
        role: String,
    },
    /// Ask to serve the --org organization
    Request {
        /// Firm name or ID
        firm: String,
    },
    /// Accept a firm's request on behalf of the --org organization
    Accept {
        /// Firm name or ID
        firm: String,
    },
    /// End the relation between a firm and the --org organization
    Terminate {
        /// Firm name or ID
        firm: String,
    },
    /// Put a firm member in charge of the --org client
    Assign {
        /// Firm name or ID
        firm: String,
        /// Accountant e-mail
        email: String,
    },
    /// List a firm's open client relations
    Clients {
        /// Firm name or ID
        firm: String,
    },
}

fn open_relation(
    ctx: &CliContext<'_>,
    firm: &AccountingFirm,
    org: &Organization,
) -> TaxboxResult<FirmClientRelation> {
    ctx.storage
        .firms
        .open_relation(firm.id, org.id)?
        .ok_or_else(|| TaxboxError::NotFound {
            entity_type: "Client relation",
            identifier: format!("{} / {}", firm.name, org.name),
        })
}

pub fn handle_firm_command(ctx: &CliContext<'_>, cmd: FirmCommands) -> TaxboxResult<Outcome> {
    let service = FirmService::new(ctx.storage, ctx.actor()?);

    match cmd {
        FirmCommands::Create { name, tax_id } => {
            let firm = service.create_firm(&name, &tax_id)?;
            Outcome::text(format!("Created firm: {}\n  ID: {}\n", firm.name, firm.id))
                .with_data(&firm)
        }

        FirmCommands::AddMember { firm, email, role } => {
            let firm = service.find_firm(&firm)?;
            let role = parse_choice(&role, "role", "owner, manager, accountant", FirmRole::parse)?;
            let member = service.add_firm_member(firm.id, &email, role)?;
            Outcome::text(format!("Added {} to {} as {}\n", email, firm.name, member.role))
                .with_data(&member)
        }

        FirmCommands::Request { firm } => {
            let firm = service.find_firm(&firm)?;
            let org = ctx.named_organization()?;
            let relation = service.request_client(firm.id, org.id)?;
            Outcome::text(format!(
                "{} asked to serve {}. An organization admin must run 'taxbox --org \"{}\" firm accept \"{}\"'.\n",
                firm.name, org.name, org.name, firm.name
            ))
            .with_data(&relation)
        }

        FirmCommands::Accept { firm } => {
            let firm = service.find_firm(&firm)?;
            let org = ctx.named_organization()?;
            let relation = service.accept_client(open_relation(ctx, &firm, &org)?.id)?;
            Outcome::text(format!("{} now serves {}\n", firm.name, org.name)).with_data(&relation)
        }

        FirmCommands::Terminate { firm } => {
            let firm = service.find_firm(&firm)?;
            let org = ctx.named_organization()?;
            let relation = service.terminate_client(open_relation(ctx, &firm, &org)?.id)?;
            Outcome::text(format!("Ended relation between {} and {}\n", firm.name, org.name))
                .with_data(&relation)
        }

        FirmCommands::Assign { firm, email } => {
            let firm = service.find_firm(&firm)?;
            let org = ctx.named_organization()?;
            let accountant = OrganizationService::find_user(ctx.storage, &email)?;
            let relation =
                service.assign_accountant(open_relation(ctx, &firm, &org)?.id, accountant.id)?;
            Outcome::text(format!("{} handles {} for {}\n", accountant.email, org.name, firm.name))
                .with_data(&relation)
        }

        FirmCommands::Clients { firm } => {
            let firm = service.find_firm(&firm)?;
            let clients = service.list_clients(firm.id)?;
            Outcome::text(format_clients(&clients)).with_data(&clients)
        }
    }
}
