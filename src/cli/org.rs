//! Organization CLI commands

use clap::Subcommand;
use serde_json::json;

use crate::display::{format_members, format_organization, format_organizations};
use crate::error::TaxboxResult;
use crate::models::MemberRole;
use crate::services::{OrganizationService, OrganizationUpdate};

use super::context::{parse_choice, CliContext, Outcome};

const ROLES: &str = "owner, admin, accountant, staff, viewer";

/// Organization subcommands
#[derive(Subcommand)]
pub enum OrgCommands {
    /// Create an organization; you become its owner
    Create {
        /// Registered name
        name: String,
        /// 13-digit tax ID
        #[arg(short, long)]
        tax_id: String,
        /// Branch code (default 00000, head office)
        #[arg(short, long)]
        branch: Option<String>,
        /// Registered address
        #[arg(short, long, default_value = "")]
        address: String,
        /// Not registered for VAT
        #[arg(long)]
        no_vat: bool,
    },
    /// List organizations you can access
    List,
    /// Show the selected organization
    Show,
    /// Edit the selected organization
    Edit {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        branch: Option<String>,
        #[arg(short, long)]
        address: Option<String>,
        /// VAT registration (true/false)
        #[arg(long)]
        vat: Option<bool>,
    },
    /// List members of the selected organization
    Members,
    /// Add a registered user as a member
    AddMember {
        /// User e-mail
        email: String,
        /// Role (owner, admin, accountant, staff, viewer)
        #[arg(short, long, default_value = "staff")]
        role: String,
    },
    /// Change a member's role
    SetRole {
        /// User e-mail
        email: String,
        /// New role
        role: String,
    },
    /// Remove a member
    RemoveMember {
        /// User e-mail
        email: String,
    },
}

pub fn handle_org_command(ctx: &CliContext<'_>, cmd: OrgCommands) -> TaxboxResult<Outcome> {
    let service = OrganizationService::new(ctx.storage, ctx.actor()?);

    match cmd {
        OrgCommands::Create {
            name,
            tax_id,
            branch,
            address,
            no_vat,
        } => {
            let org =
                service.create_organization(&name, &tax_id, branch.as_deref(), &address, !no_vat)?;
            let text = format!(
                "Created organization: {}\n  Tax ID: {} ({})\n  ID: {}\n",
                org.name, org.tax_id, org.branch, org.id
            );
            Outcome::text(text).with_data(&org)
        }

        OrgCommands::List => {
            let orgs = service.list_for_user()?;
            let data: Vec<_> = orgs
                .iter()
                .map(|(org, role)| json!({ "organization": org, "role": role }))
                .collect();
            Outcome::text(format_organizations(&orgs)).with_data(&data)
        }

        OrgCommands::Show => {
            let org = ctx.organization()?;
            Outcome::text(format_organization(&org)).with_data(&org)
        }

        OrgCommands::Edit {
            name,
            branch,
            address,
            vat,
        } => {
            let org = ctx.organization()?;
            if name.is_none() && branch.is_none() && address.is_none() && vat.is_none() {
                return Ok(Outcome::text(
                    "No changes specified. Use --name, --branch, --address or --vat.\n",
                ));
            }
            let updated = service.update_organization(
                org.id,
                OrganizationUpdate {
                    name,
                    branch,
                    address,
                    vat_registered: vat,
                },
            )?;
            Outcome::text(format!("Updated organization: {}\n", updated.name)).with_data(&updated)
        }

        OrgCommands::Members => {
            let org = ctx.organization()?;
            let members = service.list_members(org.id)?;
            Outcome::text(format_members(&members)).with_data(&members)
        }

        OrgCommands::AddMember { email, role } => {
            let org = ctx.organization()?;
            let role = parse_choice(&role, "role", ROLES, MemberRole::parse)?;
            let member = service.add_member(org.id, &email, role)?;
            Outcome::text(format!("Added {} to {} as {}\n", email, org.name, member.role))
                .with_data(&member)
        }

        OrgCommands::SetRole { email, role } => {
            let org = ctx.organization()?;
            let role = parse_choice(&role, "role", ROLES, MemberRole::parse)?;
            let user = OrganizationService::find_user(ctx.storage, &email)?;
            let member = service.change_role(org.id, user.id, role)?;
            Outcome::text(format!("{} is now {} of {}\n", user.email, member.role, org.name))
                .with_data(&member)
        }

        OrgCommands::RemoveMember { email } => {
            let org = ctx.organization()?;
            let user = OrganizationService::find_user(ctx.storage, &email)?;
            service.remove_member(org.id, user.id)?;
            Ok(Outcome::text(format!("Removed {} from {}\n", user.email, org.name)))
        }
    }
}
