//! Catalog CLI commands: categories, contacts and cost centers

use clap::Subcommand;

use crate::display::{format_categories, format_contacts, format_cost_centers};
use crate::error::TaxboxResult;
use crate::models::{BoxType, ContactKind, ContactRole};
use crate::services::{CatalogService, NewContact};

use super::context::{parse_choice, parse_rate_arg, CliContext, Outcome};

/// Catalog subcommands
#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Chart-of-accounts categories
    #[command(subcommand)]
    Category(CategoryCommands),
    /// Vendors and customers
    #[command(subcommand)]
    Contact(ContactCommands),
    /// Cost centers
    #[command(subcommand, alias = "cc")]
    CostCenter(CostCenterCommands),
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category
    Add {
        name: String,
        /// Box type it applies to (expense, income)
        #[arg(short = 't', long = "type", default_value = "expense")]
        box_type: String,
        /// Ledger account code
        #[arg(short, long, default_value = "")]
        code: String,
    },
    /// List categories
    List {
        /// Include archived categories
        #[arg(short, long)]
        all: bool,
    },
    /// Archive a category
    Archive {
        /// Category name or ID
        category: String,
    },
}

#[derive(Subcommand)]
pub enum ContactCommands {
    /// Add a contact
    Add {
        name: String,
        /// individual or juristic
        #[arg(short, long, default_value = "juristic")]
        kind: String,
        /// vendor, customer or both
        #[arg(short, long, default_value = "vendor")]
        role: String,
        /// 13-digit tax ID
        #[arg(short, long)]
        tax_id: Option<String>,
        /// Branch code
        #[arg(short, long)]
        branch: Option<String>,
        /// Default WHT rate in percent, e.g. 3
        #[arg(short, long)]
        wht_rate: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List contacts
    List {
        /// Include archived contacts
        #[arg(short, long)]
        all: bool,
    },
    /// Archive a contact
    Archive {
        /// Contact name or ID
        contact: String,
    },
}

#[derive(Subcommand)]
pub enum CostCenterCommands {
    /// Add a cost center
    Add {
        /// Short code, e.g. HQ
        code: String,
        name: String,
    },
    /// List cost centers
    List {
        /// Include archived cost centers
        #[arg(short, long)]
        all: bool,
    },
    /// Archive a cost center
    Archive {
        /// Cost center code
        code: String,
    },
}

pub fn handle_catalog_command(ctx: &CliContext<'_>, cmd: CatalogCommands) -> TaxboxResult<Outcome> {
    let service = CatalogService::new(ctx.storage, ctx.actor()?);
    let org = ctx.organization_id()?;

    match cmd {
        CatalogCommands::Category(cmd) => match cmd {
            CategoryCommands::Add {
                name,
                box_type,
                code,
            } => {
                let box_type =
                    parse_choice(&box_type, "box type", "expense, income", BoxType::parse)?;
                let category = service.create_category(org, &name, box_type, &code)?;
                Outcome::text(format!("Created category: {}\n", category.name)).with_data(&category)
            }
            CategoryCommands::List { all } => {
                let categories = service.list_categories(org, all)?;
                Outcome::text(format_categories(&categories)).with_data(&categories)
            }
            CategoryCommands::Archive { category } => {
                let found = service.find_category(org, &category)?;
                let archived = service.archive_category(found.id)?;
                Outcome::text(format!("Archived category: {}\n", archived.name)).with_data(&archived)
            }
        },

        CatalogCommands::Contact(cmd) => match cmd {
            ContactCommands::Add {
                name,
                kind,
                role,
                tax_id,
                branch,
                wht_rate,
                email,
                phone,
            } => {
                let input = NewContact {
                    name,
                    kind: parse_choice(&kind, "kind", "individual, juristic", ContactKind::parse)?,
                    role: parse_choice(&role, "role", "vendor, customer, both", ContactRole::parse)?,
                    tax_id,
                    branch,
                    default_wht_rate_bp: wht_rate.as_deref().map(parse_rate_arg).transpose()?,
                    email,
                    phone,
                };
                let contact = service.create_contact(org, input)?;
                Outcome::text(format!("Created contact: {} ({})\n", contact.name, contact.kind))
                    .with_data(&contact)
            }
            ContactCommands::List { all } => {
                let contacts = service.list_contacts(org, all)?;
                Outcome::text(format_contacts(&contacts)).with_data(&contacts)
            }
            ContactCommands::Archive { contact } => {
                let found = service.find_contact(org, &contact)?;
                let archived = service.archive_contact(found.id)?;
                Outcome::text(format!("Archived contact: {}\n", archived.name)).with_data(&archived)
            }
        },

        CatalogCommands::CostCenter(cmd) => match cmd {
            CostCenterCommands::Add { code, name } => {
                let cost_center = service.create_cost_center(org, &code, &name)?;
                Outcome::text(format!(
                    "Created cost center: {} {}\n",
                    cost_center.code, cost_center.name
                ))
                .with_data(&cost_center)
            }
            CostCenterCommands::List { all } => {
                let cost_centers = service.list_cost_centers(org, all)?;
                Outcome::text(format_cost_centers(&cost_centers)).with_data(&cost_centers)
            }
            CostCenterCommands::Archive { code } => {
                let found = service.find_cost_center(org, &code)?;
                let archived = service.archive_cost_center(found.id)?;
                Outcome::text(format!("Archived cost center: {}\n", archived.code))
                    .with_data(&archived)
            }
        },
    }
}
