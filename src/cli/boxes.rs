//! Box CLI commands
//!
//! Boxes are named by number (e.g. `EXP-202501-0001`) or ID. Workflow commands
//! queue a notification for the organization's integrations.

use chrono::Local;
use clap::{Args, Subcommand};

use crate::display::{format_box_detail, format_box_list};
use crate::error::TaxboxResult;
use crate::models::{
    BoxStatus, BoxType, CategoryId, ContactId, CostCenterId, DocBox, NotificationEvent,
    OrganizationId, PaymentStatus,
};
use crate::notify::describe_box;
use crate::services::{BoxFilter, BoxService, BoxUpdate, CatalogService, NewBox, OrganizationService};

use super::context::{parse_choice, parse_date, parse_money, parse_rate_arg, CliContext, Outcome};

/// Catalog references shared by `create` and `edit`
#[derive(Args)]
pub struct BoxRefs {
    /// Contact name or ID
    #[arg(long)]
    contact: Option<String>,
    /// Category name or ID
    #[arg(long)]
    category: Option<String>,
    /// Cost center code
    #[arg(long)]
    cost_center: Option<String>,
}

/// Box subcommands
#[derive(Subcommand)]
pub enum BoxCommands {
    /// Create a draft box
    Create {
        /// What the box is for
        title: String,
        /// Total amount including VAT, e.g. 1070.00
        #[arg(short, long)]
        amount: String,
        /// Box type (expense, income)
        #[arg(short = 't', long = "type", default_value = "expense")]
        box_type: String,
        /// Document date (YYYY-MM-DD), default today
        #[arg(short, long)]
        date: Option<String>,
        /// Payment due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Invoice or receipt number
        #[arg(short, long)]
        reference: Option<String>,
        /// The amount includes VAT
        #[arg(long)]
        vat: bool,
        /// The amount excludes VAT; VAT is added on top
        #[arg(long, requires = "vat")]
        vat_exclusive: bool,
        /// VAT rate in percent (default from settings)
        #[arg(long, requires = "vat")]
        vat_rate: Option<String>,
        /// WHT rate in percent, e.g. 3
        #[arg(long)]
        wht_rate: Option<String>,
        #[command(flatten)]
        refs: BoxRefs,
    },
    /// List boxes
    List {
        /// Status (draft, pending, need_docs, completed)
        #[arg(short, long)]
        status: Option<String>,
        /// Box type (expense, income)
        #[arg(short = 't', long = "type")]
        box_type: Option<String>,
        /// Earliest document date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest document date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Payment status (unpaid, partial, paid, overpaid)
        #[arg(short, long)]
        payment: Option<String>,
        /// Text to look for in number, title, reference or contact
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Maximum number of boxes
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show box details
    Show {
        /// Box number or ID
        box_ref: String,
    },
    /// Edit a box
    Edit {
        /// Box number or ID
        box_ref: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(short, long)]
        reference: Option<String>,
        /// VAT applies (true/false)
        #[arg(long)]
        vat: Option<bool>,
        /// Amount excludes VAT (true/false)
        #[arg(long)]
        vat_exclusive: Option<bool>,
        #[arg(long)]
        vat_rate: Option<String>,
        /// WHT applies (true/false)
        #[arg(long)]
        wht: Option<bool>,
        #[arg(long)]
        wht_rate: Option<String>,
        #[command(flatten)]
        refs: BoxRefs,
    },
    /// Submit a draft for review
    Submit { box_ref: String },
    /// Pull a submitted box back to draft
    Withdraw { box_ref: String },
    /// Ask the submitter for more documents
    RequestDocs {
        box_ref: String,
        /// What is missing
        reason: String,
    },
    /// Send a box back for review after adding documents
    Resubmit { box_ref: String },
    /// Mark a reviewed box completed
    Complete { box_ref: String },
    /// Reopen a completed box for changes
    Reopen { box_ref: String },
    /// Record that VAT for the box was filed
    VatFiled { box_ref: String },
    /// Record that WHT for the box was filed
    WhtFiled { box_ref: String },
    /// Hand a box to a user, or clear the assignee
    Assign {
        box_ref: String,
        /// User e-mail; omit to unassign
        email: Option<String>,
    },
    /// Delete a draft box and its files
    Delete { box_ref: String },
    /// List required documents not yet attached
    Missing { box_ref: String },
}

/// Find a box, scoped to the selected organization when one can be determined
pub(crate) fn resolve_box(ctx: &CliContext<'_>, identifier: &str) -> TaxboxResult<DocBox> {
    let service = BoxService::new(ctx.storage, ctx.actor()?);
    service.find(ctx.organization_id().ok(), identifier)
}

fn resolve_refs(
    ctx: &CliContext<'_>,
    org: OrganizationId,
    refs: &BoxRefs,
) -> TaxboxResult<(Option<ContactId>, Option<CategoryId>, Option<CostCenterId>)> {
    let catalog = CatalogService::new(ctx.storage, ctx.actor()?);
    let contact = match &refs.contact {
        Some(c) => Some(catalog.find_contact(org, c)?.id),
        None => None,
    };
    let category = match &refs.category {
        Some(c) => Some(catalog.find_category(org, c)?.id),
        None => None,
    };
    let cost_center = match &refs.cost_center {
        Some(c) => Some(catalog.find_cost_center(org, c)?.id),
        None => None,
    };
    Ok((contact, category, cost_center))
}

fn opt_date(value: Option<String>) -> TaxboxResult<Option<chrono::NaiveDate>> {
    value.as_deref().map(parse_date).transpose()
}

fn opt_rate(value: Option<String>) -> TaxboxResult<Option<u32>> {
    value.as_deref().map(parse_rate_arg).transpose()
}

fn moved(doc_box: DocBox, verb: &str) -> TaxboxResult<Outcome> {
    Outcome::text(format!("{} {} (now {})\n", verb, doc_box.box_number, doc_box.status))
        .with_data(&doc_box)
}

fn moved_with_notice(doc_box: DocBox, verb: &str, event: NotificationEvent) -> TaxboxResult<Outcome> {
    let message = describe_box(event, &doc_box);
    let org = doc_box.organization_id;
    Ok(moved(doc_box, verb)?.notify(org, event, message))
}

pub fn handle_box_command(ctx: &CliContext<'_>, cmd: BoxCommands) -> TaxboxResult<Outcome> {
    let service = BoxService::new(ctx.storage, ctx.actor()?);

    match cmd {
        BoxCommands::Create {
            title,
            amount,
            box_type,
            date,
            due,
            reference,
            vat,
            vat_exclusive,
            vat_rate,
            wht_rate,
            refs,
        } => {
            let org = ctx.organization_id()?;
            let box_type = parse_choice(&box_type, "box type", "expense, income", BoxType::parse)?;
            let document_date = match date {
                Some(d) => parse_date(&d)?,
                None => Local::now().date_naive(),
            };
            let mut input = NewBox::new(org, box_type, title, document_date, parse_money(&amount)?);
            (input.contact_id, input.category_id, input.cost_center_id) =
                resolve_refs(ctx, org, &refs)?;
            input.due_date = opt_date(due)?;
            input.reference = reference;
            input.has_vat = vat;
            input.vat_inclusive = !vat_exclusive;
            input.vat_rate_bp = opt_rate(vat_rate)?;
            input.wht_rate_bp = opt_rate(wht_rate)?;
            input.has_wht = input.wht_rate_bp.is_some();

            let doc_box = service.create(input)?;
            let breakdown = doc_box.breakdown();
            let text = format!(
                "Created box {}: {}\n  Total: {}  VAT: {}  WHT: {}  Net payable: {}\n",
                doc_box.box_number,
                doc_box.title,
                doc_box.total_amount,
                doc_box.vat_amount,
                doc_box.wht_amount,
                breakdown.net_payable
            );
            Outcome::text(text).with_data(&doc_box)
        }

        BoxCommands::List {
            status,
            box_type,
            from,
            to,
            payment,
            search,
            limit,
        } => {
            let filter = BoxFilter {
                organization_id: ctx.organization_id().ok(),
                status: status
                    .map(|s| {
                        parse_choice(&s, "status", "draft, pending, need_docs, completed", BoxStatus::parse)
                    })
                    .transpose()?,
                box_type: box_type
                    .map(|t| parse_choice(&t, "box type", "expense, income", BoxType::parse))
                    .transpose()?,
                from: opt_date(from)?,
                to: opt_date(to)?,
                payment_status: payment
                    .map(|p| {
                        parse_choice(&p, "payment status", "unpaid, partial, paid, overpaid", PaymentStatus::parse)
                    })
                    .transpose()?,
                text: search,
                limit,
            };
            let boxes = service.list(&filter)?;
            Outcome::text(format_box_list(&boxes)).with_data(&boxes)
        }

        BoxCommands::Show { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            let detail = service.detail(found.id)?;
            Outcome::text(format_box_detail(&detail)).with_data(&detail)
        }

        BoxCommands::Edit {
            box_ref,
            title,
            amount,
            date,
            due,
            reference,
            vat,
            vat_exclusive,
            vat_rate,
            wht,
            wht_rate,
            refs,
        } => {
            let found = resolve_box(ctx, &box_ref)?;
            let (contact_id, category_id, cost_center_id) =
                resolve_refs(ctx, found.organization_id, &refs)?;
            let update = BoxUpdate {
                title,
                document_date: opt_date(date)?,
                due_date: opt_date(due)?,
                reference,
                total_amount: amount.as_deref().map(parse_money).transpose()?,
                contact_id,
                category_id,
                cost_center_id,
                has_vat: vat,
                vat_inclusive: vat_exclusive.map(|x| !x),
                vat_rate_bp: opt_rate(vat_rate)?,
                has_wht: wht,
                wht_rate_bp: opt_rate(wht_rate)?,
            };
            let updated = service.update(found.id, update)?;
            moved(updated, "Updated")
        }

        BoxCommands::Submit { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            moved_with_notice(service.submit(found.id)?, "Submitted", NotificationEvent::BoxSubmitted)
        }

        BoxCommands::Withdraw { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            moved(service.withdraw(found.id)?, "Withdrew")
        }

        BoxCommands::RequestDocs { box_ref, reason } => {
            let found = resolve_box(ctx, &box_ref)?;
            moved_with_notice(
                service.request_docs(found.id, &reason)?,
                "Requested documents for",
                NotificationEvent::DocsRequested,
            )
        }

        BoxCommands::Resubmit { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            moved_with_notice(service.resubmit(found.id)?, "Resubmitted", NotificationEvent::BoxSubmitted)
        }

        BoxCommands::Complete { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            moved_with_notice(service.complete(found.id)?, "Completed", NotificationEvent::BoxCompleted)
        }

        BoxCommands::Reopen { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            moved(service.reopen(found.id)?, "Reopened")
        }

        BoxCommands::VatFiled { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            let doc_box = service.mark_vat_filed(found.id)?;
            Outcome::text(format!("{} VAT: {}\n", doc_box.box_number, doc_box.vat_status))
                .with_data(&doc_box)
        }

        BoxCommands::WhtFiled { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            let doc_box = service.mark_wht_filed(found.id)?;
            Outcome::text(format!("{} WHT: {}\n", doc_box.box_number, doc_box.wht_status))
                .with_data(&doc_box)
        }

        BoxCommands::Assign { box_ref, email } => {
            let found = resolve_box(ctx, &box_ref)?;
            let assignee = match email.as_deref() {
                Some(e) => Some(OrganizationService::find_user(ctx.storage, e)?),
                None => None,
            };
            let doc_box = service.assign(found.id, assignee.as_ref().map(|u| u.id))?;
            let text = match &assignee {
                Some(user) => format!("Assigned {} to {}\n", doc_box.box_number, user.email),
                None => format!("Cleared assignee of {}\n", doc_box.box_number),
            };
            Outcome::text(text).with_data(&doc_box)
        }

        BoxCommands::Delete { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            let deleted = service.delete(found.id)?;
            Outcome::text(format!("Deleted box {}\n", deleted.box_number)).with_data(&deleted)
        }

        BoxCommands::Missing { box_ref } => {
            let found = resolve_box(ctx, &box_ref)?;
            let missing = service.missing_documents(found.id)?;
            let text = if missing.is_empty() {
                format!("{} has every required document\n", found.box_number)
            } else {
                missing
                    .iter()
                    .map(|r| format!("missing: {}\n", r))
                    .collect::<String>()
            };
            Outcome::text(text).with_data(&missing)
        }
    }
}
