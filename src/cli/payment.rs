//! Payment CLI commands

use chrono::Local;
use clap::Subcommand;

use crate::display::format_payments;
use crate::error::TaxboxResult;
use crate::models::{NotificationEvent, PaymentMethod};
use crate::notify::describe_box;
use crate::services::PaymentService;

use super::boxes::resolve_box;
use super::context::{parse_choice, parse_date, parse_money, CliContext, Outcome};

/// Payment subcommands
#[derive(Subcommand)]
pub enum PaymentCommands {
    /// Record a payment against a box
    Add {
        /// Box number or ID
        box_ref: String,
        /// Amount paid, e.g. 1040.00
        amount: String,
        /// Payment date (YYYY-MM-DD), default today
        #[arg(short, long)]
        date: Option<String>,
        /// Method (cash, transfer, cheque, credit_card, other)
        #[arg(short, long, default_value = "transfer")]
        method: String,
        /// Bank or cheque reference
        #[arg(short, long)]
        reference: Option<String>,
        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// List a box's payments
    List {
        /// Box number or ID
        box_ref: String,
    },
    /// Delete a payment
    Delete {
        /// Box number or ID
        box_ref: String,
        /// Payment ID
        payment_id: String,
    },
}

pub fn handle_payment_command(ctx: &CliContext<'_>, cmd: PaymentCommands) -> TaxboxResult<Outcome> {
    let service = PaymentService::new(ctx.storage, ctx.actor()?);

    match cmd {
        PaymentCommands::Add {
            box_ref,
            amount,
            date,
            method,
            reference,
            note,
        } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let paid_on = match date {
                Some(d) => parse_date(&d)?,
                None => Local::now().date_naive(),
            };
            let method = parse_choice(
                &method,
                "payment method",
                "cash, transfer, cheque, credit_card, other",
                PaymentMethod::parse,
            )?;
            let (payment, doc_box) =
                service.record(doc_box.id, parse_money(&amount)?, paid_on, method, reference, &note)?;

            let message = describe_box(NotificationEvent::PaymentRecorded, &doc_box);
            let text = format!(
                "Recorded {} on {}\n  Paid: {} ({})\n",
                payment.amount, doc_box.box_number, doc_box.paid_amount, doc_box.payment_status
            );
            Ok(Outcome::text(text)
                .with_data(&payment)?
                .notify(doc_box.organization_id, NotificationEvent::PaymentRecorded, message))
        }

        PaymentCommands::List { box_ref } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let payments = service.list_for_box(doc_box.id)?;
            Outcome::text(format_payments(&payments)).with_data(&payments)
        }

        PaymentCommands::Delete {
            box_ref,
            payment_id,
        } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let payment = service.find(doc_box.id, &payment_id)?;
            let doc_box = service.delete(payment.id)?;
            Outcome::text(format!(
                "Deleted payment of {} from {} (now {})\n",
                payment.amount, doc_box.box_number, doc_box.payment_status
            ))
            .with_data(&doc_box)
        }
    }
}
