//! Document CLI commands: files attached to a box

use std::path::PathBuf;

use clap::Subcommand;

use crate::display::format_documents;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::DocType;
use crate::services::DocumentService;

use super::boxes::resolve_box;
use super::context::{parse_choice, CliContext, Outcome};

const DOC_TYPES: &str =
    "receipt, tax_invoice, invoice, wht_certificate, payment_slip, quotation, contract, other";

/// Document subcommands
#[derive(Subcommand)]
pub enum DocCommands {
    /// Attach a file to a box
    Attach {
        /// Box number or ID
        box_ref: String,
        /// File to copy into the store
        file: PathBuf,
        /// Document type (receipt, tax_invoice, invoice, wht_certificate, ...)
        #[arg(short = 't', long = "type", default_value = "receipt")]
        doc_type: String,
    },
    /// List a box's documents
    List {
        /// Box number or ID
        box_ref: String,
    },
    /// Remove a file from a box
    Remove {
        /// Box number or ID
        box_ref: String,
        /// File ID
        file_id: String,
    },
    /// Move a file to another document type
    Reclassify {
        /// Box number or ID
        box_ref: String,
        /// File ID
        file_id: String,
        /// New document type
        #[arg(short = 't', long = "type")]
        doc_type: String,
    },
    /// Copy a stored file out of the store
    Get {
        /// Box number or ID
        box_ref: String,
        /// File ID
        file_id: String,
        /// Destination path (default: the original file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn handle_doc_command(ctx: &CliContext<'_>, cmd: DocCommands) -> TaxboxResult<Outcome> {
    let service = DocumentService::new(ctx.storage, ctx.actor()?);

    match cmd {
        DocCommands::Attach {
            box_ref,
            file,
            doc_type,
        } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let doc_type = parse_choice(&doc_type, "document type", DOC_TYPES, DocType::parse)?;
            let sub = service.attach(doc_box.id, doc_type, &file)?;
            Outcome::text(format!(
                "Attached {} to {} as {}\n  ID: {}\n",
                sub.file_name, doc_box.box_number, doc_type, sub.id
            ))
            .with_data(&sub)
        }

        DocCommands::List { box_ref } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let documents = service.list_for_box(doc_box.id)?;
            Outcome::text(format_documents(&documents)).with_data(&documents)
        }

        DocCommands::Remove { box_ref, file_id } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let file = service.find_file(doc_box.id, &file_id)?;
            let removed = service.remove_file(file.id)?;
            Outcome::text(format!("Removed {} from {}\n", removed.file_name, doc_box.box_number))
                .with_data(&removed)
        }

        DocCommands::Reclassify {
            box_ref,
            file_id,
            doc_type,
        } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let doc_type = parse_choice(&doc_type, "document type", DOC_TYPES, DocType::parse)?;
            let file = service.find_file(doc_box.id, &file_id)?;
            let document = service.reclassify(file.id, doc_type)?;
            Outcome::text(format!("{} is now filed as {}\n", file.file_name, document.doc_type))
                .with_data(&document)
        }

        DocCommands::Get {
            box_ref,
            file_id,
            output,
        } => {
            let doc_box = resolve_box(ctx, &box_ref)?;
            let file = service.find_file(doc_box.id, &file_id)?;
            let (sub, bytes) = service.read_file(file.id)?;
            let output = output.unwrap_or_else(|| PathBuf::from(&sub.file_name));
            std::fs::write(&output, &bytes).map_err(|e| {
                TaxboxError::Io(format!("Failed to write {}: {}", output.display(), e))
            })?;
            Outcome::text(format!("Wrote {} ({} bytes)\n", output.display(), bytes.len()))
                .with_data(&sub)
        }
    }
}
