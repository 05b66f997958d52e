//! Box display formatting

use tabled::Tabled;

use crate::models::{format_rate, DocBox, Document, Payment, VatStatus, WhtStatus};
use crate::services::BoxDetail;

use super::{or_dash, render};

#[derive(Tabled)]
struct BoxRow {
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "VAT")]
    vat: String,
    #[tabled(rename = "WHT")]
    wht: String,
    #[tabled(rename = "Payment")]
    payment: String,
}

fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max - 1).collect::<String>())
    }
}

pub fn format_box_list(boxes: &[DocBox]) -> String {
    let rows = boxes
        .iter()
        .map(|b| BoxRow {
            number: b.box_number.clone(),
            date: b.document_date.to_string(),
            title: shorten(&b.title, 32),
            total: b.total_amount.to_string(),
            status: b.status.to_string(),
            vat: b.vat_status.to_string(),
            wht: b.wht_status.to_string(),
            payment: b.payment_status.to_string(),
        })
        .collect();
    render(rows, "No boxes found.")
}

pub fn format_box_detail(detail: &BoxDetail) -> String {
    let b = &detail.doc_box;
    let breakdown = b.breakdown();
    let mut output = String::new();

    output.push_str(&format!("Box {}: {}\n", b.box_number, b.title));
    output.push_str(&format!("  ID:             {}\n", b.id));
    output.push_str(&format!("  Type:           {}\n", b.box_type));
    output.push_str(&format!("  Status:         {}\n", b.status));
    if let Some(reason) = &b.need_docs_reason {
        output.push_str(&format!("  Requested:      {}\n", reason));
    }
    output.push_str(&format!("  Document date:  {}\n", b.document_date));
    output.push_str(&format!("  Due date:       {}\n", or_dash(b.due_date)));
    output.push_str(&format!("  Reference:      {}\n", or_dash(b.reference.as_deref())));
    output.push_str(&format!(
        "  Contact:        {}\n",
        or_dash(detail.contact.as_ref().map(|c| c.name.as_str()))
    ));
    output.push('\n');

    output.push_str(&format!("  Subtotal:       {:>15}\n", breakdown.subtotal));
    if b.has_vat {
        output.push_str(&format!(
            "  VAT {:<10}  {:>15}  {}\n",
            format_rate(b.vat_rate_bp),
            b.vat_amount,
            vat_label(b.vat_status)
        ));
    }
    output.push_str(&format!("  Total:          {:>15}\n", breakdown.gross));
    if b.has_wht {
        output.push_str(&format!(
            "  WHT {:<10}  {:>15}  {}\n",
            format_rate(b.wht_rate_bp),
            b.wht_amount,
            wht_label(b.wht_status)
        ));
    }
    output.push_str(&format!("  Net payable:    {:>15}\n", breakdown.net_payable));
    output.push_str(&format!(
        "  Paid:           {:>15}  {}\n",
        b.paid_amount, b.payment_status
    ));

    output.push('\n');
    output.push_str("Documents:\n");
    if detail.documents.is_empty() {
        output.push_str("  (none)\n");
    }
    for document in &detail.documents {
        for file in &document.files {
            output.push_str(&format!(
                "  [{}] {} ({}, {} bytes) {}\n",
                document.doc_type, file.file_name, file.mime_type, file.size_bytes, file.id
            ));
        }
    }
    if !detail.missing.is_empty() {
        output.push_str("Missing:\n");
        for requirement in &detail.missing {
            output.push_str(&format!("  - {}\n", requirement));
        }
    }

    if !detail.payments.is_empty() {
        output.push('\n');
        output.push_str("Payments:\n");
        for p in &detail.payments {
            output.push_str(&format!("  {} {:>15} {}\n", p.paid_on, p.amount, p.method));
        }
    }
    output
}

fn vat_label(status: VatStatus) -> String {
    format!("tax invoice {}", status.to_string().to_lowercase())
}

fn wht_label(status: WhtStatus) -> String {
    format!("certificate {}", status.to_string().to_lowercase())
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    doc_type: String,
    #[tabled(rename = "File")]
    file_name: String,
    #[tabled(rename = "Size")]
    size: u64,
    #[tabled(rename = "Uploaded")]
    uploaded: String,
}

pub fn format_documents(documents: &[Document]) -> String {
    let rows = documents
        .iter()
        .flat_map(|d| {
            d.files.iter().map(move |f| FileRow {
                id: f.id.to_string(),
                doc_type: d.doc_type.to_string(),
                file_name: f.file_name.clone(),
                size: f.size_bytes,
                uploaded: f.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
            })
        })
        .collect();
    render(rows, "No documents attached.")
}

#[derive(Tabled)]
struct PaymentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Paid On")]
    paid_on: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Reference")]
    reference: String,
}

pub fn format_payments(payments: &[Payment]) -> String {
    let rows = payments
        .iter()
        .map(|p| PaymentRow {
            id: p.id.to_string(),
            paid_on: p.paid_on.to_string(),
            amount: p.amount.to_string(),
            method: p.method.to_string(),
            reference: or_dash(p.reference.as_deref()),
        })
        .collect();
    render(rows, "No payments recorded.")
}
