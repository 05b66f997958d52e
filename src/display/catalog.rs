//! Catalog display formatting

use tabled::Tabled;

use crate::models::{format_rate, Category, Contact, CostCenter};

use super::{or_dash, render};

fn archived_mark(archived: bool) -> &'static str {
    if archived {
        "archived"
    } else {
        ""
    }
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    box_type: String,
    #[tabled(rename = "")]
    archived: &'static str,
}

pub fn format_categories(categories: &[Category]) -> String {
    let rows = categories
        .iter()
        .map(|c| CategoryRow {
            code: c.account_code.clone(),
            name: c.name.clone(),
            box_type: c.box_type.to_string(),
            archived: archived_mark(c.archived),
        })
        .collect();
    render(rows, "No categories found.")
}

#[derive(Tabled)]
struct ContactRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Tax ID")]
    tax_id: String,
    #[tabled(rename = "Branch")]
    branch: String,
    #[tabled(rename = "WHT")]
    wht: String,
    #[tabled(rename = "")]
    archived: &'static str,
}

pub fn format_contacts(contacts: &[Contact]) -> String {
    let rows = contacts
        .iter()
        .map(|c| ContactRow {
            name: c.name.clone(),
            kind: c.kind.to_string(),
            tax_id: or_dash(c.tax_id.as_deref()),
            branch: or_dash(c.branch.as_deref()),
            wht: or_dash(c.default_wht_rate_bp.map(format_rate)),
            archived: archived_mark(c.archived),
        })
        .collect();
    render(rows, "No contacts found.")
}

#[derive(Tabled)]
struct CostCenterRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "")]
    archived: &'static str,
}

pub fn format_cost_centers(cost_centers: &[CostCenter]) -> String {
    let rows = cost_centers
        .iter()
        .map(|c| CostCenterRow {
            code: c.code.clone(),
            name: c.name.clone(),
            archived: archived_mark(c.archived),
        })
        .collect();
    render(rows, "No cost centers found.")
}
