//! Organization, member and firm client display formatting

use tabled::Tabled;

use crate::models::{MemberRole, Organization};
use crate::services::{ClientView, MemberView};

use super::{or_dash, render};

#[derive(Tabled)]
struct OrganizationRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tax ID")]
    tax_id: String,
    #[tabled(rename = "Branch")]
    branch: String,
    #[tabled(rename = "VAT")]
    vat: &'static str,
    #[tabled(rename = "Role")]
    role: String,
}

pub fn format_organizations(organizations: &[(Organization, MemberRole)]) -> String {
    let rows = organizations
        .iter()
        .map(|(o, role)| OrganizationRow {
            name: o.name.clone(),
            tax_id: o.tax_id.clone(),
            branch: o.branch.clone(),
            vat: if o.vat_registered { "yes" } else { "no" },
            role: role.to_string(),
        })
        .collect();
    render(rows, "No organizations. Create one with 'taxbox org create'.")
}

pub fn format_organization(org: &Organization) -> String {
    let mut output = String::new();
    output.push_str(&format!("Organization: {}\n", org.name));
    output.push_str(&format!("  ID:             {}\n", org.id));
    output.push_str(&format!("  Tax ID:         {}\n", org.tax_id));
    output.push_str(&format!("  Branch:         {}\n", org.branch));
    output.push_str(&format!(
        "  VAT registered: {}\n",
        if org.vat_registered { "Yes" } else { "No" }
    ));
    if !org.address.is_empty() {
        output.push_str(&format!("  Address:        {}\n", org.address));
    }
    output.push_str(&format!("  Created:        {}\n", org.created_at.format("%Y-%m-%d")));
    output
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Joined")]
    joined: String,
}

pub fn format_members(members: &[MemberView]) -> String {
    let rows = members
        .iter()
        .map(|m| MemberRow {
            email: m.user.email.clone(),
            name: m.user.name.clone(),
            role: m.member.role.to_string(),
            joined: m.member.joined_at.format("%Y-%m-%d").to_string(),
        })
        .collect();
    render(rows, "No members.")
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Relation")]
    relation: String,
    #[tabled(rename = "Client")]
    name: String,
    #[tabled(rename = "Tax ID")]
    tax_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Accountant")]
    accountant: String,
}

pub fn format_clients(clients: &[ClientView]) -> String {
    let rows = clients
        .iter()
        .map(|c| ClientRow {
            relation: c.relation.id.to_string(),
            name: c.organization.name.clone(),
            tax_id: c.organization.tax_id.clone(),
            status: c.relation.status.to_string(),
            accountant: or_dash(c.relation.assigned_accountant),
        })
        .collect();
    render(rows, "No clients.")
}
