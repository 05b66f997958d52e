//! Audit log display formatting

use tabled::Tabled;

use crate::audit::AuditEntry;

use super::{or_dash, render};

#[derive(Tabled)]
struct AuditRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Op")]
    operation: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Actor")]
    actor: String,
    #[tabled(rename = "Change")]
    change: String,
}

pub fn format_audit_entries(entries: &[AuditEntry]) -> String {
    let rows = entries
        .iter()
        .map(|e| AuditRow {
            time: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            operation: e.operation.to_string(),
            entity: format!("{} {}", e.entity_type, e.entity_id),
            name: or_dash(e.entity_name.as_deref()),
            actor: or_dash(e.actor.as_deref()),
            change: or_dash(e.diff_summary.as_deref()),
        })
        .collect();
    render(rows, "No audit entries.")
}
