//! Display formatting for terminal output
//!
//! List views render as `tabled` tables; detail views are plain aligned text.

pub mod audit;
pub mod boxes;
pub mod catalog;
pub mod organization;
pub mod work;

pub use audit::format_audit_entries;
pub use boxes::{format_box_detail, format_box_list, format_documents, format_payments};
pub use catalog::{format_categories, format_contacts, format_cost_centers};
pub use organization::{format_clients, format_members, format_organization, format_organizations};
pub use work::{format_export_history, format_integrations, format_profiles, format_tasks};

use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Render rows as a table, or `empty` when there are none
pub(crate) fn render<T: Tabled>(rows: Vec<T>, empty: &str) -> String {
    if rows.is_empty() {
        return format!("{}\n", empty);
    }
    let mut table = Table::new(rows);
    table.with(Style::psql());
    format!("{}\n", table)
}

pub(crate) fn or_dash(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled)]
    struct Row {
        name: &'static str,
        count: usize,
    }

    #[test]
    fn test_render_table_and_empty() {
        let text = render(vec![Row { name: "a", count: 1 }], "Nothing.");
        assert!(text.contains("name"));
        assert!(text.contains("count"));
        assert_eq!(render(Vec::<Row>::new(), "Nothing."), "Nothing.\n");
        assert_eq!(or_dash(None::<u32>), "-");
        assert_eq!(or_dash(Some(3)), "3");
    }
}
