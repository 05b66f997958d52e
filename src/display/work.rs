//! Task, export and integration display formatting

use tabled::Tabled;

use crate::models::{ExportHistory, ExportProfile, Integration, Task};

use super::{or_dash, render};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
}

/// Tasks; `names` maps assignee IDs to e-mails
pub fn format_tasks(tasks: &[Task], names: &dyn Fn(&Task) -> Option<String>) -> String {
    let rows = tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id.to_string(),
            title: t.title.clone(),
            status: t.status.to_string(),
            due: or_dash(t.due_date),
            assignee: or_dash(names(t)),
        })
        .collect();
    render(rows, "No tasks.")
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Format")]
    format: String,
    #[tabled(rename = "Completed only")]
    completed_only: &'static str,
}

pub fn format_profiles(profiles: &[ExportProfile]) -> String {
    let rows = profiles
        .iter()
        .map(|p| ProfileRow {
            name: p.name.clone(),
            target: p.target.to_string(),
            format: p.format.to_string(),
            completed_only: if p.include_completed_only { "yes" } else { "no" },
        })
        .collect();
    render(rows, "No export profiles.")
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "File")]
    file_name: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
}

pub fn format_export_history(history: &[ExportHistory]) -> String {
    let rows = history
        .iter()
        .map(|h| HistoryRow {
            when: h.created_at.format("%Y-%m-%d %H:%M").to_string(),
            file_name: h.file_name.clone(),
            rows: h.row_count,
            skipped: h.skipped_files.len(),
        })
        .collect();
    render(rows, "No exports yet.")
}

#[derive(Tabled)]
struct IntegrationRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Events")]
    events: String,
    #[tabled(rename = "Enabled")]
    enabled: &'static str,
}

pub fn format_integrations(integrations: &[Integration]) -> String {
    let rows = integrations
        .iter()
        .map(|i| IntegrationRow {
            name: i.name.clone(),
            kind: i.kind.to_string(),
            target: i.target.clone(),
            events: i
                .events
                .iter()
                .map(|e| e.key())
                .collect::<Vec<_>>()
                .join(","),
            enabled: if i.enabled { "yes" } else { "no" },
        })
        .collect();
    render(rows, "No integrations.")
}
