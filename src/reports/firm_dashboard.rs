//! Firm Dashboard Report
//!
//! One row per active client of an accounting firm with box counts and a
//! health score. The score starts at 100 and loses points for each box with
//! overdue WHT, each box waiting on documents and each overdue task.

use std::fmt;
use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::settings::HealthWeights;
use crate::error::TaxboxResult;
use crate::models::{missing_documents, BoxStatus, FirmId, OrganizationId, UserId};
use crate::services::FirmService;
use crate::storage::Storage;

/// Health band of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthLevel {
    Good,
    Warning,
    Critical,
}

impl HealthLevel {
    pub fn for_score(score: u32) -> Self {
        if score >= 80 {
            Self::Good
        } else if score >= 50 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// `max(0, 100 - weighted penalties)`
pub fn health_score(
    weights: &HealthWeights,
    overdue_wht: usize,
    pending_docs: usize,
    overdue_tasks: usize,
) -> u32 {
    let penalty = weights.overdue_wht as u64 * overdue_wht as u64
        + weights.pending_docs as u64 * pending_docs as u64
        + weights.overdue_tasks as u64 * overdue_tasks as u64;
    100u64.saturating_sub(penalty) as u32
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub pending: usize,
    pub need_docs: usize,
    pub completed: usize,
}

impl StatusCounts {
    fn add(&mut self, status: BoxStatus) {
        match status {
            BoxStatus::Draft => self.draft += 1,
            BoxStatus::Pending => self.pending += 1,
            BoxStatus::NeedDocs => self.need_docs += 1,
            BoxStatus::Completed => self.completed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.draft + self.pending + self.need_docs + self.completed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientHealth {
    pub organization_id: OrganizationId,
    pub name: String,
    pub assigned_accountant: Option<UserId>,
    pub boxes: StatusCounts,
    pub overdue_wht: usize,
    pub pending_docs: usize,
    pub overdue_tasks: usize,
    pub score: u32,
    pub level: HealthLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct FirmDashboardReport {
    pub firm_id: FirmId,
    pub firm_name: String,
    pub as_of: NaiveDate,
    /// Lowest score first
    pub clients: Vec<ClientHealth>,
}

impl FirmDashboardReport {
    /// Generate the dashboard as seen by `actor`, who must belong to the firm
    pub fn generate(
        storage: &Storage,
        actor: UserId,
        firm_id: FirmId,
        today: NaiveDate,
    ) -> TaxboxResult<Self> {
        let clients = FirmService::new(storage, actor).list_clients(firm_id)?;
        let firm_name = storage
            .firms
            .get(firm_id)?
            .map(|f| f.name)
            .unwrap_or_default();
        let settings = &storage.settings;

        let mut rows = Vec::new();
        for client in clients.into_iter().filter(|c| c.relation.is_active()) {
            let org_id = client.organization.id;
            let mut counts = StatusCounts::default();
            let mut overdue_wht = 0;
            let mut pending_docs = 0;

            for doc_box in storage.boxes.get_by_organization(org_id)? {
                counts.add(doc_box.status);
                if doc_box.is_wht_overdue(today, settings.wht_filing_day) {
                    overdue_wht += 1;
                }
                match doc_box.status {
                    BoxStatus::NeedDocs => pending_docs += 1,
                    BoxStatus::Draft => {}
                    _ => {
                        let documents = storage.documents.get_by_box(doc_box.id)?;
                        if !missing_documents(&doc_box, &documents).is_empty() {
                            pending_docs += 1;
                        }
                    }
                }
            }

            let overdue_tasks = storage
                .tasks
                .get_by_organization(org_id)?
                .iter()
                .filter(|t| t.is_overdue(today))
                .count();

            let score = health_score(&settings.health_weights, overdue_wht, pending_docs, overdue_tasks);
            rows.push(ClientHealth {
                organization_id: org_id,
                name: client.organization.name,
                assigned_accountant: client.relation.assigned_accountant,
                boxes: counts,
                overdue_wht,
                pending_docs,
                overdue_tasks,
                score,
                level: HealthLevel::for_score(score),
            });
        }

        rows.sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.name.cmp(&b.name)));
        tracing::debug!(firm = %firm_name, clients = rows.len(), "firm dashboard generated");

        Ok(Self {
            firm_id,
            firm_name,
            as_of: today,
            clients: rows,
        })
    }

    /// Clients at each level: (good, warning, critical)
    pub fn level_counts(&self) -> (usize, usize, usize) {
        let count = |level| self.clients.iter().filter(|c| c.level == level).count();
        (
            count(HealthLevel::Good),
            count(HealthLevel::Warning),
            count(HealthLevel::Critical),
        )
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Firm Dashboard: {} ({})\n", self.firm_name, self.as_of));
        output.push_str(&"=".repeat(86));
        output.push('\n');

        output.push_str(&format!(
            "{:<28} {:>6} {:>6} {:>6} {:>6} {:>8} {:>6} {:>6} {:>9}\n",
            "Client", "Draft", "Pend", "Docs", "Done", "WHT Late", "Miss", "Tasks", "Score"
        ));
        output.push_str(&"-".repeat(86));
        output.push('\n');

        for c in &self.clients {
            output.push_str(&format!(
                "{:<28} {:>6} {:>6} {:>6} {:>6} {:>8} {:>6} {:>6} {:>4} {:<8}\n",
                truncate(&c.name, 28),
                c.boxes.draft,
                c.boxes.pending,
                c.boxes.need_docs,
                c.boxes.completed,
                c.overdue_wht,
                c.pending_docs,
                c.overdue_tasks,
                c.score,
                c.level
            ));
        }

        let (good, warning, critical) = self.level_counts();
        output.push_str(&"-".repeat(86));
        output.push('\n');
        output.push_str(&format!(
            "{} clients: {} good, {} warning, {} critical\n",
            self.clients.len(),
            good,
            warning,
            critical
        ));
        output
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> TaxboxResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "Client",
            "Draft",
            "Pending",
            "Need Docs",
            "Completed",
            "Overdue WHT",
            "Pending Docs",
            "Overdue Tasks",
            "Score",
            "Level",
        ])?;
        for c in &self.clients {
            csv.write_record([
                c.name.clone(),
                c.boxes.draft.to_string(),
                c.boxes.pending.to_string(),
                c.boxes.need_docs.to_string(),
                c.boxes.completed.to_string(),
                c.overdue_wht.to_string(),
                c.pending_docs.to_string(),
                c.overdue_tasks.to_string(),
                c.score.to_string(),
                c.level.to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocType, FirmRole};
    use crate::services::testutil::{date, Fixture, FIRM_TAX_ID};
    use crate::services::{BoxService, DocumentService, NewTask, TaskService};

    #[test]
    fn test_health_score_and_levels() {
        let w = HealthWeights::default();
        assert_eq!(health_score(&w, 0, 0, 0), 100);
        assert_eq!(health_score(&w, 1, 1, 0), 80);
        assert_eq!(HealthLevel::for_score(80), HealthLevel::Good);
        assert_eq!(health_score(&w, 2, 2, 1), 50);
        assert_eq!(HealthLevel::for_score(50), HealthLevel::Warning);
        assert_eq!(HealthLevel::for_score(49), HealthLevel::Critical);
        assert_eq!(health_score(&w, 10, 0, 0), 0);
    }

    #[test]
    fn test_dashboard_counts_client_problems() {
        let fx = Fixture::new();
        let partner = fx.user("partner@firm.co.th");
        let firms = FirmService::new(&fx.storage, partner);
        let firm = firms.create_firm("Chao Phraya Accounting", FIRM_TAX_ID).unwrap();
        let relation = firms.request_client(firm.id, fx.org).unwrap();
        FirmService::new(&fx.storage, fx.owner)
            .accept_client(relation.id)
            .unwrap();

        // WHT box dated 2025-01-15 is due 2025-02-07; it is submitted without a certificate
        let wht_box = fx.expense_box(false, Some(300));
        DocumentService::new(&fx.storage, fx.owner)
            .attach_bytes(wht_box.id, DocType::Receipt, "r.pdf", b"%PDF")
            .unwrap();
        BoxService::new(&fx.storage, fx.owner).submit(wht_box.id).unwrap();

        let mut task = NewTask::new(fx.org, "Collect bank statement");
        task.due_date = Some(date(2025, 2, 1));
        TaskService::new(&fx.storage, fx.owner).create(task).unwrap();

        fx.expense_box(false, None);

        let report =
            FirmDashboardReport::generate(&fx.storage, partner, firm.id, date(2025, 2, 10)).unwrap();
        assert_eq!(report.clients.len(), 1);
        let client = &report.clients[0];
        assert_eq!(client.boxes.pending, 1);
        assert_eq!(client.boxes.draft, 1);
        assert_eq!(client.overdue_wht, 1);
        assert_eq!(client.pending_docs, 1);
        assert_eq!(client.overdue_tasks, 1);
        assert_eq!(client.score, 100 - 15 - 5 - 10);
        assert_eq!(client.level, HealthLevel::Warning);

        let text = report.format_terminal();
        assert!(text.contains("Siam Widgets"));

        let mut csv_out = Vec::new();
        report.export_csv(&mut csv_out).unwrap();
        assert!(String::from_utf8(csv_out).unwrap().contains("Siam Widgets,1,1,0,0,1,1,1,70,Warning"));
    }

    #[test]
    fn test_dashboard_skips_pending_relations_and_outsiders() {
        let fx = Fixture::new();
        let partner = fx.user("partner@firm.co.th");
        let firms = FirmService::new(&fx.storage, partner);
        let firm = firms.create_firm("Chao Phraya Accounting", FIRM_TAX_ID).unwrap();
        firms.request_client(firm.id, fx.org).unwrap();

        let report =
            FirmDashboardReport::generate(&fx.storage, partner, firm.id, date(2025, 2, 10)).unwrap();
        assert!(report.clients.is_empty());

        let outsider = fx.user("outsider@example.com");
        assert!(FirmDashboardReport::generate(&fx.storage, outsider, firm.id, date(2025, 2, 10))
            .unwrap_err()
            .is_permission_denied());

        let accountant = fx.user("acc@firm.co.th");
        firms
            .add_firm_member(firm.id, "acc@firm.co.th", FirmRole::Accountant)
            .unwrap();
        assert!(FirmDashboardReport::generate(&fx.storage, accountant, firm.id, date(2025, 2, 10)).is_ok());
    }
}
