//! Task repository, persisted to tasks.json

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TaxboxError;
use crate::models::{BoxId, OrganizationId, Task, TaskId};

use super::file_io::{read_json, write_json_atomic};
use super::table::{Keyed, Table};

impl Keyed for Task {
    type Key = TaskId;

    fn key(&self) -> TaskId {
        self.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskData {
    tasks: Vec<Task>,
}

pub struct TaskRepository {
    path: PathBuf,
    tasks: Table<Task>,
}

impl TaskRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            tasks: Table::new(),
        }
    }

    pub fn load(&self) -> Result<(), TaxboxError> {
        let file_data: TaskData = read_json(&self.path)?;
        self.tasks.replace_all(file_data.tasks)
    }

    pub fn save(&self) -> Result<(), TaxboxError> {
        let tasks = self.tasks.sorted_by_key(|t| t.created_at)?;
        write_json_atomic(&self.path, &TaskData { tasks })
    }

    pub fn get(&self, id: TaskId) -> Result<Option<Task>, TaxboxError> {
        self.tasks.get(id)
    }

    /// Tasks of an organization, soonest due first, undated last
    pub fn get_by_organization(&self, organization_id: OrganizationId) -> Result<Vec<Task>, TaxboxError> {
        let mut tasks = self.tasks.filter(|t| t.organization_id == organization_id)?;
        tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date, t.created_at));
        Ok(tasks)
    }

    pub fn upsert(&self, task: Task) -> Result<(), TaxboxError> {
        self.tasks.upsert(task)
    }

    /// Detach tasks from a deleted box
    pub fn unlink_box(&self, box_id: BoxId) -> Result<usize, TaxboxError> {
        let linked = self.tasks.filter(|t| t.box_id == Some(box_id))?;
        let count = linked.len();
        for mut task in linked {
            task.box_id = None;
            self.tasks.upsert(task)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_ordering_and_unlink() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TaskRepository::new(temp_dir.path().join("tasks.json"));
        let org = OrganizationId::new();
        let box_id = BoxId::new();

        let mut undated = Task::new(org, "Undated", UserId::new());
        undated.box_id = Some(box_id);
        let mut soon = Task::new(org, "Soon", UserId::new());
        soon.due_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        repo.upsert(undated).unwrap();
        repo.upsert(soon).unwrap();

        let titles: Vec<_> = repo
            .get_by_organization(org)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Soon", "Undated"]);

        assert_eq!(repo.unlink_box(box_id).unwrap(), 1);
        assert!(repo
            .get_by_organization(org)
            .unwrap()
            .iter()
            .all(|t| t.box_id.is_none()));
    }
}
