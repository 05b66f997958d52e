//! Task service

use chrono::NaiveDate;

use crate::audit::EntityType;
use crate::error::{TaxboxError, TaxboxResult};
use crate::models::{BoxId, OrganizationId, Task, TaskId, TaskStatus, UserId};
use crate::storage::{AuditScope, Storage};

use super::access::{AccessService, Capability};

/// Input for a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub organization_id: OrganizationId,
    pub title: String,
    pub description: String,
    pub box_id: Option<BoxId>,
    pub assignee: Option<UserId>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(organization_id: OrganizationId, title: impl Into<String>) -> Self {
        Self {
            organization_id,
            title: title.into(),
            description: String::new(),
            box_id: None,
            assignee: None,
            due_date: None,
        }
    }
}

pub struct TaskService<'a> {
    storage: &'a Storage,
    actor: UserId,
}

impl<'a> TaskService<'a> {
    pub fn new(storage: &'a Storage, actor: UserId) -> Self {
        Self { storage, actor }
    }

    fn require(&self, organization_id: OrganizationId, capability: Capability) -> TaxboxResult<()> {
        AccessService::new(self.storage).require(self.actor, organization_id, capability)?;
        Ok(())
    }

    fn check_assignee(&self, organization_id: OrganizationId, user_id: UserId) -> TaxboxResult<()> {
        let role = AccessService::new(self.storage).effective_role(user_id, organization_id)?;
        if role.is_none() {
            return Err(TaxboxError::Validation(format!(
                "{} has no access to this organization",
                user_id
            )));
        }
        Ok(())
    }

    fn get(&self, id: TaskId, capability: Capability) -> TaxboxResult<Task> {
        let task = self
            .storage
            .tasks
            .get(id)?
            .ok_or_else(|| TaxboxError::task_not_found(id.to_string()))?;
        self.require(task.organization_id, capability)?;
        Ok(task)
    }

    fn persist(&self, before: &Task, task: &Task, diff: Option<String>) -> TaxboxResult<()> {
        self.storage.tasks.upsert(task.clone())?;
        self.storage.tasks.save()?;
        self.storage.log_update(
            AuditScope::new(self.actor).org(task.organization_id),
            EntityType::Task,
            task.id.to_string(),
            Some(task.title.clone()),
            before,
            task,
            diff,
        )
    }

    pub fn create(&self, input: NewTask) -> TaxboxResult<Task> {
        self.require(input.organization_id, Capability::Edit)?;
        if let Some(box_id) = input.box_id {
            let linked = self.storage.boxes.get(box_id)?;
            if !linked.is_some_and(|b| b.organization_id == input.organization_id) {
                return Err(TaxboxError::box_not_found(box_id.to_string()));
            }
        }
        if let Some(user_id) = input.assignee {
            self.check_assignee(input.organization_id, user_id)?;
        }

        let mut task = Task::new(input.organization_id, input.title, self.actor);
        task.description = input.description.trim().to_string();
        task.box_id = input.box_id;
        task.assignee = input.assignee;
        task.due_date = input.due_date;
        task.validate()
            .map_err(|e| TaxboxError::Validation(e.to_string()))?;

        self.storage.tasks.upsert(task.clone())?;
        self.storage.tasks.save()?;
        self.storage.log_create(
            AuditScope::new(self.actor).org(task.organization_id),
            EntityType::Task,
            task.id.to_string(),
            Some(task.title.clone()),
            &task,
        )?;
        tracing::debug!(task = %task.id, "task created");
        Ok(task)
    }

    pub fn assign(&self, id: TaskId, assignee: Option<UserId>) -> TaxboxResult<Task> {
        let mut task = self.get(id, Capability::Edit)?;
        if let Some(user_id) = assignee {
            self.check_assignee(task.organization_id, user_id)?;
        }
        let before = task.clone();
        task.assignee = assignee;
        self.persist(&before, &task, None)?;
        Ok(task)
    }

    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> TaxboxResult<Task> {
        let mut task = self.get(id, Capability::Edit)?;
        let before = task.clone();
        task.set_status(status);
        self.persist(
            &before,
            &task,
            Some(format!("status: {} -> {}", before.status, task.status)),
        )?;
        Ok(task)
    }

    /// Tasks of an organization, soonest due first; undated tasks last
    pub fn list(
        &self,
        organization_id: OrganizationId,
        overdue_only: bool,
        today: NaiveDate,
    ) -> TaxboxResult<Vec<Task>> {
        self.require(organization_id, Capability::View)?;
        Ok(self
            .storage
            .tasks
            .get_by_organization(organization_id)?
            .into_iter()
            .filter(|t| !overdue_only || t.is_overdue(today))
            .collect())
    }

    /// Find a task of an organization by full or short ID
    pub fn find(&self, organization_id: OrganizationId, identifier: &str) -> TaxboxResult<Task> {
        if let Ok(id) = identifier.parse::<TaskId>() {
            return self.get(id, Capability::View);
        }
        self.require(organization_id, Capability::View)?;
        self.storage
            .tasks
            .get_by_organization(organization_id)?
            .into_iter()
            .find(|t| t.id.matches_short(identifier))
            .ok_or_else(|| TaxboxError::task_not_found(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::{date, Fixture};

    #[test]
    fn test_create_and_complete() {
        let fx = Fixture::new();
        let svc = TaskService::new(&fx.storage, fx.owner);
        let task = svc.create(NewTask::new(fx.org, "Chase tax invoice")).unwrap();
        assert_eq!(task.status, TaskStatus::Open);

        let done = svc.set_status(task.id, TaskStatus::Done).unwrap();
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_overdue_filter_and_order() {
        let fx = Fixture::new();
        let svc = TaskService::new(&fx.storage, fx.owner);

        let mut late = NewTask::new(fx.org, "File PND53");
        late.due_date = Some(date(2025, 2, 7));
        let late = svc.create(late).unwrap();
        svc.create(NewTask::new(fx.org, "Someday")).unwrap();
        let mut soon = NewTask::new(fx.org, "File PP30");
        soon.due_date = Some(date(2025, 3, 15));
        svc.create(soon).unwrap();

        let today = date(2025, 3, 1);
        let all = svc.list(fx.org, false, today).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "File PND53");
        assert_eq!(all[2].title, "Someday");

        let overdue = svc.list(fx.org, true, today).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);
    }

    #[test]
    fn test_assignee_must_have_access() {
        let fx = Fixture::new();
        let outsider = fx.user("outsider@example.com");
        let svc = TaskService::new(&fx.storage, fx.owner);
        let task = svc.create(NewTask::new(fx.org, "Review")).unwrap();
        assert!(svc.assign(task.id, Some(outsider)).unwrap_err().is_validation());
        assert_eq!(svc.assign(task.id, Some(fx.owner)).unwrap().assignee, Some(fx.owner));
    }

    #[test]
    fn test_task_linked_to_box_is_unlinked_on_delete() {
        let fx = Fixture::new();
        let doc_box = fx.expense_box(false, None);
        let mut input = NewTask::new(fx.org, "Get receipt");
        input.box_id = Some(doc_box.id);
        let task = TaskService::new(&fx.storage, fx.owner).create(input).unwrap();

        crate::services::BoxService::new(&fx.storage, fx.owner)
            .delete(doc_box.id)
            .unwrap();
        assert!(fx.storage.tasks.get(task.id).unwrap().unwrap().box_id.is_none());
    }
}
