//! Task CLI commands

use chrono::Local;
use clap::Subcommand;

use crate::display::format_tasks;
use crate::error::TaxboxResult;
use crate::models::{NotificationEvent, Task, TaskStatus, User};
use crate::services::{NewTask, OrganizationService, TaskService};

use super::boxes::resolve_box;
use super::context::{parse_choice, parse_date, CliContext, Outcome};

/// Task subcommands
#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Box number or ID the task is about
        #[arg(short, long = "box")]
        box_ref: Option<String>,
        /// Assignee e-mail
        #[arg(short, long)]
        assignee: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks
    List {
        /// Only tasks past their due date
        #[arg(long)]
        overdue: bool,
    },
    /// Hand a task to a user, or clear the assignee
    Assign {
        /// Task ID
        task: String,
        /// User e-mail; omit to unassign
        email: Option<String>,
    },
    /// Change a task's status (open, in_progress, done, cancelled)
    Status {
        /// Task ID
        task: String,
        status: String,
    },
}

fn assigned_notice(outcome: Outcome, task: &Task, user: Option<&User>) -> Outcome {
    match user {
        Some(user) => outcome.notify(
            task.organization_id,
            NotificationEvent::TaskAssigned,
            format!("{} assigned to {}", task.title, user.email),
        ),
        None => outcome,
    }
}

pub fn handle_task_command(ctx: &CliContext<'_>, cmd: TaskCommands) -> TaxboxResult<Outcome> {
    let service = TaskService::new(ctx.storage, ctx.actor()?);
    let org = ctx.organization_id()?;

    match cmd {
        TaskCommands::Add {
            title,
            description,
            box_ref,
            assignee,
            due,
        } => {
            let assignee = match assignee.as_deref() {
                Some(e) => Some(OrganizationService::find_user(ctx.storage, e)?),
                None => None,
            };
            let mut input = NewTask::new(org, title);
            input.description = description;
            input.box_id = match box_ref.as_deref() {
                Some(b) => Some(resolve_box(ctx, b)?.id),
                None => None,
            };
            input.assignee = assignee.as_ref().map(|u| u.id);
            input.due_date = due.as_deref().map(parse_date).transpose()?;

            let task = service.create(input)?;
            let outcome = Outcome::text(format!("Created task: {}\n  ID: {}\n", task.title, task.id))
                .with_data(&task)?;
            Ok(assigned_notice(outcome, &task, assignee.as_ref()))
        }

        TaskCommands::List { overdue } => {
            let today = Local::now().date_naive();
            let tasks = service.list(org, overdue, today)?;
            let storage = ctx.storage;
            let names = |t: &Task| {
                t.assignee
                    .and_then(|id| storage.users.get(id).ok().flatten())
                    .map(|u| u.email)
            };
            Outcome::text(format_tasks(&tasks, &names)).with_data(&tasks)
        }

        TaskCommands::Assign { task, email } => {
            let found = service.find(org, &task)?;
            let assignee = match email.as_deref() {
                Some(e) => Some(OrganizationService::find_user(ctx.storage, e)?),
                None => None,
            };
            let task = service.assign(found.id, assignee.as_ref().map(|u| u.id))?;
            let text = match &assignee {
                Some(user) => format!("Assigned {} to {}\n", task.title, user.email),
                None => format!("Cleared assignee of {}\n", task.title),
            };
            let outcome = Outcome::text(text).with_data(&task)?;
            Ok(assigned_notice(outcome, &task, assignee.as_ref()))
        }

        TaskCommands::Status { task, status } => {
            let found = service.find(org, &task)?;
            let status = parse_choice(
                &status,
                "status",
                "open, in_progress, done, cancelled",
                TaskStatus::parse,
            )?;
            let task = service.set_status(found.id, status)?;
            Outcome::text(format!("{} is now {}\n", task.title, task.status)).with_data(&task)
        }
    }
}
