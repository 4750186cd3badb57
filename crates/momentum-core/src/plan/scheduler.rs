//! Plan-task lifecycle: creation, edits, completion and rescheduling.
//!
//! Every mutation builds the new task value first, writes it to the store,
//! and only then replaces the in-memory copy. A failed write leaves the
//! collection untouched.

use chrono::{DateTime, NaiveDate, Utc};

use std::collections::HashSet;

use super::{
    derive_milestone_status, AiDetails, MilestoneStatus, NewTask, PlanStore, PlanTask,
    StoredTaskCompletion, TaskPatch,
};
use crate::completion::{RawCompletion, TaskCompletion};
use crate::error::{NotFoundError, Result, ValidationError};

/// Result of a mutation that may affect completion state.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskChange {
    pub task: PlanTask,
    /// Completion record for the event source, if `completed` flipped.
    pub emitted: Option<RawCompletion>,
    /// Name of a milestone whose tasks just became all complete.
    pub milestone_completed: Option<String>,
}

pub struct PlanScheduler<S> {
    store: S,
    tasks: Vec<PlanTask>,
}

impl<S: PlanStore> PlanScheduler<S> {
    /// Load the current task list from the store.
    pub fn load(store: S) -> Result<Self> {
        let tasks = store.list_tasks()?;
        tracing::debug!(count = tasks.len(), "plan tasks loaded");
        Ok(Self { store, tasks })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[PlanTask] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&PlanTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// `None` if no task references the milestone.
    pub fn milestone_status(&self, milestone: &str) -> Option<MilestoneStatus> {
        let linked: Vec<&PlanTask> = self.linked_tasks(milestone).collect();
        if linked.is_empty() {
            None
        } else {
            Some(derive_milestone_status(linked))
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn create_task(&mut self, fields: NewTask, now: DateTime<Utc>) -> Result<PlanTask> {
        let title = non_blank_title(&fields.title)?;
        let mut task = PlanTask::new(title, now);
        task.description = fields.description.unwrap_or_default();
        task.planned_date = fields.planned_date;
        task.completed = fields.completed.unwrap_or(false);
        task.milestone_ref = fields.milestone_ref;

        self.store.create_task(&task)?;
        tracing::info!(id = %task.id, title = %task.title, "plan task created");
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch, now: DateTime<Utc>) -> Result<TaskChange> {
        let index = self.index_of(id)?;
        let current = &self.tasks[index];
        let mut next = current.clone();

        if let Some(title) = patch.title {
            next.title = non_blank_title(&title)?.to_string();
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(completed) = patch.completed {
            next.completed = completed;
        }
        if let Some(planned_date) = patch.planned_date {
            next.planned_date = planned_date;
        }
        if next == *current {
            return Ok(TaskChange {
                task: next,
                emitted: None,
                milestone_completed: None,
            });
        }
        next.updated_at = now;
        self.commit(index, next)
    }

    /// Flip `completed` and emit the matching completion record.
    pub fn toggle_completion(&mut self, id: &str, now: DateTime<Utc>) -> Result<TaskChange> {
        let index = self.index_of(id)?;
        let mut next = self.tasks[index].clone();
        next.completed = !next.completed;
        next.updated_at = now;
        self.commit(index, next)
    }

    /// Set or clear the planned date. Emits nothing.
    pub fn reschedule(
        &mut self,
        id: &str,
        planned_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<PlanTask> {
        let index = self.index_of(id)?;
        let mut next = self.tasks[index].clone();
        if next.planned_date == planned_date {
            return Ok(next);
        }
        next.planned_date = planned_date;
        next.updated_at = now;
        Ok(self.commit(index, next)?.task)
    }

    /// One unscheduled task per milestone not already seeded.
    ///
    /// Imported state: no completion records are emitted. A plan naming the
    /// same milestone twice is rejected before anything is stored.
    pub fn seed_from_plan(&mut self, plan: &AiDetails, now: DateTime<Utc>) -> Result<Vec<PlanTask>> {
        let mut names = HashSet::new();
        for milestone in &plan.milestones {
            let name = non_blank_title(&milestone.name)?;
            if !names.insert(name) {
                return Err(ValidationError::InvalidValue {
                    field: "milestones".into(),
                    message: format!("duplicate milestone '{name}'"),
                }
                .into());
            }
        }

        let mut seeded: Vec<PlanTask> = Vec::new();
        for milestone in &plan.milestones {
            let name = non_blank_title(&milestone.name)?;
            if self.linked_tasks(name).next().is_some() {
                tracing::debug!(milestone = %name, "milestone already seeded");
                continue;
            }
            let mut task = PlanTask::new(name, now);
            task.completed = milestone.status == MilestoneStatus::Done;
            task.milestone_ref = Some(name.to_string());
            seeded.push(task);
        }

        if !seeded.is_empty() {
            self.store.create_tasks(&seeded)?;
            tracing::info!(count = seeded.len(), "plan tasks seeded from milestones");
            self.tasks.extend(seeded.iter().cloned());
        }
        Ok(seeded)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn index_of(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| NotFoundError::Task(id.to_string()).into())
    }

    fn linked_tasks<'a>(&'a self, milestone: &'a str) -> impl Iterator<Item = &'a PlanTask> + 'a {
        self.tasks
            .iter()
            .filter(move |t| t.milestone_ref.as_deref() == Some(milestone))
    }

    fn commit(&mut self, index: usize, next: PlanTask) -> Result<TaskChange> {
        if self.tasks[index].completed != next.completed {
            let flip = StoredTaskCompletion {
                task_id: next.id.clone(),
                completed: next.completed,
                recorded_at: next.updated_at,
            };
            self.store.update_task_completion(&next, &flip)?;
        } else {
            self.store.update_task(&next)?;
        }

        let previous = std::mem::replace(&mut self.tasks[index], next);
        let task = self.tasks[index].clone();
        tracing::info!(id = %task.id, completed = task.completed, "plan task updated");

        let emitted = (previous.completed != task.completed).then(|| {
            RawCompletion::Task(TaskCompletion {
                id: task.id.clone(),
                status: None,
                completed: Some(task.completed),
                points: None,
            })
        });

        let milestone_completed = match (&task.milestone_ref, task.completed, &emitted) {
            (Some(milestone), true, Some(_))
                if self.milestone_status(milestone) == Some(MilestoneStatus::Done) =>
            {
                Some(milestone.clone())
            }
            _ => None,
        };

        Ok(TaskChange {
            task,
            emitted,
            milestone_completed,
        })
    }
}

fn non_blank_title(title: &str) -> Result<&str, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField {
            field: "title".into(),
        })
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::plan::{Milestone, MemoryPlanStore};
    use std::sync::atomic::Ordering;

    fn scheduler() -> PlanScheduler<MemoryPlanStore> {
        PlanScheduler::load(MemoryPlanStore::new()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn create_task_applies_defaults() {
        let mut s = scheduler();
        let task = s.create_task(NewTask::titled("Write pitch deck"), Utc::now()).unwrap();
        assert_eq!(task.title, "Write pitch deck");
        assert_eq!(task.description, "");
        assert_eq!(task.planned_date, None);
        assert!(!task.completed);
        assert_eq!(s.store().list_tasks().unwrap(), vec![task]);
    }

    #[test]
    fn create_task_requires_title() {
        let mut s = scheduler();
        let err = s.create_task(NewTask::titled("   "), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyField { .. })));
        assert!(s.tasks().is_empty());
    }

    #[test]
    fn update_applies_only_given_fields() {
        let mut s = scheduler();
        let task = s
            .create_task(
                NewTask {
                    title: "Draft budget".into(),
                    description: Some("numbers".into()),
                    planned_date: Some(date(2026, 11, 1)),
                    ..NewTask::default()
                },
                Utc::now(),
            )
            .unwrap();

        let patch = TaskPatch {
            title: Some("Draft Q1 budget".into()),
            ..TaskPatch::default()
        };
        let change = s.update_task(&task.id, patch, Utc::now()).unwrap();
        assert_eq!(change.task.title, "Draft Q1 budget");
        assert_eq!(change.task.description, "numbers");
        assert_eq!(change.task.planned_date, Some(date(2026, 11, 1)));
        assert_eq!(change.emitted, None);
    }

    #[test]
    fn explicit_null_unschedules_and_empty_patch_keeps_it() {
        let mut s = scheduler();
        let task = s
            .create_task(
                NewTask {
                    title: "Call supplier".into(),
                    planned_date: Some(date(2026, 10, 20)),
                    ..NewTask::default()
                },
                Utc::now(),
            )
            .unwrap();

        let cleared = TaskPatch {
            planned_date: Some(None),
            ..TaskPatch::default()
        };
        s.update_task(&task.id, cleared, Utc::now()).unwrap();
        let change = s.update_task(&task.id, TaskPatch::default(), Utc::now()).unwrap();
        assert_eq!(change.task.planned_date, None);
        assert_eq!(s.get(&task.id).unwrap().planned_date, None);
    }

    #[test]
    fn update_unknown_task_is_not_found() {
        let mut s = scheduler();
        let err = s.update_task("missing", TaskPatch::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(NotFoundError::Task(_))));
    }

    #[test]
    fn toggle_emits_positive_then_corrective() {
        let mut s = scheduler();
        let task = s.create_task(NewTask::titled("Ship"), Utc::now()).unwrap();

        let done = s.toggle_completion(&task.id, Utc::now()).unwrap();
        assert!(done.task.completed);
        match done.emitted {
            Some(RawCompletion::Task(ref t)) => assert_eq!(t.completed, Some(true)),
            ref other => panic!("unexpected emission: {other:?}"),
        }

        let undone = s.toggle_completion(&task.id, Utc::now()).unwrap();
        assert!(!undone.task.completed);
        match undone.emitted {
            Some(RawCompletion::Task(ref t)) => assert_eq!(t.completed, Some(false)),
            ref other => panic!("unexpected emission: {other:?}"),
        }
    }

    #[test]
    fn completed_with_future_date_is_legal() {
        let mut s = scheduler();
        let task = s
            .create_task(
                NewTask {
                    title: "Register domain".into(),
                    planned_date: Some(date(2099, 1, 1)),
                    ..NewTask::default()
                },
                Utc::now(),
            )
            .unwrap();
        let change = s.toggle_completion(&task.id, Utc::now()).unwrap();
        assert!(change.task.completed);
        assert_eq!(change.task.planned_date, Some(date(2099, 1, 1)));
    }

    #[test]
    fn reschedule_does_not_emit() {
        let mut s = scheduler();
        let task = s.create_task(NewTask::titled("Pitch investors"), Utc::now()).unwrap();
        let moved = s.reschedule(&task.id, Some(date(2026, 12, 5)), Utc::now()).unwrap();
        assert_eq!(moved.planned_date, Some(date(2026, 12, 5)));
        let cleared = s.reschedule(&task.id, None, Utc::now()).unwrap();
        assert!(!cleared.is_scheduled());
    }

    #[test]
    fn failed_write_leaves_collection_unchanged() {
        let mut s = scheduler();
        let task = s.create_task(NewTask::titled("Hire designer"), Utc::now()).unwrap();
        s.store().fail_switch().store(true, Ordering::SeqCst);

        let err = s.toggle_completion(&task.id, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Collaborator(_)));
        assert_eq!(s.get(&task.id).unwrap(), &task);

        assert!(s.create_task(NewTask::titled("Another"), Utc::now()).is_err());
        assert_eq!(s.tasks().len(), 1);
    }

    #[test]
    fn seeding_maps_each_milestone_once() {
        let mut s = scheduler();
        let plan = AiDetails {
            milestones: vec![
                Milestone {
                    name: "Launch MVP".into(),
                    status: MilestoneStatus::Pending,
                },
                Milestone {
                    name: "Validate idea".into(),
                    status: MilestoneStatus::Done,
                },
            ],
            ..AiDetails::default()
        };

        let seeded = s.seed_from_plan(&plan, Utc::now()).unwrap();
        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded[0].title, "Launch MVP");
        assert!(!seeded[0].completed);
        assert_eq!(seeded[0].planned_date, None);
        assert!(seeded[1].completed);

        assert!(s.seed_from_plan(&plan, Utc::now()).unwrap().is_empty());
        assert_eq!(s.tasks().len(), 2);
    }

    #[test]
    fn seeding_rejects_duplicate_milestone_names() {
        let mut s = scheduler();
        let milestone = Milestone {
            name: "Launch MVP".into(),
            status: MilestoneStatus::Pending,
        };
        let plan = AiDetails {
            milestones: vec![milestone.clone(), milestone],
            ..AiDetails::default()
        };

        let err = s.seed_from_plan(&plan, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidValue { .. })));
        assert!(s.tasks().is_empty());
        assert!(s.store().list_tasks().unwrap().is_empty());
    }

    #[test]
    fn only_completion_flips_are_logged() {
        let mut s = scheduler();
        let plan = AiDetails {
            milestones: vec![Milestone {
                name: "Validate idea".into(),
                status: MilestoneStatus::Done,
            }],
            ..AiDetails::default()
        };
        s.seed_from_plan(&plan, Utc::now()).unwrap();
        let task = s
            .create_task(
                NewTask {
                    title: "Already done".into(),
                    completed: Some(true),
                    ..NewTask::default()
                },
                Utc::now(),
            )
            .unwrap();
        s.reschedule(&task.id, Some(date(2026, 12, 1)), Utc::now()).unwrap();
        assert!(s.store().list_task_completions().unwrap().is_empty());

        s.toggle_completion(&task.id, Utc::now()).unwrap();
        let log = s.store().list_task_completions().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].task_id, task.id);
        assert!(!log[0].completed);
    }

    #[test]
    fn completing_last_task_completes_milestone() {
        let mut s = scheduler();
        let mut ids = Vec::new();
        for title in ["Design", "Build"] {
            let task = s
                .create_task(
                    NewTask {
                        title: title.into(),
                        milestone_ref: Some("Launch MVP".into()),
                        ..NewTask::default()
                    },
                    Utc::now(),
                )
                .unwrap();
            ids.push(task.id);
        }

        let first = s.toggle_completion(&ids[0], Utc::now()).unwrap();
        assert_eq!(first.milestone_completed, None);
        assert_eq!(s.milestone_status("Launch MVP"), Some(MilestoneStatus::InProgress));

        let second = s.toggle_completion(&ids[1], Utc::now()).unwrap();
        assert_eq!(second.milestone_completed.as_deref(), Some("Launch MVP"));
        assert_eq!(s.milestone_status("Launch MVP"), Some(MilestoneStatus::Done));
        assert_eq!(s.milestone_status("Unknown"), None);
    }
}
