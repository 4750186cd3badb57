//! Persistence collaborator for plan tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::PlanTask;
use crate::character::CharacterProfile;
use crate::completion::HabitCompletion;
use crate::error::CollaboratorError;

/// A habit check-off as kept by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredHabitCompletion {
    pub record: HabitCompletion,
    pub recorded_at: DateTime<Utc>,
}

/// A task completion flip made through the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTaskCompletion {
    pub task_id: String,
    pub completed: bool,
    pub recorded_at: DateTime<Utc>,
}

/// External store for plan tasks and the records completion events are
/// derived from.
///
/// Failures are returned verbatim; the engine never retries.
pub trait PlanStore {
    fn create_task(&mut self, task: &PlanTask) -> Result<(), CollaboratorError>;

    /// Create several tasks at once. Either all are stored or none.
    fn create_tasks(&mut self, tasks: &[PlanTask]) -> Result<(), CollaboratorError> {
        for task in tasks {
            self.create_task(task)?;
        }
        Ok(())
    }

    fn update_task(&mut self, task: &PlanTask) -> Result<(), CollaboratorError>;

    /// Update a task whose `completed` flag flipped and log the flip.
    /// Either both are stored or neither.
    fn update_task_completion(
        &mut self,
        task: &PlanTask,
        completion: &StoredTaskCompletion,
    ) -> Result<(), CollaboratorError> {
        self.update_task(task)?;
        self.record_task_completion(completion)
    }

    fn record_task_completion(
        &mut self,
        completion: &StoredTaskCompletion,
    ) -> Result<(), CollaboratorError>;

    /// All logged task flips, oldest first.
    fn list_task_completions(&self) -> Result<Vec<StoredTaskCompletion>, CollaboratorError>;

    /// All tasks in creation order.
    fn list_tasks(&self) -> Result<Vec<PlanTask>, CollaboratorError>;

    fn record_habit_completion(
        &mut self,
        completion: &StoredHabitCompletion,
    ) -> Result<(), CollaboratorError>;

    /// All habit check-offs, oldest first.
    fn list_habit_completions(&self) -> Result<Vec<StoredHabitCompletion>, CollaboratorError>;

    fn load_profile(&self) -> Result<Option<CharacterProfile>, CollaboratorError> {
        Ok(None)
    }

    fn save_profile(&mut self, _profile: &CharacterProfile) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// In-process store. Writes can be made to fail through [`fail_switch`](Self::fail_switch).
#[derive(Debug, Clone, Default)]
pub struct MemoryPlanStore {
    tasks: Vec<PlanTask>,
    habits: Vec<StoredHabitCompletion>,
    task_completions: Vec<StoredTaskCompletion>,
    profile: Option<CharacterProfile>,
    failing: Arc<AtomicBool>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<PlanTask>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    /// Shared flag; while `true` every write fails with `Unavailable`.
    pub fn fail_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failing)
    }

    fn check_writable(&self) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CollaboratorError::Unavailable {
                service: "memory-store".into(),
                message: "writes disabled".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl PlanStore for MemoryPlanStore {
    fn create_task(&mut self, task: &PlanTask) -> Result<(), CollaboratorError> {
        self.check_writable()?;
        self.tasks.push(task.clone());
        Ok(())
    }

    fn create_tasks(&mut self, tasks: &[PlanTask]) -> Result<(), CollaboratorError> {
        self.check_writable()?;
        self.tasks.extend_from_slice(tasks);
        Ok(())
    }

    fn update_task(&mut self, task: &PlanTask) -> Result<(), CollaboratorError> {
        self.check_writable()?;
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(())
            }
            None => Err(CollaboratorError::Unavailable {
                service: "memory-store".into(),
                message: format!("no stored task '{}'", task.id),
            }),
        }
    }

    fn update_task_completion(
        &mut self,
        task: &PlanTask,
        completion: &StoredTaskCompletion,
    ) -> Result<(), CollaboratorError> {
        self.check_writable()?;
        self.update_task(task)?;
        self.task_completions.push(completion.clone());
        Ok(())
    }

    fn record_task_completion(
        &mut self,
        completion: &StoredTaskCompletion,
    ) -> Result<(), CollaboratorError> {
        self.check_writable()?;
        self.task_completions.push(completion.clone());
        Ok(())
    }

    fn list_task_completions(&self) -> Result<Vec<StoredTaskCompletion>, CollaboratorError> {
        Ok(self.task_completions.clone())
    }

    fn list_tasks(&self) -> Result<Vec<PlanTask>, CollaboratorError> {
        Ok(self.tasks.clone())
    }

    fn record_habit_completion(
        &mut self,
        completion: &StoredHabitCompletion,
    ) -> Result<(), CollaboratorError> {
        self.check_writable()?;
        self.habits.push(completion.clone());
        Ok(())
    }

    fn list_habit_completions(&self) -> Result<Vec<StoredHabitCompletion>, CollaboratorError> {
        Ok(self.habits.clone())
    }

    fn load_profile(&self) -> Result<Option<CharacterProfile>, CollaboratorError> {
        Ok(self.profile)
    }

    fn save_profile(&mut self, profile: &CharacterProfile) -> Result<(), CollaboratorError> {
        self.check_writable()?;
        self.profile = Some(*profile);
        Ok(())
    }
}
