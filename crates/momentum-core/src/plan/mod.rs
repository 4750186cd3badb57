//! Business-plan tasks and milestones.
//!
//! Tasks are created by the plan generator (seeded from milestones) or by
//! the user, and carry an optional planned date. `planned_date: None`
//! means "unscheduled".

mod scheduler;
mod store;

pub use scheduler::{PlanScheduler, TaskChange};
pub use store::{MemoryPlanStore, PlanStore, StoredHabitCompletion, StoredTaskCompletion};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Milestones are referenced by name.
pub type MilestoneId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_ref: Option<MilestoneId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanTask {
    /// Create a new task with default values and a fresh id.
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            planned_date: None,
            completed: false,
            milestone_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.planned_date.is_some()
    }
}

/// Fields for [`PlanScheduler::create_task`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub milestone_ref: Option<MilestoneId>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial edit. `None` leaves a field unchanged.
///
/// `planned_date` has three states: omitted (`None`), explicit `null`
/// (`Some(None)`, unschedule) and a date (`Some(Some(d))`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub planned_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.planned_date.is_none()
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    #[serde(alias = "in_progress", alias = "in progress", alias = "inprogress")]
    InProgress,
    #[serde(alias = "completed")]
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Status")]
    pub status: MilestoneStatus,
}

/// The generated plan aggregate. Only `milestones` drives seeding; the
/// rest is carried for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiDetails {
    #[serde(default, alias = "ProjectType")]
    pub project_type: String,
    #[serde(default, alias = "RevenueModel")]
    pub revenue_model: String,
    #[serde(default, alias = "Budget")]
    pub budget: String,
    #[serde(default, alias = "Timeline")]
    pub timeline: String,
    #[serde(default, alias = "Milestones")]
    pub milestones: Vec<Milestone>,
}

impl AiDetails {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Status of a milestone from the completion of its tasks.
pub fn derive_milestone_status<'a>(tasks: impl IntoIterator<Item = &'a PlanTask>) -> MilestoneStatus {
    let (mut total, mut done) = (0usize, 0usize);
    for task in tasks {
        total += 1;
        if task.completed {
            done += 1;
        }
    }
    match done {
        0 => MilestoneStatus::Pending,
        d if d == total => MilestoneStatus::Done,
        _ => MilestoneStatus::InProgress,
    }
}
