//! Completion event source.
//!
//! Normalizes habit check-offs and task submissions into a single
//! [`CompletionEvent`] shape. Normalization is a pure transform: it either
//! yields a complete event or a [`ValidationError`], never something in
//! between.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Where a completion signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Habit,
    Task,
}

/// A normalized positive or negative completion signal.
///
/// Fields are private; once built an event cannot be changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    source_kind: SourceKind,
    source_id: String,
    occurred_at: DateTime<Utc>,
    positive: bool,
    weight: f64,
}

impl CompletionEvent {
    fn new(
        source_kind: SourceKind,
        source_id: impl Into<String>,
        positive: bool,
        weight: f64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_kind,
            source_id: source_id.into(),
            occurred_at,
            positive,
            weight,
        }
    }

    /// Binary habit signal, always weight 1.
    pub fn habit(habit_id: impl Into<String>, completed: bool, at: DateTime<Utc>) -> Self {
        Self::new(SourceKind::Habit, habit_id, completed, 1.0, at)
    }

    /// Task signal. Non-positive or non-finite weights fall back to 1.
    pub fn task(task_id: impl Into<String>, positive: bool, weight: f64, at: DateTime<Utc>) -> Self {
        let weight = if weight.is_finite() && weight > 0.0 { weight } else { 1.0 };
        Self::new(SourceKind::Task, task_id, positive, weight, at)
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn positive(&self) -> bool {
        self.positive
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// True if both events refer to the same habit or task.
    pub fn same_source(&self, other: &CompletionEvent) -> bool {
        self.source_kind == other.source_kind && self.source_id == other.source_id
    }
}

/// Submission status carried by task records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Completed,
}

/// Inbound habit check-off: `{habitId, completed, notes?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitCompletion {
    pub habit_id: String,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Inbound task or submission record: `{id|taskId, status?, completed?, points?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    #[serde(alias = "taskId")]
    pub id: String,
    #[serde(default)]
    pub status: Option<SubmissionStatus>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub points: Option<f64>,
}

/// A raw completion record from either boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawCompletion {
    Habit(HabitCompletion),
    Task(TaskCompletion),
}

impl RawCompletion {
    /// Classify an inbound JSON record by the identifier it carries.
    ///
    /// `habitId` selects the habit shape; `taskId` or `id` select the task
    /// shape. A record with none of them is rejected before any field
    /// parsing happens.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let has = |key: &str| value.get(key).is_some_and(|v| !v.is_null());
        let invalid = |err: serde_json::Error| ValidationError::InvalidValue {
            field: "record".into(),
            message: err.to_string(),
        };

        if has("habitId") {
            serde_json::from_value(value).map(RawCompletion::Habit).map_err(invalid)
        } else if has("taskId") || has("id") {
            serde_json::from_value(value).map(RawCompletion::Task).map_err(invalid)
        } else {
            Err(ValidationError::MissingIdentifier)
        }
    }
}

/// Normalize a raw record into at most one event.
///
/// A task record that is only `status: "pending"` has not been submitted
/// yet and yields `Ok(None)`.
pub fn normalize(
    raw: &RawCompletion,
    at: DateTime<Utc>,
) -> Result<Option<CompletionEvent>, ValidationError> {
    match raw {
        RawCompletion::Habit(habit) => {
            let id = require_id(&habit.habit_id)?;
            let completed = habit
                .completed
                .ok_or_else(|| ValidationError::MissingCompletionState { id: id.to_string() })?;
            Ok(Some(CompletionEvent::habit(id, completed, at)))
        }
        RawCompletion::Task(task) => {
            let id = require_id(&task.id)?;
            let positive = match (task.completed, task.status) {
                (Some(completed), _) => completed,
                (None, Some(SubmissionStatus::Completed)) => true,
                (None, Some(SubmissionStatus::Pending)) => return Ok(None),
                (None, None) => {
                    return Err(ValidationError::MissingCompletionState { id: id.to_string() })
                }
            };
            let weight = match task.points {
                Some(points) if !points.is_finite() || points < 0.0 => {
                    return Err(ValidationError::InvalidValue {
                        field: "points".into(),
                        message: format!("expected a non-negative number, got {points}"),
                    })
                }
                Some(points) if points > 0.0 => points,
                _ => 1.0,
            };
            Ok(Some(CompletionEvent::task(id, positive, weight, at)))
        }
    }
}

fn require_id(id: &str) -> Result<&str, ValidationError> {
    let id = id.trim();
    if id.is_empty() {
        Err(ValidationError::MissingIdentifier)
    } else {
        Ok(id)
    }
}
