//! # Momentum Core Library
//!
//! Progress and motivation engine behind the Momentum planner. Completion
//! signals from habits and business-plan tasks drive the mood of an
//! on-screen assistant character, and plan tasks generated from a business
//! plan are created, scheduled and completed here.
//!
//! ## Architecture
//!
//! - **Completion source**: normalizes habit and task completion records
//!   into [`CompletionEvent`]s
//! - **Mood resolver**: reduces a bounded rolling window of events to a
//!   [`MoodState`]
//! - **Character**: open/chatting state machine of the assistant
//! - **Plan scheduler**: lifecycle of [`PlanTask`]s over a [`PlanStore`]
//! - **Engine**: composes the above per session; [`SessionRegistry`]
//!   serializes mutations per session
//!
//! ## Key Components
//!
//! - [`Engine`]: Single-session state container
//! - [`SessionHandle`]: Queue-backed handle to a running session
//! - [`PlanDb`]: SQLite persistence collaborator
//! - [`Config`]: Application configuration management

pub mod character;
pub mod completion;
pub mod engine;
pub mod error;
pub mod mood;
pub mod plan;
pub mod session;
pub mod storage;

pub use character::{CharacterProfile, CharacterSession, CharacterSnapshot, CharacterState, UserType};
pub use completion::{normalize, CompletionEvent, HabitCompletion, RawCompletion, SourceKind, TaskCompletion};
pub use engine::{Engine, RenderedState};
pub use error::{CollaboratorError, ConfigError, CoreError, NotFoundError, ValidationError};
pub use mood::{Mood, MoodConfig, MoodResolver, MoodState, Trigger, TriggerKind};
pub use plan::{
    AiDetails, MemoryPlanStore, Milestone, MilestoneStatus, NewTask, PlanScheduler, PlanStore, PlanTask,
    StoredHabitCompletion, StoredTaskCompletion, TaskPatch,
};
pub use session::{spawn_session, SessionHandle, SessionId, SessionRegistry};
pub use storage::{Config, PlanDb};
