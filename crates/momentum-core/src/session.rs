//! Per-session mutation queue.
//!
//! Each session's [`Engine`] lives inside its own tokio task and is only
//! reached through a bounded `mpsc` queue, so mutations from several UI
//! surfaces are applied one at a time in arrival order. Sessions share no
//! mutable state. A [`SessionHandle`] is the explicit dependency passed to
//! consumers; an unknown or stopped session is an error, not a panic.

use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot, watch};

use crate::character::{CharacterSnapshot, UserType};
use crate::completion::{CompletionEvent, RawCompletion};
use crate::engine::{Engine, RenderedState};
use crate::error::{NotFoundError, Result, ValidationError};
use crate::mood::{MoodState, Trigger};
use crate::plan::{AiDetails, MilestoneStatus, NewTask, PlanStore, PlanTask, TaskPatch};

/// Pending mutations per session before senders wait.
const SESSION_QUEUE_DEPTH: usize = 64;

pub type SessionId = String;

type Job<S> = Box<dyn FnOnce(&mut Engine<S>) + Send>;

/// Cloneable handle to one running session.
pub struct SessionHandle<S> {
    id: SessionId,
    jobs: mpsc::Sender<Job<S>>,
    state: watch::Receiver<RenderedState>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            jobs: self.jobs.clone(),
            state: self.state.clone(),
        }
    }
}

/// Move `engine` into a worker task and return its handle.
///
/// The worker stops once every handle has been dropped.
pub fn spawn_session<S>(id: impl Into<SessionId>, mut engine: Engine<S>) -> SessionHandle<S>
where
    S: PlanStore + Send + 'static,
{
    let id = id.into();
    let (jobs, mut queue) = mpsc::channel::<Job<S>>(SESSION_QUEUE_DEPTH);
    let state = engine.subscribe();

    let worker_id = id.clone();
    tokio::spawn(async move {
        tracing::info!(session = %worker_id, "session started");
        while let Some(job) = queue.recv().await {
            job(&mut engine);
        }
        tracing::info!(session = %worker_id, "session ended");
    });

    SessionHandle { id, jobs, state }
}

impl<S> SessionHandle<S>
where
    S: PlanStore + Send + 'static,
{
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest published state without queueing.
    pub fn latest(&self) -> RenderedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderedState> {
        self.state.clone()
    }

    /// Queue `f` behind every earlier call and wait for its result.
    async fn call<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Engine<S>) -> R + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: Job<S> = Box::new(move |engine| {
            let _ = reply.send(f(engine));
        });
        self.jobs
            .send(job)
            .await
            .map_err(|_| NotFoundError::Session(self.id.clone()))?;
        response
            .await
            .map_err(|_| NotFoundError::Session(self.id.clone()).into())
    }

    pub async fn rendered_state(&self) -> Result<RenderedState> {
        self.call(|engine| engine.rendered_state()).await
    }

    pub async fn open_character(&self) -> Result<CharacterSnapshot> {
        self.call(|engine| engine.open_character()).await
    }

    pub async fn close_character(&self) -> Result<CharacterSnapshot> {
        self.call(|engine| engine.close_character()).await
    }

    pub async fn start_chatting(&self, greeting: impl Into<String>) -> Result<CharacterSnapshot> {
        let greeting = greeting.into();
        self.call(move |engine| engine.start_chatting(greeting)).await
    }

    pub async fn stop_chatting(&self) -> Result<CharacterSnapshot> {
        self.call(|engine| engine.stop_chatting()).await
    }

    pub async fn set_user_type(&self, user_type: UserType) -> Result<CharacterSnapshot> {
        self.call(move |engine| engine.set_user_type(user_type)).await
    }

    pub async fn record_completion(&self, raw: RawCompletion) -> Result<Option<CompletionEvent>> {
        self.call(move |engine| engine.record_completion(&raw)).await?
    }

    pub async fn apply_trigger(&self, trigger: Trigger) -> Result<MoodState> {
        self.call(move |engine| engine.apply_trigger(trigger)).await
    }

    pub async fn create_task(&self, fields: NewTask) -> Result<PlanTask> {
        self.call(move |engine| engine.create_task(fields)).await?
    }

    pub async fn update_task(&self, id: impl Into<String>, patch: TaskPatch) -> Result<PlanTask> {
        let id = id.into();
        self.call(move |engine| engine.update_task(&id, patch)).await?
    }

    pub async fn toggle_completion(&self, id: impl Into<String>) -> Result<PlanTask> {
        let id = id.into();
        self.call(move |engine| engine.toggle_completion(&id)).await?
    }

    pub async fn reschedule(
        &self,
        id: impl Into<String>,
        planned_date: Option<NaiveDate>,
    ) -> Result<PlanTask> {
        let id = id.into();
        self.call(move |engine| engine.reschedule(&id, planned_date)).await?
    }

    pub async fn seed_from_plan(&self, plan: AiDetails) -> Result<Vec<PlanTask>> {
        self.call(move |engine| engine.seed_from_plan(&plan)).await?
    }

    pub async fn milestone_status(&self, milestone: impl Into<String>) -> Result<Option<MilestoneStatus>> {
        let milestone = milestone.into();
        self.call(move |engine| engine.milestone_status(&milestone)).await
    }
}

/// Independent sessions keyed by id.
pub struct SessionRegistry<S> {
    sessions: HashMap<SessionId, SessionHandle<S>>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }
}

impl<S> SessionRegistry<S>
where
    S: PlanStore + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session. Ids must be unique among live sessions.
    pub fn create(&mut self, id: impl Into<SessionId>, engine: Engine<S>) -> Result<SessionHandle<S>> {
        let id = id.into();
        if self.sessions.contains_key(&id) {
            return Err(ValidationError::InvalidValue {
                field: "session".into(),
                message: format!("session '{id}' already exists"),
            }
            .into());
        }
        let handle = spawn_session(id.clone(), engine);
        self.sessions.insert(id, handle.clone());
        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Result<SessionHandle<S>> {
        self.sessions
            .get(id)
            .cloned()
            .ok_or_else(|| NotFoundError::Session(id.to_string()).into())
    }

    /// End a session. Its worker stops when outstanding handles drop.
    pub fn end(&mut self, id: &str) -> Result<()> {
        self.sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| NotFoundError::Session(id.to_string()).into())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::mood::Mood;
    use crate::plan::MemoryPlanStore;
    use crate::storage::Config;

    fn engine() -> Engine<MemoryPlanStore> {
        Engine::new(MemoryPlanStore::new(), &Config::default()).unwrap()
    }

    #[tokio::test]
    async fn calls_apply_in_arrival_order() {
        let handle = spawn_session("s-1", engine());
        let (a, b, c) = tokio::join!(
            handle.create_task(NewTask::titled("first")),
            handle.create_task(NewTask::titled("second")),
            handle.create_task(NewTask::titled("third")),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let titles: Vec<_> = handle
            .rendered_state()
            .await
            .unwrap()
            .tasks
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn state_is_current_when_call_returns() {
        let handle = spawn_session("s-1", engine());
        let task = handle.create_task(NewTask::titled("Ship")).await.unwrap();
        handle.toggle_completion(task.id).await.unwrap();
        assert_eq!(handle.latest().mood, Mood::Celebratory);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let mut registry = SessionRegistry::new();
        let alice = registry.create("alice", engine()).unwrap();
        let bob = registry.create("bob", engine()).unwrap();

        alice.open_character().await.unwrap();
        alice.create_task(NewTask::titled("alice's task")).await.unwrap();

        let bob_state = bob.rendered_state().await.unwrap();
        assert!(!bob_state.is_character_open);
        assert!(bob_state.tasks.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let mut registry: SessionRegistry<MemoryPlanStore> = SessionRegistry::new();
        assert!(matches!(
            registry.get("nobody"),
            Err(CoreError::NotFound(NotFoundError::Session(_)))
        ));
        registry.create("s-1", engine()).unwrap();
        assert!(registry.create("s-1", engine()).is_err());
        registry.end("s-1").unwrap();
        assert!(registry.get("s-1").is_err());
        assert!(registry.end("s-1").is_err());
    }

    #[tokio::test]
    async fn errors_pass_through_the_queue() {
        let handle = spawn_session("s-1", engine());
        let err = handle.toggle_completion("missing").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(NotFoundError::Task(_))));
    }
}
