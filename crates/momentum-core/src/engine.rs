//! Engine facade.
//!
//! One [`Engine`] is the whole mutable state of a session: the character,
//! the mood resolver and the plan tasks. Every accepted mutation
//! recomputes what it affects before returning and publishes a fresh
//! [`RenderedState`] to subscribers. There are no timers.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::character::{CharacterSession, CharacterSnapshot, UserType};
use crate::completion::{normalize, CompletionEvent, RawCompletion};
use crate::error::Result;
use crate::mood::{Mood, MoodResolver, MoodState, Trigger, TriggerKind};
use crate::plan::{
    AiDetails, MilestoneStatus, NewTask, PlanScheduler, PlanStore, PlanTask, StoredHabitCompletion,
    TaskChange, TaskPatch,
};
use crate::storage::Config;

/// Everything the presentation layer may read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedState {
    pub mood: Mood,
    pub message: String,
    pub is_character_open: bool,
    pub is_chatting: bool,
    pub user_type: UserType,
    pub tasks: Vec<PlanTask>,
}

pub struct Engine<S> {
    character: CharacterSession,
    resolver: MoodResolver,
    scheduler: PlanScheduler<S>,
    persist_profile: bool,
    publisher: watch::Sender<RenderedState>,
}

impl<S: PlanStore> Engine<S> {
    /// Build a session over `store`.
    ///
    /// Tasks and the character profile are loaded from the store, and the
    /// mood window is rebuilt from stored habit check-offs and logged task
    /// completion flips, oldest first. Seeded or pre-completed tasks never
    /// emitted an event and are not replayed.
    pub fn new(store: S, config: &Config) -> Result<Self> {
        let now = Utc::now();
        let profile = if config.character.persist_profile {
            store.load_profile()?
        } else {
            None
        };
        let history = replay_events(&store)?;
        let scheduler = PlanScheduler::load(store)?;

        let mut resolver = MoodResolver::new(config.mood.clone(), now);
        for event in history {
            resolver.push(event);
        }
        resolver.recompute(now);

        let character = profile.map(CharacterSession::from_profile).unwrap_or_default();
        let initial = render(&character, resolver.state(), scheduler.tasks());
        let (publisher, _) = watch::channel(initial);

        Ok(Self {
            character,
            resolver,
            scheduler,
            persist_profile: config.character.persist_profile,
            publisher,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn rendered_state(&self) -> RenderedState {
        render(&self.character, self.resolver.state(), self.scheduler.tasks())
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<RenderedState> {
        self.publisher.subscribe()
    }

    pub fn mood(&self) -> &MoodState {
        self.resolver.state()
    }

    pub fn character(&self) -> CharacterSnapshot {
        self.character.snapshot()
    }

    pub fn tasks(&self) -> &[PlanTask] {
        self.scheduler.tasks()
    }

    pub fn task(&self, id: &str) -> Option<&PlanTask> {
        self.scheduler.get(id)
    }

    pub fn milestone_status(&self, milestone: &str) -> Option<MilestoneStatus> {
        self.scheduler.milestone_status(milestone)
    }

    /// Weighted positive ratio of the current window.
    pub fn weighted_ratio(&mut self) -> Option<f64> {
        self.resolver.ratio()
    }

    pub fn store(&self) -> &S {
        self.scheduler.store()
    }

    // ── Character ────────────────────────────────────────────────────

    pub fn open_character(&mut self) -> CharacterSnapshot {
        let changed = self.character.open();
        self.after_character_change(changed)
    }

    pub fn close_character(&mut self) -> CharacterSnapshot {
        let changed = self.character.close();
        self.after_character_change(changed)
    }

    /// Enter chat, opening the character if needed. Entering chat applies
    /// the `ChatOpened` trigger with the generator's greeting.
    pub fn start_chatting(&mut self, greeting: impl Into<String>) -> CharacterSnapshot {
        let changed = self.character.start_chatting();
        if changed {
            self.resolver
                .apply_trigger(Trigger::new(TriggerKind::ChatOpened, greeting), Utc::now());
        }
        self.after_character_change(changed)
    }

    pub fn stop_chatting(&mut self) -> CharacterSnapshot {
        let changed = self.character.stop_chatting();
        self.after_character_change(changed)
    }

    pub fn set_user_type(&mut self, user_type: UserType) -> CharacterSnapshot {
        let changed = self.character.set_user_type(user_type);
        self.after_character_change(changed)
    }

    // ── Completions & mood ───────────────────────────────────────────

    /// Ingest a habit or task completion from outside the plan.
    ///
    /// Habit check-offs are stored before they count. Invalid records and
    /// store failures leave the mood untouched.
    pub fn record_completion(&mut self, raw: &RawCompletion) -> Result<Option<CompletionEvent>> {
        let now = Utc::now();
        let Some(event) = normalize(raw, now)? else {
            return Ok(None);
        };
        if let RawCompletion::Habit(record) = raw {
            let stored = StoredHabitCompletion {
                record: record.clone(),
                recorded_at: now,
            };
            if let Err(err) = self.scheduler.store_mut().record_habit_completion(&stored) {
                tracing::warn!(error = %err, habit = %record.habit_id, "habit completion not stored");
                return Err(err.into());
            }
        }
        self.ingest(event.clone());
        self.publish();
        Ok(Some(event))
    }

    /// Override the mood until the next recompute.
    pub fn apply_trigger(&mut self, trigger: Trigger) -> MoodState {
        let state = self.resolver.apply_trigger(trigger, Utc::now()).clone();
        self.publish();
        state
    }

    // ── Plan tasks ───────────────────────────────────────────────────

    pub fn create_task(&mut self, fields: NewTask) -> Result<PlanTask> {
        let task = self.scheduler.create_task(fields, Utc::now())?;
        self.publish();
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<PlanTask> {
        let change = self.scheduler.update_task(id, patch, Utc::now())?;
        Ok(self.after_task_change(change))
    }

    pub fn toggle_completion(&mut self, id: &str) -> Result<PlanTask> {
        let change = self.scheduler.toggle_completion(id, Utc::now())?;
        Ok(self.after_task_change(change))
    }

    pub fn reschedule(&mut self, id: &str, planned_date: Option<NaiveDate>) -> Result<PlanTask> {
        let task = self.scheduler.reschedule(id, planned_date, Utc::now())?;
        self.publish();
        Ok(task)
    }

    pub fn seed_from_plan(&mut self, plan: &AiDetails) -> Result<Vec<PlanTask>> {
        let seeded = self.scheduler.seed_from_plan(plan, Utc::now())?;
        self.publish();
        Ok(seeded)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn ingest(&mut self, event: CompletionEvent) {
        tracing::debug!(
            kind = ?event.source_kind(),
            source = %event.source_id(),
            positive = event.positive(),
            "completion event"
        );
        self.resolver.push(event);
        self.resolver.recompute(Utc::now());
    }

    fn after_task_change(&mut self, change: TaskChange) -> PlanTask {
        if let Some(raw) = &change.emitted {
            match normalize(raw, change.task.updated_at) {
                Ok(Some(event)) => self.ingest(event),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "scheduler emitted an invalid record"),
            }
        }
        if let Some(milestone) = &change.milestone_completed {
            tracing::info!(%milestone, "milestone completed");
            let message = self
                .resolver
                .config()
                .messages
                .for_mood(Mood::Celebratory)
                .to_string();
            self.resolver
                .apply_trigger(Trigger::new(TriggerKind::MilestoneCompleted, message), Utc::now());
        }
        self.publish();
        change.task
    }

    fn after_character_change(&mut self, changed: bool) -> CharacterSnapshot {
        if changed && self.persist_profile {
            let profile = self.character.profile();
            if let Err(err) = self.scheduler.store_mut().save_profile(&profile) {
                tracing::warn!(error = %err, "character profile not saved");
            }
        }
        self.publish();
        self.character.snapshot()
    }

    fn publish(&self) {
        self.publisher.send_replace(self.rendered_state());
    }
}

fn render(character: &CharacterSession, mood: &MoodState, tasks: &[PlanTask]) -> RenderedState {
    RenderedState {
        mood: mood.mood,
        message: mood.message.clone(),
        is_character_open: character.is_open(),
        is_chatting: character.is_chatting(),
        user_type: character.user_type(),
        tasks: tasks.to_vec(),
    }
}

/// Completion events derived from stored records, oldest first.
fn replay_events<S: PlanStore>(store: &S) -> Result<Vec<CompletionEvent>> {
    let mut events = Vec::new();
    for stored in store.list_habit_completions()? {
        let raw = RawCompletion::Habit(stored.record);
        match normalize(&raw, stored.recorded_at) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "skipping stored habit completion"),
        }
    }
    for flip in store.list_task_completions()? {
        events.push(CompletionEvent::task(flip.task_id, flip.completed, 1.0, flip.recorded_at));
    }
    events.sort_by_key(|e| e.occurred_at());
    Ok(events)
}
