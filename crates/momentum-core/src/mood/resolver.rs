//! Ratio-driven mood resolution and one-cycle trigger overrides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Mood, MoodConfig, MoodState, RollingWindow};
use crate::completion::CompletionEvent;

/// Boundary tolerance; values this close to a threshold count as reaching it.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Weighted summary of a window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tally {
    pub positive_weight: f64,
    pub total_weight: f64,
    pub counted: usize,
}

impl Tally {
    /// Task corrections are already folded in by [`RollingWindow`], so every
    /// event here counts.
    pub fn from_events(events: &[CompletionEvent]) -> Self {
        events.iter().fold(Tally::default(), |mut tally, event| {
            tally.total_weight += event.weight();
            if event.positive() {
                tally.positive_weight += event.weight();
            }
            tally.counted += 1;
            tally
        })
    }

    /// `None` when nothing counts.
    pub fn ratio(&self) -> Option<f64> {
        if self.counted == 0 || self.total_weight <= 0.0 {
            None
        } else {
            Some(self.positive_weight / self.total_weight)
        }
    }
}

/// Map a window to a mood. Pure; never fails.
pub fn resolve(window: &[CompletionEvent], config: &MoodConfig, now: DateTime<Utc>) -> MoodState {
    let tally = Tally::from_events(window);
    let Some(ratio) = tally.ratio() else {
        return MoodState::idle(now);
    };

    let reaches = |threshold: f64| ratio + BOUNDARY_EPSILON >= threshold;
    let mood = if reaches(config.celebratory_threshold) {
        Mood::Celebratory
    } else if reaches(config.encouraged_threshold) {
        Mood::Encouraged
    } else if !reaches(config.concerned_threshold) && tally.counted >= config.concerned_min_events {
        Mood::Concerned
    } else {
        Mood::Neutral
    };

    MoodState {
        mood,
        message: config.messages.for_mood(mood).to_string(),
        updated_at: now,
    }
}

/// Explicit events that override the computed mood for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    ChatOpened,
    MilestoneCompleted,
    Custom(Mood),
}

impl TriggerKind {
    pub fn mood(&self) -> Mood {
        match self {
            TriggerKind::ChatOpened => Mood::Encouraged,
            TriggerKind::MilestoneCompleted => Mood::Celebratory,
            TriggerKind::Custom(mood) => *mood,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    /// Text supplied by the external generator.
    #[serde(default)]
    pub message: String,
}

impl Trigger {
    pub fn new(kind: TriggerKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Owns the rolling window and the current mood of one session.
#[derive(Debug, Clone)]
pub struct MoodResolver {
    config: MoodConfig,
    window: RollingWindow,
    state: MoodState,
}

impl MoodResolver {
    pub fn new(config: MoodConfig, now: DateTime<Utc>) -> Self {
        let window = RollingWindow::new(config.window_size);
        Self {
            config,
            window,
            state: MoodState::idle(now),
        }
    }

    pub fn config(&self) -> &MoodConfig {
        &self.config
    }

    pub fn state(&self) -> &MoodState {
        &self.state
    }

    /// Append an event. The mood changes on the next [`recompute`](Self::recompute).
    pub fn push(&mut self, event: CompletionEvent) {
        self.window.push(event);
    }

    /// Current weighted positive ratio, `None` for an empty window.
    pub fn ratio(&mut self) -> Option<f64> {
        Tally::from_events(self.window.as_slice()).ratio()
    }

    pub fn recompute(&mut self, now: DateTime<Utc>) -> &MoodState {
        let next = resolve(self.window.as_slice(), &self.config, now);
        if next.mood != self.state.mood {
            tracing::debug!(from = %self.state.mood, to = %next.mood, "mood changed");
        }
        self.state = next;
        &self.state
    }

    /// Override the mood until the next recompute.
    pub fn apply_trigger(&mut self, trigger: Trigger, now: DateTime<Utc>) -> &MoodState {
        let mood = trigger.kind.mood();
        tracing::debug!(kind = ?trigger.kind, %mood, "mood trigger applied");
        self.state = MoodState {
            mood,
            message: trigger.message,
            updated_at: now,
        };
        &self.state
    }
}
