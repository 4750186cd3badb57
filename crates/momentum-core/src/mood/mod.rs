//! Mood/motivation resolution.
//!
//! A bounded rolling window of [`CompletionEvent`](crate::CompletionEvent)s
//! is reduced to a weighted positive ratio, and the ratio is mapped onto a
//! discrete [`Mood`] for the on-screen character.
//!
//! ## Thresholds (defaults)
//!
//! ```text
//! ratio >= 0.8                    -> Celebratory
//! 0.5 <= ratio < 0.8              -> Encouraged
//! ratio < 0.3 and >= 3 events     -> Concerned
//! anything else                   -> Neutral
//! empty window                    -> Idle ("")
//! ```
//!
//! Boundary values round toward the more encouraging mood.

mod resolver;
mod window;

pub use resolver::{resolve, MoodResolver, Tally, Trigger, TriggerKind};
pub use window::RollingWindow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// Discrete motivational state shown by the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Idle,
    Neutral,
    Encouraged,
    Concerned,
    Celebratory,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Idle => "idle",
            Mood::Neutral => "neutral",
            Mood::Encouraged => "encouraged",
            Mood::Concerned => "concerned",
            Mood::Celebratory => "celebratory",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single current mood value of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodState {
    pub mood: Mood,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

impl MoodState {
    /// The defined default: idle with no message.
    pub fn idle(at: DateTime<Utc>) -> Self {
        Self {
            mood: Mood::Idle,
            message: String::new(),
            updated_at: at,
        }
    }
}

/// Static per-mood messages. The character's generated text comes from
/// elsewhere; these are only fallbacks configured by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodMessages {
    #[serde(default)]
    pub neutral: String,
    #[serde(default)]
    pub encouraged: String,
    #[serde(default)]
    pub concerned: String,
    #[serde(default)]
    pub celebratory: String,
}

impl MoodMessages {
    pub fn for_mood(&self, mood: Mood) -> &str {
        match mood {
            Mood::Idle => "",
            Mood::Neutral => &self.neutral,
            Mood::Encouraged => &self.encouraged,
            Mood::Concerned => &self.concerned,
            Mood::Celebratory => &self.celebratory,
        }
    }
}

/// Rolling-window and threshold policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodConfig {
    /// Number of most recent events kept in the window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_celebratory_threshold")]
    pub celebratory_threshold: f64,
    #[serde(default = "default_encouraged_threshold")]
    pub encouraged_threshold: f64,
    #[serde(default = "default_concerned_threshold")]
    pub concerned_threshold: f64,
    /// Fewer counted events than this never resolve to `Concerned`.
    #[serde(default = "default_concerned_min_events")]
    pub concerned_min_events: usize,
    #[serde(default)]
    pub messages: MoodMessages,
}

fn default_window_size() -> usize {
    20
}
fn default_celebratory_threshold() -> f64 {
    0.8
}
fn default_encouraged_threshold() -> f64 {
    0.5
}
fn default_concerned_threshold() -> f64 {
    0.3
}
fn default_concerned_min_events() -> usize {
    3
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            celebratory_threshold: default_celebratory_threshold(),
            encouraged_threshold: default_encouraged_threshold(),
            concerned_threshold: default_concerned_threshold(),
            concerned_min_events: default_concerned_min_events(),
            messages: MoodMessages::default(),
        }
    }
}

impl MoodConfig {
    /// Reject windows of size zero and unordered thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "mood.window_size".into(),
                message: "must be at least 1".into(),
            });
        }
        let ordered = 0.0 <= self.concerned_threshold
            && self.concerned_threshold < self.encouraged_threshold
            && self.encouraged_threshold <= self.celebratory_threshold
            && self.celebratory_threshold <= 1.0;
        if !ordered {
            return Err(ConfigError::InvalidValue {
                key: "mood".into(),
                message: "thresholds must satisfy 0 <= concerned < encouraged <= celebratory <= 1"
                    .into(),
            });
        }
        Ok(())
    }
}
