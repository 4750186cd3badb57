//! Character interaction state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Closed --open()---------> OpenIdle --start_chatting()--> OpenChatting
//!   ^                          |  ^                            |
//!   +--------close()-----------+  +-------stop_chatting()------+
//!   +--------close()-------------------------------------------+
//! ```
//!
//! Open and chatting are a single state value, so a session can never be
//! chatting while closed. Leaving `Closed` for the first time marks the
//! session as interacted; that flag is never cleared.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterState {
    #[default]
    Closed,
    OpenIdle,
    OpenChatting,
}

/// How the user described themselves to the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserType {
    New,
    Experienced,
    Agency,
    TeamLead,
    #[default]
    Unknown,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::New => "new",
            UserType::Experienced => "experienced",
            UserType::Agency => "agency",
            UserType::TeamLead => "teamLead",
            UserType::Unknown => "unknown",
        }
    }

    /// Lenient parser for CLI and storage input. Unrecognized text is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "new" => UserType::New,
            "experienced" => UserType::Experienced,
            "agency" => UserType::Agency,
            "teamlead" => UserType::TeamLead,
            _ => UserType::Unknown,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a session a store may keep between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProfile {
    pub user_type: UserType,
    pub has_interacted_before: bool,
}

/// Per-session character state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharacterSession {
    state: CharacterState,
    user_type: UserType,
    has_interacted_before: bool,
}

/// Wire view with flattened flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSnapshot {
    pub is_open: bool,
    pub is_chatting: bool,
    pub user_type: UserType,
    pub has_interacted_before: bool,
}

impl CharacterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from a stored profile. The character starts closed.
    pub fn from_profile(profile: CharacterProfile) -> Self {
        Self {
            state: CharacterState::Closed,
            user_type: profile.user_type,
            has_interacted_before: profile.has_interacted_before,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != CharacterState::Closed
    }

    pub fn is_chatting(&self) -> bool {
        self.state == CharacterState::OpenChatting
    }

    pub fn user_type(&self) -> UserType {
        self.user_type
    }

    pub fn has_interacted_before(&self) -> bool {
        self.has_interacted_before
    }

    pub fn profile(&self) -> CharacterProfile {
        CharacterProfile {
            user_type: self.user_type,
            has_interacted_before: self.has_interacted_before,
        }
    }

    pub fn snapshot(&self) -> CharacterSnapshot {
        CharacterSnapshot {
            is_open: self.is_open(),
            is_chatting: self.is_chatting(),
            user_type: self.user_type,
            has_interacted_before: self.has_interacted_before,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────
    //
    // Each command returns whether anything changed.

    pub fn open(&mut self) -> bool {
        match self.state {
            CharacterState::Closed => self.transition(CharacterState::OpenIdle),
            CharacterState::OpenIdle | CharacterState::OpenChatting => false,
        }
    }

    /// From `Closed` this opens and starts chatting in one step.
    pub fn start_chatting(&mut self) -> bool {
        match self.state {
            CharacterState::Closed | CharacterState::OpenIdle => {
                self.transition(CharacterState::OpenChatting)
            }
            CharacterState::OpenChatting => false,
        }
    }

    pub fn stop_chatting(&mut self) -> bool {
        match self.state {
            CharacterState::OpenChatting => self.transition(CharacterState::OpenIdle),
            CharacterState::Closed | CharacterState::OpenIdle => false,
        }
    }

    pub fn close(&mut self) -> bool {
        match self.state {
            CharacterState::Closed => false,
            CharacterState::OpenIdle | CharacterState::OpenChatting => {
                self.transition(CharacterState::Closed)
            }
        }
    }

    pub fn set_user_type(&mut self, user_type: UserType) -> bool {
        if self.user_type == user_type {
            return false;
        }
        tracing::debug!(from = %self.user_type, to = %user_type, "user type set");
        self.user_type = user_type;
        true
    }

    fn transition(&mut self, to: CharacterState) -> bool {
        tracing::debug!(from = ?self.state, ?to, "character transition");
        if self.state == CharacterState::Closed && to != CharacterState::Closed {
            self.has_interacted_before = true;
        }
        self.state = to;
        true
    }
}
