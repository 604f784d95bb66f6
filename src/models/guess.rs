//! Guessing-round models: match modes, incoming messages, and outcomes.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// How incoming messages are compared against the accepted answers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Exact, case-sensitive equality with one of the answers.
    Strict,
    /// Case-insensitive Jaro-Winkler similarity above a threshold.
    #[default]
    Lenient,
}

impl Display for MatchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Lenient => f.write_str("lenient"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(AppError::InvalidInput(format!(
                "unknown guess mode `{other}` (expected `strict` or `lenient`)"
            ))),
        }
    }
}

/// A chat message delivered to a channel while a round may be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Author of the message.
    pub author_id: String,
    /// Raw text content, untouched.
    pub content: String,
    /// Platform timestamp of the message, used to react to it.
    pub ts: Option<String>,
}

impl IncomingMessage {
    /// Construct a message without a platform timestamp.
    #[must_use]
    pub fn new(
        channel_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            author_id: author_id.into(),
            content: content.into(),
            ts: None,
        }
    }
}

/// Lifecycle state of a guessing session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for an answer, a skip, or the deadline.
    Active,
    /// A message matched one of the answers.
    Answered,
    /// `/skip` was issued.
    Skipped,
    /// The deadline elapsed.
    TimedOut,
}

impl SessionState {
    /// Whether the state ends the session.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Terminal result of a guessing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The first matching message won the round.
    Answered {
        /// User who answered.
        author_id: String,
        /// The winning message.
        message: IncomingMessage,
    },
    /// The round was skipped.
    Skipped,
    /// Nobody answered before the deadline.
    TimedOut,
}

impl Outcome {
    /// The terminal [`SessionState`] this outcome corresponds to.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self {
            Self::Answered { .. } => SessionState::Answered,
            Self::Skipped => SessionState::Skipped,
            Self::TimedOut => SessionState::TimedOut,
        }
    }

    /// Author of the winning message, if any.
    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        match self {
            Self::Answered { author_id, .. } => Some(author_id),
            Self::Skipped | Self::TimedOut => None,
        }
    }
}
