//! Linked game-service accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of a valid `clal` session cookie.
pub const CLAL_LENGTH: usize = 64;

/// A Slack user's link to their game-service session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountLink {
    /// Slack user ID.
    pub user_id: String,
    /// `clal` cookie value, without the `clal=` prefix.
    pub clal: String,
    /// When the link was (re)established.
    pub linked_at: DateTime<Utc>,
}

impl AccountLink {
    /// Create a link stamped with the current time.
    #[must_use]
    pub fn new(user_id: String, clal: String) -> Self {
        Self {
            user_id,
            clal,
            linked_at: Utc::now(),
        }
    }
}
