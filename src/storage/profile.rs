//! User profiles as seen by the chat roster

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A user known to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user ID from the identity provider
    pub uid: String,
    /// Display name
    pub name: String,
    /// Profile picture URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Users this user has blocked
    #[serde(default)]
    pub blocked_users: BTreeSet<String>,
}

impl UserProfile {
    /// Create a new profile
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            avatar_url: None,
            blocked_users: BTreeSet::new(),
        }
    }

    /// Set the avatar URL
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Name to show in lists, falling back to the uid for unnamed accounts
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.uid
        } else {
            &self.name
        }
    }

    /// Whether this user blocked `uid`
    pub fn has_blocked(&self, uid: &str) -> bool {
        self.blocked_users.contains(uid)
    }
}
