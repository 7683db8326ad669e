//! Conversation aggregate state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a conversation stands from one participant's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// No message was ever sent in this conversation
    NoHistory,
    /// Messages are waiting to be read
    Unread(u32),
    /// Everything visible has been read
    Read,
    /// The user cleared the history and nothing newer arrived since
    Cleared,
}

/// Per-conversation aggregate shared by both participants
///
/// Each participant only ever writes its own entry in `unread_count`,
/// `typing` and `cleared_at`; the other participant's unread counter is only
/// touched by the message append transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Canonical conversation key
    pub key: String,
    /// The two participants, in key order
    pub participants: [String; 2],
    /// Text of the newest message
    pub last_message: Option<String>,
    /// Timestamp of the newest message (Unix milliseconds)
    pub last_message_at: Option<i64>,
    /// Unread counter per participant
    #[serde(default)]
    pub unread_count: BTreeMap<String, u32>,
    /// Typing flag per participant
    #[serde(default)]
    pub typing: BTreeMap<String, bool>,
    /// History watermark per participant
    #[serde(default)]
    pub cleared_at: BTreeMap<String, i64>,
}

impl Conversation {
    /// Create an empty conversation between two participants
    pub fn new(key: String, first: String, second: String) -> Self {
        Self {
            key,
            participants: [first, second],
            last_message: None,
            last_message_at: None,
            unread_count: BTreeMap::new(),
            typing: BTreeMap::new(),
            cleared_at: BTreeMap::new(),
        }
    }

    /// Whether `user_id` takes part in this conversation
    pub fn includes(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// The participant that is not `me`
    pub fn other_participant(&self, me: &str) -> Option<&str> {
        if !self.includes(me) {
            return None;
        }
        self.participants
            .iter()
            .find(|p| p.as_str() != me)
            .map(String::as_str)
    }

    /// Whether any message was ever sent
    pub fn has_history(&self) -> bool {
        self.last_message_at.is_some()
    }

    /// Unread count for `user_id` (0 when absent)
    pub fn unread_for(&self, user_id: &str) -> u32 {
        self.unread_count.get(user_id).copied().unwrap_or(0)
    }

    /// Whether `user_id` is currently typing
    pub fn is_typing(&self, user_id: &str) -> bool {
        self.typing.get(user_id).copied().unwrap_or(false)
    }

    /// History watermark of `user_id`, if they ever cleared the chat
    pub fn cleared_at_for(&self, user_id: &str) -> Option<i64> {
        self.cleared_at.get(user_id).copied()
    }

    /// Compute the conversation state as seen by `user_id`
    pub fn state_for(&self, user_id: &str) -> ConversationState {
        let Some(last_at) = self.last_message_at else {
            return ConversationState::NoHistory;
        };
        let unread = self.unread_for(user_id);
        if unread > 0 {
            return ConversationState::Unread(unread);
        }
        match self.cleared_at_for(user_id) {
            Some(watermark) if last_at <= watermark => ConversationState::Cleared,
            _ => ConversationState::Read,
        }
    }
}
