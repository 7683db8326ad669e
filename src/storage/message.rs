//! Message structures, reply snapshots and per-user visibility

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Placeholder text written over a message deleted for everyone
pub const TOMBSTONE_TEXT: &str = "🚫 This message was deleted";

/// Frozen copy of the message being replied to
///
/// Captured when the user hits "reply" and never updated afterwards, so the
/// quoted text survives later edits or deletion of the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySnapshot {
    /// Id of the quoted message
    pub id: String,
    /// Quoted text as it was at reply time
    pub text: String,
    /// Display name of the quoted message's sender at reply time
    pub sender_name: String,
}

impl ReplySnapshot {
    /// Snapshot `message`, attributing it to `sender_name`
    pub fn of(message: &Message, sender_name: impl Into<String>) -> Self {
        Self {
            id: message.id.clone(),
            text: message.text.clone(),
            sender_name: sender_name.into(),
        }
    }
}

/// A stored chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID
    pub id: String,
    /// Key of the conversation owning this message
    pub conversation_key: String,
    /// Sender user ID
    pub sender_id: String,
    /// Message text (the tombstone once deleted for everyone)
    pub text: String,
    /// Store-assigned timestamp (Unix milliseconds), strictly increasing per conversation
    pub created_at: i64,
    /// Whether the recipient has seen the message
    #[serde(default)]
    pub read: bool,
    /// Users who deleted the message for themselves only
    #[serde(default)]
    pub deleted_for: BTreeSet<String>,
    /// Whether the sender deleted the message for everyone
    #[serde(default)]
    pub is_deleted: bool,
    /// Quoted message, if this is a reply
    #[serde(default)]
    pub reply_to: Option<ReplySnapshot>,
}

impl Message {
    /// Create a new unread message
    pub fn new(
        id: String,
        conversation_key: String,
        sender_id: String,
        text: String,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            conversation_key,
            sender_id,
            text,
            created_at,
            read: false,
            deleted_for: BTreeSet::new(),
            is_deleted: false,
            reply_to: None,
        }
    }

    /// Attach a reply snapshot
    pub fn with_reply(mut self, reply_to: Option<ReplySnapshot>) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Whether `user_id` sent this message
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }

    /// Whether `user_id` deleted this message for themselves
    pub fn is_hidden_for(&self, user_id: &str) -> bool {
        self.deleted_for.contains(user_id)
    }

    /// Whether `user_id` should see this message
    ///
    /// Hidden when the user deleted it for themselves, or when it was created
    /// at or before the user's `cleared_at` watermark.
    pub fn is_visible_to(&self, user_id: &str, cleared_at: Option<i64>) -> bool {
        if self.is_hidden_for(user_id) {
            return false;
        }
        match cleared_at {
            Some(watermark) => self.created_at > watermark,
            None => true,
        }
    }

    /// Whether this message still counts towards `user_id`'s unread badge
    pub fn counts_as_unread_for(&self, user_id: &str, cleared_at: Option<i64>) -> bool {
        !self.is_from(user_id)
            && !self.read
            && !self.is_deleted
            && self.is_visible_to(user_id, cleared_at)
    }

    /// Mark the message as read (no-op when already read)
    pub fn mark_read(&mut self) {
        self.read = true;
    }

    /// Replace the content with `tombstone` and drop the reply snapshot
    pub fn tombstone(&mut self, tombstone: &str) {
        self.text = tombstone.to_string();
        self.is_deleted = true;
        self.reply_to = None;
    }

    /// Get read-receipt indicator shown on the sender's side
    pub fn read_indicator(&self) -> &str {
        if self.is_deleted {
            ""
        } else if self.read {
            "✓✓"
        } else {
            "✓"
        }
    }

    /// Get status text for the message
    pub fn status_text(&self) -> String {
        if self.is_deleted {
            "deleted".to_string()
        } else if self.read {
            "read".to_string()
        } else {
            "sent".to_string()
        }
    }
}
