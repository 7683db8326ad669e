//! Message composition and context actions
//!
//! Draft text, reply threading, copy, the two delete variants and the
//! jump-to-message lookup behind a reply preview.

use crate::{
    messages::MessageId,
    storage::{Message, ReplySnapshot},
    store::ChatStore,
    Error, Result,
};
use std::time::Duration;

/// Actions offered when a message is long-pressed or right-clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    /// Quote the message in the next send
    Reply,
    /// Copy the text
    Copy,
    /// Hide the message for the viewer only
    DeleteForMe,
    /// Replace the message with the tombstone for both sides
    DeleteForEveryone,
}

/// Which side a deletion applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// Only the requesting user
    ForMe,
    /// Both participants (sender only)
    ForEveryone,
}

/// Actions available to `viewer_id` on `message`
///
/// "Delete for everyone" is offered to the sender only; a tombstoned
/// message can only be hidden.
pub fn context_actions(message: &Message, viewer_id: &str) -> Vec<ContextAction> {
    if message.is_deleted {
        return vec![ContextAction::DeleteForMe];
    }

    let mut actions = vec![
        ContextAction::Reply,
        ContextAction::Copy,
        ContextAction::DeleteForMe,
    ];
    if message.is_from(viewer_id) {
        actions.push(ContextAction::DeleteForEveryone);
    }
    actions
}

/// Text placed on the clipboard for "copy"
pub fn copy_text(message: &Message) -> String {
    message.text.clone()
}

/// Result of resolving a reply preview back to its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    /// The message still exists for the viewer (possibly as a tombstone)
    Found {
        /// Current state of the message
        message: Message,
        /// How long to keep it highlighted
        highlight_for: Duration,
    },
    /// The message no longer exists or is hidden from the viewer
    Missing,
}

/// Draft and pending reply for one user in one conversation
pub struct Composer {
    store: ChatStore,
    key: String,
    user_id: String,
    draft: String,
    pending_reply: Option<ReplySnapshot>,
}

impl Composer {
    /// Create an empty composer
    pub fn new(store: ChatStore, key: &str, user_id: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            user_id: user_id.to_string(),
            draft: String::new(),
            pending_reply: None,
        }
    }

    /// Current draft text
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the draft text
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Reply snapshot that the next send will carry
    pub fn pending_reply(&self) -> Option<&ReplySnapshot> {
        self.pending_reply.as_ref()
    }

    /// Quote `message` in the next send
    ///
    /// The snapshot is taken now; later changes to the message do not affect it.
    ///
    /// # Errors
    /// `Error::Validation` if the message belongs to another conversation or
    /// was deleted for everyone
    pub fn begin_reply(&mut self, message: &Message, sender_name: impl Into<String>) -> Result<()> {
        if message.conversation_key != self.key {
            return Err(Error::Validation(format!(
                "message {} is not part of {}",
                message.id, self.key
            )));
        }
        if message.is_deleted {
            return Err(Error::Validation(format!(
                "message {} was deleted and cannot be quoted",
                message.id
            )));
        }

        self.pending_reply = Some(ReplySnapshot::of(message, sender_name));
        Ok(())
    }

    /// Drop the pending reply
    pub fn cancel_reply(&mut self) {
        self.pending_reply = None;
    }

    /// Send the draft with the pending reply attached
    ///
    /// On success the draft and the pending reply are cleared. On failure
    /// both are kept so the user can retry.
    pub async fn send(&mut self) -> Result<MessageId> {
        let id = self
            .store
            .append(&self.key, &self.user_id, &self.draft, self.pending_reply.clone())
            .await?;

        self.draft.clear();
        self.pending_reply = None;
        Ok(id)
    }

    /// Delete `message` for the composer's user or for everyone
    ///
    /// # Errors
    /// `Error::Permission` when deleting for everyone a message the user did not send
    pub async fn delete(&self, message: &Message, scope: DeleteScope) -> Result<()> {
        match scope {
            DeleteScope::ForMe => {
                self.store
                    .soft_delete_for_self(&self.key, &message.id, &self.user_id)
                    .await
            }
            DeleteScope::ForEveryone => {
                if !message.is_from(&self.user_id) {
                    return Err(Error::Permission(format!(
                        "only the sender can delete message {} for everyone",
                        message.id
                    )));
                }
                self.store
                    .hard_delete_for_everyone(&self.key, &message.id, &self.user_id)
                    .await
            }
        }
    }

    /// Resolve a reply preview's message id for jump-to-message
    ///
    /// Never fails for a deleted message: a message deleted for everyone
    /// resolves to its tombstone, one that is gone or hidden from the user
    /// resolves to [`JumpTarget::Missing`].
    pub async fn jump_to(&self, message_id: &str) -> Result<JumpTarget> {
        let Some(message) = self.store.load_message(&self.key, message_id).await? else {
            return Ok(JumpTarget::Missing);
        };

        let watermark = self
            .store
            .load_conversation(&self.key)
            .await?
            .and_then(|c| c.cleared_at_for(&self.user_id));
        if !message.is_visible_to(&self.user_id, watermark) {
            return Ok(JumpTarget::Missing);
        }

        Ok(JumpTarget::Found {
            message,
            highlight_for: self.store.settings().jump_highlight(),
        })
    }
}
