//! Read receipts and unread accounting
//!
//! Marking a conversation read zeroes the reader's badge and flips every
//! unread message from the other side to read, all in one transaction. The
//! operation is idempotent, so it runs both when a conversation is opened
//! and whenever a message arrives while it is on screen.

use crate::{storage::Message, store::ChatStore, Result};

impl ChatStore {
    /// Mark everything `other_id` sent to `reader_id` as read
    ///
    /// With nothing unread this only (re)zeroes the counter.
    ///
    /// # Returns
    /// Number of messages that changed from unread to read
    pub async fn mark_conversation_read(&self, key: &str, reader_id: &str, other_id: &str) -> Result<usize> {
        let flipped = self
            .with_db(|db| db.mark_conversation_read(key, reader_id, other_id))
            .await?;

        if flipped > 0 {
            self.publish_conversation_write(key);
            tracing::debug!("{} read {} messages in {}", reader_id, flipped, key);
        } else {
            self.publish(crate::StoreEvent::ConversationChanged {
                conversation_key: key.to_string(),
            });
        }
        Ok(flipped)
    }
}

/// Whether `messages` contain something from `other_id` that `reader_id` has not read
pub fn has_unread_from(messages: &[Message], reader_id: &str, other_id: &str) -> bool {
    messages
        .iter()
        .any(|m| m.is_from(other_id) && !m.read && !m.is_hidden_for(reader_id))
}
