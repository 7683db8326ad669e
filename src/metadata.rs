//! Conversation metadata operations
//!
//! Typing flags, unread counters and history watermarks. Every operation
//! writes only the caller's own entry and is merge-safe: it succeeds even
//! when no message was ever sent and the conversation document does not
//! exist yet.

use crate::{
    storage::Conversation,
    store::{ChatStore, EventCursor},
    Result,
};

impl ChatStore {
    /// Set `user_id`'s typing flag (last write wins)
    pub async fn set_typing(&self, key: &str, user_id: &str, is_typing: bool) -> Result<()> {
        self.with_db(|db| db.set_typing(key, user_id, is_typing)).await?;
        self.publish_conversation_changed(key);

        tracing::debug!("{} typing={} in {}", user_id, is_typing, key);
        Ok(())
    }

    /// Hide everything sent so far from `user_id`
    ///
    /// Messages are kept and stay visible to the other participant. New
    /// messages after the watermark show up (and count as unread) as usual.
    ///
    /// # Returns
    /// The new watermark (Unix milliseconds)
    pub async fn clear_history(&self, key: &str, user_id: &str) -> Result<i64> {
        let watermark = self.with_db(|db| db.clear_history(key, user_id)).await?;
        self.publish_conversation_changed(key);

        tracing::info!("{} cleared history of {} at {}", user_id, key, watermark);
        Ok(watermark)
    }

    /// Reset `user_id`'s unread counter to zero (idempotent)
    pub async fn reset_unread(&self, key: &str, user_id: &str) -> Result<()> {
        self.with_db(|db| db.reset_unread(key, user_id)).await?;
        self.publish_conversation_changed(key);
        Ok(())
    }

    /// Recompute `user_id`'s unread counter from the stored messages
    ///
    /// Repairs counters written by clients that updated messages and
    /// counters separately.
    pub async fn reconcile_unread(&self, key: &str, user_id: &str) -> Result<u32> {
        let count = self.with_db(|db| db.reconcile_unread(key, user_id)).await?;
        self.publish_conversation_changed(key);

        tracing::debug!("Reconciled unread for {} in {}: {}", user_id, key, count);
        Ok(count)
    }

    /// Subscribe to the conversation document of `key`
    pub fn stream_conversation(&self, key: &str) -> ConversationStream {
        ConversationStream {
            store: self.clone(),
            key: key.to_string(),
            cursor: self.cursor(),
            primed: false,
        }
    }

    fn publish_conversation_changed(&self, key: &str) {
        self.publish(crate::StoreEvent::ConversationChanged {
            conversation_key: key.to_string(),
        });
    }
}

/// Realtime subscription to one conversation document
///
/// Yields `None` while the conversation does not exist yet.
pub struct ConversationStream {
    store: ChatStore,
    key: String,
    cursor: EventCursor,
    primed: bool,
}

impl ConversationStream {
    /// Wait for the next snapshot
    pub async fn next(&mut self) -> Result<Option<Conversation>> {
        if self.primed {
            let key = self.key.clone();
            self.cursor
                .changed(|event| event.affects_conversation(&key))
                .await?;
        }
        self.primed = true;
        self.store.load_conversation(&self.key).await
    }
}
