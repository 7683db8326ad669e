//! Message store operations
//!
//! Appending, deleting and streaming the messages of one conversation. The
//! append is the only way to write a message: it updates the conversation
//! preview and the recipient's unread counter in the same transaction.

use crate::{
    storage::{Message, ReplySnapshot},
    store::{ChatStore, EventCursor},
    Error, Result,
};

/// Identifier of a stored message
pub type MessageId = String;

impl ChatStore {
    /// Append a message to a conversation
    ///
    /// Creates the conversation on first send. Subscribers are notified
    /// before this returns.
    ///
    /// # Errors
    /// - `Error::Validation` if `text` is blank (nothing is written)
    /// - `Error::Permission` if `sender_id` is not a participant
    ///
    /// # Example
    /// ```rust
    /// use campuschat::{conversation_key, ChatStore};
    ///
    /// # tokio_test::block_on(async {
    /// let store = ChatStore::in_memory()?;
    /// let key = conversation_key("alice", "bob");
    ///
    /// let id = store.append(&key, "alice", "hello", None).await?;
    /// let conversation = store.load_conversation(&key).await?.expect("created on first send");
    ///
    /// assert_eq!(conversation.unread_for("bob"), 1);
    /// assert_eq!(store.load_message(&key, &id).await?.map(|m| m.text), Some("hello".to_string()));
    /// # Ok::<(), campuschat::Error>(())
    /// # });
    /// ```
    pub async fn append(
        &self,
        key: &str,
        sender_id: &str,
        text: &str,
        reply_to: Option<ReplySnapshot>,
    ) -> Result<MessageId> {
        if text.trim().is_empty() {
            return Err(Error::Validation("message text must not be empty".to_string()));
        }

        let message = self
            .with_db(|db| db.append_message(key, sender_id, text, reply_to))
            .await?;
        self.publish_conversation_write(key);

        tracing::info!("Message {} sent by {} in {}", message.id, sender_id, key);
        Ok(message.id)
    }

    /// Hide a message for `user_id` only
    ///
    /// Idempotent: deleting an already hidden message changes nothing.
    pub async fn soft_delete_for_self(&self, key: &str, message_id: &str, user_id: &str) -> Result<()> {
        let message = self
            .with_db(|db| db.delete_message_for(key, message_id, user_id))
            .await?;
        self.publish_conversation_write(key);

        tracing::debug!("Message {} hidden for {} ({} users)", message.id, user_id, message.deleted_for.len());
        Ok(())
    }

    /// Delete a message for everyone, replacing its text with the tombstone
    ///
    /// # Errors
    /// - `Error::Permission` if `requester_id` did not send the message; nothing changes
    /// - `Error::NotFound` if the message does not exist
    pub async fn hard_delete_for_everyone(
        &self,
        key: &str,
        message_id: &str,
        requester_id: &str,
    ) -> Result<()> {
        let tombstone = self.settings().tombstone_text.clone();
        let result = self
            .with_db(|db| db.delete_message_for_everyone(key, message_id, requester_id, &tombstone))
            .await;

        match result {
            Ok(_) => {
                self.publish_conversation_write(key);
                tracing::info!("Message {} deleted for everyone by {}", message_id, requester_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Refused to delete message {} for everyone: {}", message_id, e);
                Err(e)
            }
        }
    }

    /// Load one message
    pub async fn load_message(&self, key: &str, message_id: &str) -> Result<Option<Message>> {
        self.with_db(|db| db.load_message(key, message_id)).await
    }

    /// Load all messages of a conversation, oldest first
    pub async fn load_messages(&self, key: &str) -> Result<Vec<Message>> {
        self.with_db(|db| db.load_messages(key)).await
    }

    /// Load the messages `viewer_id` should see, oldest first
    ///
    /// Drops messages the viewer deleted for themselves and everything at or
    /// before their history watermark.
    pub async fn visible_messages(&self, key: &str, viewer_id: &str) -> Result<Vec<Message>> {
        self.with_db(|db| {
            let watermark = db
                .load_conversation(key)?
                .and_then(|c| c.cleared_at_for(viewer_id));
            let messages = db.load_messages(key)?;
            Ok(messages
                .into_iter()
                .filter(|m| m.is_visible_to(viewer_id, watermark))
                .collect())
        })
        .await
    }

    /// Subscribe to the full message list of a conversation
    pub fn stream_messages(&self, key: &str) -> MessageStream {
        MessageStream {
            store: self.clone(),
            key: key.to_string(),
            viewer_id: None,
            cursor: self.cursor(),
            primed: false,
        }
    }

    /// Subscribe to the messages `viewer_id` should see
    ///
    /// Also refreshes when the viewer's watermark moves.
    pub fn stream_visible_messages(&self, key: &str, viewer_id: &str) -> MessageStream {
        MessageStream {
            viewer_id: Some(viewer_id.to_string()),
            ..self.stream_messages(key)
        }
    }
}

/// Realtime message subscription for one conversation
///
/// The first call to [`MessageStream::next`] returns the current snapshot
/// at once; each later call waits for the next change and returns a fresh
/// snapshot ordered by `created_at`. Dropping the stream unsubscribes.
pub struct MessageStream {
    store: ChatStore,
    key: String,
    viewer_id: Option<String>,
    cursor: EventCursor,
    primed: bool,
}

impl MessageStream {
    /// Conversation this stream follows
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the next snapshot
    pub async fn next(&mut self) -> Result<Vec<Message>> {
        if self.primed {
            let key = self.key.clone();
            let follows_watermark = self.viewer_id.is_some();
            self.cursor
                .changed(|event| {
                    event.affects_messages_of(&key)
                        || (follows_watermark && event.affects_conversation(&key))
                })
                .await?;
        }
        self.primed = true;

        match &self.viewer_id {
            Some(viewer_id) => self.store.visible_messages(&self.key, viewer_id).await,
            None => self.store.load_messages(&self.key).await,
        }
    }
}
