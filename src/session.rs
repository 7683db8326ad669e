//! Session-scoped ownership of subscriptions
//!
//! A `ChatSession` belongs to the signed-in user and owns everything that
//! outlives a single screen: the store handle and the "which conversation is
//! open" cell the chat list reads. A `ConversationView` owns the streams,
//! typing timer and composer of one open conversation; closing or dropping
//! it tears all of them down, after which it never marks anything read.

use crate::{
    chat_list::ChatListStream,
    compose::{Composer, DeleteScope, JumpTarget},
    identity::{conversation_key, validate_user_id, IdentityProvider},
    messages::{MessageId, MessageStream},
    metadata::ConversationStream,
    receipts::has_unread_from,
    storage::{Conversation, Message},
    store::ChatStore,
    typing::TypingSignaler,
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::watch;

/// The signed-in user's chat session
pub struct ChatSession {
    store: ChatStore,
    identity: Arc<dyn IdentityProvider>,
    viewing: Arc<watch::Sender<Option<String>>>,
}

impl ChatSession {
    /// Start a session for the user `identity` yields
    pub fn new(store: ChatStore, identity: impl IdentityProvider + 'static) -> Self {
        let (viewing, _) = watch::channel(None);
        Self {
            store,
            identity: Arc::new(identity),
            viewing: Arc::new(viewing),
        }
    }

    /// The signed-in user's id
    pub fn user_id(&self) -> &str {
        self.identity.current_user_id()
    }

    /// Underlying store handle
    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// User whose conversation is currently open, if any
    pub fn viewing(&self) -> Option<String> {
        self.viewing.borrow().clone()
    }

    /// Subscribe to the ranked chat list
    pub fn chat_list(&self) -> ChatListStream {
        ChatListStream::new(self.store.clone(), self.user_id(), self.viewing.subscribe())
    }

    /// Block `target` for the signed-in user
    pub async fn block_user(&self, target: &str) -> Result<()> {
        self.store.block_user(self.user_id(), target).await
    }

    /// Open the conversation with `other_id`
    ///
    /// Marks it as the viewed conversation and marks everything `other_id`
    /// sent as read.
    ///
    /// # Errors
    /// `Error::Validation` for a malformed id or when opening a chat with oneself
    pub async fn open_conversation(&self, other_id: &str) -> Result<ConversationView> {
        validate_user_id(other_id)?;
        let me = self.user_id().to_string();
        if other_id == me {
            return Err(Error::Validation("cannot open a conversation with yourself".to_string()));
        }

        let key = conversation_key(&me, other_id);
        self.viewing.send_replace(Some(other_id.to_string()));
        tracing::info!("{} opened conversation {}", me, key);

        let view = ConversationView {
            messages: self.store.stream_visible_messages(&key, &me),
            metadata: self.store.stream_conversation(&key),
            typing: TypingSignaler::new(self.store.clone(), &key, &me, self.store.settings().typing_idle()),
            composer: Composer::new(self.store.clone(), &key, &me),
            store: self.store.clone(),
            viewing: self.viewing.clone(),
            key,
            me,
            other_id: other_id.to_string(),
            active: true,
        };
        view.mark_read().await;
        Ok(view)
    }
}

/// One open conversation
pub struct ConversationView {
    store: ChatStore,
    viewing: Arc<watch::Sender<Option<String>>>,
    key: String,
    me: String,
    other_id: String,
    messages: MessageStream,
    metadata: ConversationStream,
    typing: TypingSignaler,
    composer: Composer,
    active: bool,
}

impl ConversationView {
    /// Conversation key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The other participant
    pub fn other_id(&self) -> &str {
        &self.other_id
    }

    /// Whether the view is still open
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Composer holding the draft and pending reply
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Wait for the next list of visible messages
    ///
    /// Anything unread from the other side is marked read before returning,
    /// since the user is looking at it.
    pub async fn next_messages(&mut self) -> Result<Vec<Message>> {
        self.ensure_active()?;
        let mut messages = self.messages.next().await?;

        let unread = self.active && has_unread_from(&messages, &self.me, &self.other_id);
        if unread && self.mark_read().await {
            for message in messages.iter_mut().filter(|m| m.is_from(&self.other_id)) {
                message.mark_read();
            }
        }
        Ok(messages)
    }

    /// Wait for the next conversation document (typing, watermarks, preview)
    pub async fn next_metadata(&mut self) -> Result<Option<Conversation>> {
        self.ensure_active()?;
        self.metadata.next().await
    }

    /// Whether the other participant is typing according to `conversation`
    pub fn other_is_typing(&self, conversation: &Conversation) -> bool {
        conversation.is_typing(&self.other_id)
    }

    /// Record new input box content
    pub async fn input_changed(&mut self, text: &str) -> Result<()> {
        self.ensure_active()?;
        self.composer.set_draft(text);
        self.typing.input_changed().await;
        Ok(())
    }

    /// Send the draft
    ///
    /// The typing signal is withdrawn first. On failure the draft and any
    /// pending reply stay in the composer.
    pub async fn send(&mut self) -> Result<MessageId> {
        self.ensure_active()?;
        self.typing.message_sent().await;
        self.composer.send().await
    }

    /// Quote `message` in the next send, snapshotting its sender's current name
    pub async fn reply_to(&mut self, message: &Message) -> Result<()> {
        self.ensure_active()?;
        let sender_name = self
            .store
            .load_profile(&message.sender_id)
            .await?
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| message.sender_id.clone());
        self.composer.begin_reply(message, sender_name)
    }

    /// Drop the pending reply
    pub fn cancel_reply(&mut self) {
        self.composer.cancel_reply();
    }

    /// Delete `message` for me or for everyone
    pub async fn delete(&self, message: &Message, scope: DeleteScope) -> Result<()> {
        self.ensure_active()?;
        self.composer.delete(message, scope).await
    }

    /// Resolve a reply preview's message id
    pub async fn jump_to(&self, message_id: &str) -> Result<JumpTarget> {
        self.ensure_active()?;
        self.composer.jump_to(message_id).await
    }

    /// Clear the history for me
    pub async fn clear_history(&self) -> Result<i64> {
        self.ensure_active()?;
        self.store.clear_history(&self.key, &self.me).await
    }

    /// Close the view, withdrawing any typing signal
    pub async fn close(mut self) {
        if self.active {
            self.typing.stop().await;
        }
        self.deactivate();
    }

    /// Best effort; returns whether the read marks were stored
    async fn mark_read(&self) -> bool {
        if !self.active {
            return false;
        }
        match self
            .store
            .mark_conversation_read(&self.key, &self.me, &self.other_id)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to mark {} read for {}: {}", self.key, self.me, e);
                false
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(Error::SubscriptionClosed)
        }
    }

    pub(crate) fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let other_id = self.other_id.as_str();
        self.viewing.send_if_modified(|viewing| {
            if viewing.as_deref() == Some(other_id) {
                *viewing = None;
                true
            } else {
                false
            }
        });
        tracing::info!("{} closed conversation {}", self.me, self.key);
    }
}

impl Drop for ConversationView {
    fn drop(&mut self) {
        // TypingSignaler cancels its own timer when dropped
        self.deactivate();
    }
}
