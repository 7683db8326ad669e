//! Shared chat store handle with realtime change notifications
//!
//! `ChatStore` is the async face of the SQLite [`Storage`]: a cloneable
//! handle that serializes access to the database and fans out a
//! [`StoreEvent`] to every subscriber after each committed change. The
//! component modules (`messages`, `metadata`, `receipts`) add their
//! operations to it.

use crate::{
    identity::participants_of,
    storage::{ChatSettings, Conversation, Storage, UserProfile},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Change notification published after a write commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A message of the conversation was added or mutated
    MessagesChanged {
        /// Conversation key
        conversation_key: String,
    },
    /// The conversation document (preview, unread, typing, watermarks) changed
    ConversationChanged {
        /// Conversation key
        conversation_key: String,
    },
    /// A user profile or block list changed
    RosterChanged,
}

impl StoreEvent {
    /// Whether the event touches the messages of `key`
    pub fn affects_messages_of(&self, key: &str) -> bool {
        matches!(self, StoreEvent::MessagesChanged { conversation_key } if conversation_key == key)
    }

    /// Whether the event touches the conversation document of `key`
    pub fn affects_conversation(&self, key: &str) -> bool {
        matches!(self, StoreEvent::ConversationChanged { conversation_key } if conversation_key == key)
    }

    /// Whether the event matters for `user_id`'s chat list
    pub fn affects_chat_list_of(&self, user_id: &str) -> bool {
        match self {
            StoreEvent::RosterChanged => true,
            StoreEvent::ConversationChanged { conversation_key } => participants_of(conversation_key)
                .map(|(a, b)| a == user_id || b == user_id)
                .unwrap_or(false),
            StoreEvent::MessagesChanged { .. } => false,
        }
    }
}

/// Cloneable handle to the chat database and its event hub
///
/// # Example
/// ```rust,no_run
/// use campuschat::ChatStore;
/// use campuschat::storage::ChatSettings;
///
/// # fn example() -> campuschat::Result<()> {
/// let settings = ChatSettings::load("chat_settings.json")?;
/// campuschat::init(&settings.log_filter);
///
/// let store = ChatStore::open(settings)?;
/// let mut events = store.subscribe();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChatStore {
    db: Arc<Mutex<Storage>>,
    events: broadcast::Sender<StoreEvent>,
    settings: Arc<ChatSettings>,
}

impl ChatStore {
    /// Wrap an opened storage backend
    pub fn new(storage: Storage, settings: ChatSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));
        Self {
            db: Arc::new(Mutex::new(storage)),
            events,
            settings: Arc::new(settings),
        }
    }

    /// Open the database file named in `settings`
    pub fn open(settings: ChatSettings) -> Result<Self> {
        let storage = Storage::open_configured(&settings)?;
        tracing::info!("Opened chat database at {}", settings.database_path);
        Ok(Self::new(storage, settings))
    }

    /// Create a store backed by an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Storage::new_in_memory()?, ChatSettings::default()))
    }

    /// Active settings
    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Subscribe to raw change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Run `f` against the database while holding the store lock
    pub(crate) async fn with_db<T>(&self, f: impl FnOnce(&mut Storage) -> Result<T>) -> Result<T> {
        let mut db = self.db.lock().await;
        f(&mut *db)
    }

    /// Notify subscribers; having none is not an error
    pub(crate) fn publish(&self, event: StoreEvent) {
        tracing::trace!(?event, "publishing store event");
        let _ = self.events.send(event);
    }

    /// Notify subscribers that both the messages and the document of `key` changed
    pub(crate) fn publish_conversation_write(&self, key: &str) {
        self.publish(StoreEvent::MessagesChanged {
            conversation_key: key.to_string(),
        });
        self.publish(StoreEvent::ConversationChanged {
            conversation_key: key.to_string(),
        });
    }

    pub(crate) fn cursor(&self) -> EventCursor {
        EventCursor {
            rx: self.events.subscribe(),
        }
    }

    // ========== Profiles ==========

    /// Save or update a user profile
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.with_db(|db| db.upsert_profile(profile)).await?;
        self.publish(StoreEvent::RosterChanged);
        Ok(())
    }

    /// Load a single profile
    pub async fn load_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.with_db(|db| db.load_profile(uid)).await
    }

    /// Load every profile except `exclude_uid`
    pub async fn load_roster(&self, exclude_uid: &str) -> Result<Vec<UserProfile>> {
        self.with_db(|db| db.load_roster(exclude_uid)).await
    }

    /// Add `target` to `uid`'s block list
    pub async fn block_user(&self, uid: &str, target: &str) -> Result<()> {
        self.with_db(|db| db.block_user(uid, target)).await?;
        tracing::info!("{} blocked {}", uid, target);
        self.publish(StoreEvent::RosterChanged);
        Ok(())
    }

    /// Load a conversation document
    pub async fn load_conversation(&self, key: &str) -> Result<Option<Conversation>> {
        self.with_db(|db| db.load_conversation(key)).await
    }

    /// Load every conversation with history that `user_id` takes part in
    pub async fn conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>> {
        self.with_db(|db| db.load_conversations_for(user_id)).await
    }
}

/// Position in the store's event stream
///
/// Created before the first snapshot is read, so no change committed after
/// that read can be missed.
pub(crate) struct EventCursor {
    rx: broadcast::Receiver<StoreEvent>,
}

impl EventCursor {
    /// Wait until an event accepted by `relevant` arrives
    ///
    /// Events already queued behind it are drained so a burst of writes
    /// yields a single refresh. Falling behind the channel counts as a change.
    pub(crate) async fn changed(&mut self, relevant: impl Fn(&StoreEvent) -> bool) -> Result<()> {
        loop {
            match self.rx.recv().await {
                Ok(event) if relevant(&event) => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("subscriber lagged by {} events, refreshing", skipped);
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => return Err(Error::SubscriptionClosed),
            }
        }

        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        Ok(())
    }
}
