//! Typing indicator debounce
//!
//! The local "am I typing" flag always wins while the idle timer is
//! running; once the timer fires the stored flag is authoritative again.
//! Publishing is best effort: a failed write is logged and the indicator
//! simply falls back to "not typing".

use crate::store::ChatStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Debounced typing signal for one user in one conversation
///
/// # Example
/// ```rust,no_run
/// use campuschat::{conversation_key, ChatStore};
/// use campuschat::typing::TypingSignaler;
///
/// # async fn example() -> campuschat::Result<()> {
/// let store = ChatStore::in_memory()?;
/// let key = conversation_key("alice", "bob");
/// let mut typing = TypingSignaler::new(store.clone(), &key, "alice", store.settings().typing_idle());
///
/// typing.input_changed().await; // publishes typing=true, starts the idle timer
/// typing.input_changed().await; // only restarts the timer
/// typing.message_sent().await;  // cancels the timer, publishes typing=false
/// # Ok(())
/// # }
/// ```
pub struct TypingSignaler {
    store: ChatStore,
    key: String,
    user_id: String,
    idle: Duration,
    is_typing: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
}

impl TypingSignaler {
    /// Create a signaler that withdraws "typing" after `idle` without input
    pub fn new(store: ChatStore, key: &str, user_id: &str, idle: Duration) -> Self {
        Self {
            store,
            key: key.to_string(),
            user_id: user_id.to_string(),
            idle,
            is_typing: Arc::new(AtomicBool::new(false)),
            timer: None,
        }
    }

    /// Local typing flag
    pub fn is_typing(&self) -> bool {
        self.is_typing.load(Ordering::SeqCst)
    }

    /// Record a change in the input box
    ///
    /// Publishes `true` on the first keystroke after idle, then (re)starts
    /// the idle timer.
    pub async fn input_changed(&mut self) {
        // Cancel first so a pending expiry cannot overwrite the `true` below
        self.cancel_timer();

        if !self.is_typing.swap(true, Ordering::SeqCst) {
            publish(&self.store, &self.key, &self.user_id, true).await;
        }

        let store = self.store.clone();
        let key = self.key.clone();
        let user_id = self.user_id.clone();
        let is_typing = self.is_typing.clone();
        let idle = self.idle;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            is_typing.store(false, Ordering::SeqCst);
            publish(&store, &key, &user_id, false).await;
        }));
    }

    /// Cancel the timer and force-publish `false`, whatever the local state
    pub async fn message_sent(&mut self) {
        self.cancel_timer();
        self.is_typing.store(false, Ordering::SeqCst);
        publish(&self.store, &self.key, &self.user_id, false).await;
    }

    /// Tear down: cancel the timer and withdraw a pending "typing" signal
    pub async fn stop(&mut self) {
        self.cancel_timer();
        if self.is_typing.swap(false, Ordering::SeqCst) {
            publish(&self.store, &self.key, &self.user_id, false).await;
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for TypingSignaler {
    fn drop(&mut self) {
        self.cancel_timer();

        // Dropped mid-typing without `stop()`: withdraw the signal in the background
        if self.is_typing.swap(false, Ordering::SeqCst) {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let store = self.store.clone();
                let key = std::mem::take(&mut self.key);
                let user_id = std::mem::take(&mut self.user_id);
                handle.spawn(async move {
                    publish(&store, &key, &user_id, false).await;
                });
            }
        }
    }
}

async fn publish(store: &ChatStore, key: &str, user_id: &str, is_typing: bool) {
    if let Err(e) = store.set_typing(key, user_id, is_typing).await {
        tracing::warn!("Failed to publish typing={} for {} in {}: {}", is_typing, user_id, key, e);
    }
}
