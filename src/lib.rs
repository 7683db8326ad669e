//! Campus Chat - direct messaging core
//!
//! This library provides the state machine behind one-to-one chats on the
//! campus social platform: conversation keys, message storage with soft and
//! hard deletion, unread accounting and read receipts, typing signals, and
//! the ranked chat list.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chat_list;
pub mod compose;
pub mod identity;
pub mod messages;
pub mod metadata;
pub mod receipts;
pub mod session;
pub mod storage;
pub mod store;
pub mod typing;

pub use identity::{conversation_key, IdentityProvider, StaticIdentity};
pub use session::{ChatSession, ConversationView};
pub use store::{ChatStore, StoreEvent};

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for chat operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected before touching the store (blank text, malformed id)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller is not allowed to perform the operation
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Referenced document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage operation error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Realtime subscription was closed by the store
    #[error("Subscription closed")]
    SubscriptionClosed,

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl Error {
    /// Whether the failure came from the store being unavailable
    ///
    /// Transient failures are never retried here; every operation can be
    /// re-invoked by the caller without duplicate effects.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Storage(_) | Error::Io(_) | Error::SubscriptionClosed
        )
    }
}

/// Initialize logging
///
/// Uses `RUST_LOG` when set, otherwise `default_filter`
/// (for example [`storage::ChatSettings::log_filter`]).
pub fn init(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests;
