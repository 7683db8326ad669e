//! Local storage module
//!
//! This module holds the persisted chat documents and the SQLite backend
//! that stores them:
//! - `profile` - User profiles and block lists
//! - `conversation` - Per-conversation aggregate (last message, unread, typing, watermarks)
//! - `message` - Messages, reply snapshots and per-user visibility
//! - `settings` - Chat configuration
//! - `storage_db` - SQLite document store with transactional writes

pub mod conversation;
pub mod message;
pub mod profile;
pub mod settings;
pub mod storage_db;

pub use conversation::{Conversation, ConversationState};
pub use message::{Message, ReplySnapshot, TOMBSTONE_TEXT};
pub use profile::UserProfile;
pub use settings::ChatSettings;
pub use storage_db::Storage;
