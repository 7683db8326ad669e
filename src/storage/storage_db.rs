//! SQLite-based document store
//!
//! This module provides the persistent backend for chat documents: user
//! profiles, conversations with their per-participant state, and messages.
//! Every operation that touches more than one row runs inside a single
//! transaction, so a crash can never leave an unread counter out of step
//! with the messages it counts.

use crate::{
    identity::{participants_of, validate_user_id},
    storage::{
        conversation::Conversation,
        message::{Message, ReplySnapshot},
        profile::UserProfile,
    },
    Error, Result,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, conversation_key, sender_id, text, created_at, read, is_deleted,
     reply_id, reply_text, reply_sender_name";

/// SQLite-based storage manager
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Create a new storage instance with a database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        let mut storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory storage instance (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("Failed to create in-memory database: {}", e)))?;

        let mut storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize database schema
    fn init_schema(&mut self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                uid TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                avatar_url TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS blocked_users (
                uid TEXT NOT NULL,
                blocked_uid TEXT NOT NULL,
                PRIMARY KEY (uid, blocked_uid)
            )",
            [],
        )?;

        // Conversation documents; last_message_at stays NULL until the first send
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS conversations (
                key TEXT PRIMARY KEY,
                participant_a TEXT NOT NULL,
                participant_b TEXT NOT NULL,
                last_message TEXT,
                last_message_at INTEGER
            )",
            [],
        )?;

        // Per-participant entries of the unread/typing/cleared_at maps
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS conversation_members (
                conversation_key TEXT NOT NULL,
                user_id TEXT NOT NULL,
                unread_count INTEGER NOT NULL DEFAULT 0 CHECK (unread_count >= 0),
                typing INTEGER NOT NULL DEFAULT 0,
                cleared_at INTEGER,
                PRIMARY KEY (conversation_key, user_id),
                FOREIGN KEY (conversation_key) REFERENCES conversations(key) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_key TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                reply_id TEXT,
                reply_text TEXT,
                reply_sender_name TEXT,
                FOREIGN KEY (conversation_key) REFERENCES conversations(key) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS message_deleted_for (
                message_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                PRIMARY KEY (message_id, user_id),
                FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
             ON messages(conversation_key, created_at)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_unread
             ON messages(conversation_key, sender_id, read)",
            [],
        )?;

        Ok(())
    }

    // ========== Profiles ==========

    /// Save or update a user profile
    ///
    /// Block entries are only ever added here; use [`Storage::block_user`]
    /// for single additions.
    pub fn upsert_profile(&mut self, profile: &UserProfile) -> Result<()> {
        validate_user_id(&profile.uid)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO users (uid, name, avatar_url) VALUES (?1, ?2, ?3)
             ON CONFLICT(uid) DO UPDATE SET name = excluded.name, avatar_url = excluded.avatar_url",
            params![&profile.uid, &profile.name, &profile.avatar_url],
        )?;
        for blocked in &profile.blocked_users {
            tx.execute(
                "INSERT OR IGNORE INTO blocked_users (uid, blocked_uid) VALUES (?1, ?2)",
                params![&profile.uid, blocked],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Load a single profile
    pub fn load_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT uid, name, avatar_url FROM users WHERE uid = ?1",
                params![uid],
                row_to_profile,
            )
            .optional()?;

        let Some(mut profile) = profile else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT blocked_uid FROM blocked_users WHERE uid = ?1")?;
        profile.blocked_users = stmt
            .query_map(params![uid], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<_, _>>()?;

        Ok(Some(profile))
    }

    /// Load every profile except `exclude_uid` (the caller)
    pub fn load_roster(&self, exclude_uid: &str) -> Result<Vec<UserProfile>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uid, name, avatar_url FROM users WHERE uid != ?1 ORDER BY uid")?;
        let mut roster = stmt
            .query_map(params![exclude_uid], row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare("SELECT uid, blocked_uid FROM blocked_users")?;
        let mut blocked: HashMap<String, Vec<String>> = HashMap::new();
        for row in stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            let (uid, blocked_uid) = row?;
            blocked.entry(uid).or_default().push(blocked_uid);
        }

        for profile in &mut roster {
            if let Some(list) = blocked.remove(&profile.uid) {
                profile.blocked_users.extend(list);
            }
        }

        Ok(roster)
    }

    /// Add `target` to `uid`'s block list (idempotent)
    pub fn block_user(&mut self, uid: &str, target: &str) -> Result<()> {
        validate_user_id(uid)?;
        validate_user_id(target)?;
        if uid == target {
            return Err(Error::Validation("users cannot block themselves".to_string()));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO blocked_users (uid, blocked_uid) VALUES (?1, ?2)",
            params![uid, target],
        )?;
        Ok(())
    }

    // ========== Conversations ==========

    /// Load a conversation with its per-participant state
    pub fn load_conversation(&self, key: &str) -> Result<Option<Conversation>> {
        load_conversation_in(&self.conn, key)
    }

    /// Load every conversation `user_id` takes part in that has at least one message
    pub fn load_conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn.prepare(
            "SELECT key FROM conversations
             WHERE (participant_a = ?1 OR participant_b = ?1)
               AND last_message_at IS NOT NULL
             ORDER BY key",
        )?;
        let keys = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut conversations = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(conversation) = load_conversation_in(&self.conn, &key)? {
                conversations.push(conversation);
            }
        }
        Ok(conversations)
    }

    /// Set `user_id`'s typing flag (creates the conversation document if needed)
    pub fn set_typing(&mut self, key: &str, user_id: &str, is_typing: bool) -> Result<()> {
        let (first, second) = member_pair(key, user_id)?;

        let tx = self.conn.transaction()?;
        ensure_conversation(&tx, key, &first, &second)?;
        tx.execute(
            "UPDATE conversation_members SET typing = ?3
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, user_id, is_typing],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Reset `user_id`'s unread counter to zero (creates the conversation document if needed)
    pub fn reset_unread(&mut self, key: &str, user_id: &str) -> Result<()> {
        let (first, second) = member_pair(key, user_id)?;

        let tx = self.conn.transaction()?;
        ensure_conversation(&tx, key, &first, &second)?;
        tx.execute(
            "UPDATE conversation_members SET unread_count = 0
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, user_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Advance `user_id`'s history watermark
    ///
    /// The watermark is never earlier than the newest message, so everything
    /// sent so far is hidden, and never moves backwards. The user's unread
    /// counter drops to zero since nothing it counted is visible any more.
    ///
    /// # Returns
    /// The new watermark
    pub fn clear_history(&mut self, key: &str, user_id: &str) -> Result<i64> {
        let (first, second) = member_pair(key, user_id)?;

        let tx = self.conn.transaction()?;
        ensure_conversation(&tx, key, &first, &second)?;
        let newest: Option<i64> = tx.query_row(
            "SELECT MAX(created_at) FROM messages WHERE conversation_key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        let previous = member_cleared_at(&tx, key, user_id)?;
        let watermark = [Some(now_ms()), newest, previous]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or_default();

        tx.execute(
            "UPDATE conversation_members SET cleared_at = ?3, unread_count = 0
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, user_id, watermark],
        )?;
        tx.commit()?;
        Ok(watermark)
    }

    /// Recompute `user_id`'s unread counter from the messages themselves
    ///
    /// # Returns
    /// The recomputed count
    pub fn reconcile_unread(&mut self, key: &str, user_id: &str) -> Result<u32> {
        let (first, second) = member_pair(key, user_id)?;

        let tx = self.conn.transaction()?;
        ensure_conversation(&tx, key, &first, &second)?;
        let watermark = member_cleared_at(&tx, key, user_id)?.unwrap_or(i64::MIN);
        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM messages m
             WHERE m.conversation_key = ?1
               AND m.sender_id != ?2
               AND m.read = 0
               AND m.is_deleted = 0
               AND m.created_at > ?3
               AND NOT EXISTS (
                   SELECT 1 FROM message_deleted_for d
                   WHERE d.message_id = m.id AND d.user_id = ?2
               )",
            params![key, user_id, watermark],
            |row| row.get(0),
        )?;
        let count = u32::try_from(count).unwrap_or(u32::MAX);

        tx.execute(
            "UPDATE conversation_members SET unread_count = ?3
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, user_id, count],
        )?;
        tx.commit()?;
        Ok(count)
    }

    // ========== Messages ==========

    /// Append a message and update the conversation in one transaction
    ///
    /// Creates the conversation on first send, sets the last-message preview,
    /// increments the recipient's unread counter and clears the sender's
    /// typing flag.
    ///
    /// # Errors
    /// - `Error::Validation` if `text` is blank or the key is malformed
    /// - `Error::Permission` if `sender_id` is not a participant
    pub fn append_message(
        &mut self,
        key: &str,
        sender_id: &str,
        text: &str,
        reply_to: Option<ReplySnapshot>,
    ) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(Error::Validation("message text must not be empty".to_string()));
        }
        let (first, second) = member_pair(key, sender_id)?;
        let recipient = if sender_id == first { &second } else { &first };

        let tx = self.conn.transaction()?;
        ensure_conversation(&tx, key, &first, &second)?;

        // Strictly after the newest message and after any watermark, so a
        // message sent in the same millisecond as a clear stays visible
        let floor: Option<i64> = tx.query_row(
            "SELECT MAX(v) FROM (
                 SELECT MAX(created_at) AS v FROM messages WHERE conversation_key = ?1
                 UNION ALL
                 SELECT MAX(cleared_at) AS v FROM conversation_members WHERE conversation_key = ?1
             )",
            params![key],
            |row| row.get(0),
        )?;
        let created_at = match floor {
            Some(floor) => now_ms().max(floor + 1),
            None => now_ms(),
        };

        let message = Message::new(
            Uuid::new_v4().to_string(),
            key.to_string(),
            sender_id.to_string(),
            text.to_string(),
            created_at,
        )
        .with_reply(reply_to);
        let reply = message.reply_to.as_ref();

        tx.execute(
            "INSERT INTO messages (id, conversation_key, sender_id, text, created_at, read, is_deleted,
                                   reply_id, reply_text, reply_sender_name)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?7, ?8)",
            params![
                &message.id,
                key,
                sender_id,
                &message.text,
                created_at,
                reply.map(|r| r.id.as_str()),
                reply.map(|r| r.text.as_str()),
                reply.map(|r| r.sender_name.as_str()),
            ],
        )?;
        tx.execute(
            "UPDATE conversations SET last_message = ?2, last_message_at = ?3 WHERE key = ?1",
            params![key, &message.text, created_at],
        )?;
        tx.execute(
            "UPDATE conversation_members SET unread_count = unread_count + 1
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, recipient],
        )?;
        tx.execute(
            "UPDATE conversation_members SET typing = 0
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, sender_id],
        )?;
        tx.commit()?;

        Ok(message)
    }

    /// Load one message of a conversation
    pub fn load_message(&self, key: &str, message_id: &str) -> Result<Option<Message>> {
        load_message_in(&self.conn, key, message_id)
    }

    /// Load all messages of a conversation, oldest first
    pub fn load_messages(&self, key: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM messages WHERE conversation_key = ?1 ORDER BY created_at ASC",
            MESSAGE_COLUMNS
        ))?;
        let mut messages = stmt
            .query_map(params![key], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT d.message_id, d.user_id FROM message_deleted_for d
             JOIN messages m ON m.id = d.message_id
             WHERE m.conversation_key = ?1",
        )?;
        let mut deleted_for: HashMap<String, Vec<String>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            let (message_id, user_id) = row?;
            deleted_for.entry(message_id).or_default().push(user_id);
        }

        for message in &mut messages {
            if let Some(users) = deleted_for.remove(&message.id) {
                message.deleted_for.extend(users);
            }
        }

        Ok(messages)
    }

    /// Hide a message for `user_id` only (idempotent)
    ///
    /// If the message was still counted in the user's unread badge, the
    /// counter is decremented in the same transaction.
    pub fn delete_message_for(&mut self, key: &str, message_id: &str, user_id: &str) -> Result<Message> {
        member_pair(key, user_id)?;

        let tx = self.conn.transaction()?;
        let mut message = load_message_in(&tx, key, message_id)?
            .ok_or_else(|| Error::NotFound(format!("message {}", message_id)))?;
        if message.is_hidden_for(user_id) {
            return Ok(message);
        }

        let watermark = member_cleared_at(&tx, key, user_id)?;
        if message.counts_as_unread_for(user_id, watermark) {
            decrement_unread(&tx, key, user_id)?;
        }

        tx.execute(
            "INSERT OR IGNORE INTO message_deleted_for (message_id, user_id) VALUES (?1, ?2)",
            params![message_id, user_id],
        )?;
        tx.commit()?;

        message.deleted_for.insert(user_id.to_string());
        Ok(message)
    }

    /// Replace a message with `tombstone` for everyone
    ///
    /// Only the sender may do this. An already deleted message is returned
    /// unchanged.
    ///
    /// # Errors
    /// - `Error::NotFound` if the message does not exist
    /// - `Error::Permission` if `requester_id` is not the sender; nothing is written
    pub fn delete_message_for_everyone(
        &mut self,
        key: &str,
        message_id: &str,
        requester_id: &str,
        tombstone: &str,
    ) -> Result<Message> {
        let tx = self.conn.transaction()?;
        let mut message = load_message_in(&tx, key, message_id)?
            .ok_or_else(|| Error::NotFound(format!("message {}", message_id)))?;

        if !message.is_from(requester_id) {
            return Err(Error::Permission(format!(
                "only the sender can delete message {} for everyone",
                message_id
            )));
        }
        if message.is_deleted {
            return Ok(message);
        }

        let (first, second) = member_pair(key, requester_id)?;
        let recipient = if requester_id == first { second } else { first };
        let watermark = member_cleared_at(&tx, key, &recipient)?;
        if message.counts_as_unread_for(&recipient, watermark) {
            decrement_unread(&tx, key, &recipient)?;
        }

        message.tombstone(tombstone);
        tx.execute(
            "UPDATE messages
             SET text = ?2, is_deleted = 1, reply_id = NULL, reply_text = NULL, reply_sender_name = NULL
             WHERE id = ?1",
            params![message_id, &message.text],
        )?;
        // Keep the deleted text out of the chat list preview
        tx.execute(
            "UPDATE conversations SET last_message = ?2
             WHERE key = ?1 AND last_message_at = ?3",
            params![key, &message.text, message.created_at],
        )?;
        tx.commit()?;

        Ok(message)
    }

    /// Mark every unread message from `other_id` as read and reset `reader_id`'s counter
    ///
    /// Both changes commit together; with nothing to flip only the counter reset happens.
    ///
    /// # Returns
    /// Number of messages flipped to read
    pub fn mark_conversation_read(&mut self, key: &str, reader_id: &str, other_id: &str) -> Result<usize> {
        let (first, second) = member_pair(key, reader_id)?;
        if reader_id == other_id || (other_id != first && other_id != second) {
            return Err(Error::Validation(format!(
                "{} is not the other participant of {}",
                other_id, key
            )));
        }

        let tx = self.conn.transaction()?;
        ensure_conversation(&tx, key, &first, &second)?;
        tx.execute(
            "UPDATE conversation_members SET unread_count = 0
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, reader_id],
        )?;
        let flipped = tx.execute(
            "UPDATE messages SET read = 1
             WHERE conversation_key = ?1 AND sender_id = ?2 AND read = 0",
            params![key, other_id],
        )?;
        tx.commit()?;

        Ok(flipped)
    }
}

/// Current time in Unix milliseconds
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse `key` and check that `user_id` is one of its participants
/// Only canonical keys are accepted.
fn member_pair(key: &str, user_id: &str) -> Result<(String, String)> {
    let (first, second) = participants_of(key)
        .ok_or_else(|| Error::Validation(format!("malformed conversation key '{}'", key)))?;
    validate_user_id(&first)?;
    validate_user_id(&second)?;
    if user_id != first && user_id != second {
        return Err(Error::Permission(format!(
            "{} is not a participant of {}",
            user_id, key
        )));
    }
    Ok((first, second))
}

/// Create the conversation document and both member rows if missing
fn ensure_conversation(conn: &Connection, key: &str, first: &str, second: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO conversations (key, participant_a, participant_b) VALUES (?1, ?2, ?3)",
        params![key, first, second],
    )?;
    for user_id in [first, second] {
        conn.execute(
            "INSERT OR IGNORE INTO conversation_members (conversation_key, user_id) VALUES (?1, ?2)",
            params![key, user_id],
        )?;
    }
    Ok(())
}

fn member_cleared_at(conn: &Connection, key: &str, user_id: &str) -> Result<Option<i64>> {
    let cleared_at = conn
        .query_row(
            "SELECT cleared_at FROM conversation_members
             WHERE conversation_key = ?1 AND user_id = ?2",
            params![key, user_id],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()?;
    Ok(cleared_at.flatten())
}

fn decrement_unread(conn: &Connection, key: &str, user_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE conversation_members SET unread_count = MAX(unread_count - 1, 0)
         WHERE conversation_key = ?1 AND user_id = ?2",
        params![key, user_id],
    )?;
    Ok(())
}

fn load_conversation_in(conn: &Connection, key: &str) -> Result<Option<Conversation>> {
    let conversation = conn
        .query_row(
            "SELECT key, participant_a, participant_b, last_message, last_message_at
             FROM conversations WHERE key = ?1",
            params![key],
            |row| {
                let mut conversation = Conversation::new(row.get(0)?, row.get(1)?, row.get(2)?);
                conversation.last_message = row.get(3)?;
                conversation.last_message_at = row.get(4)?;
                Ok(conversation)
            },
        )
        .optional()?;

    let Some(mut conversation) = conversation else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id, unread_count, typing, cleared_at
         FROM conversation_members WHERE conversation_key = ?1",
    )?;
    for row in stmt.query_map(params![key], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, u32>(1)?,
            row.get::<_, bool>(2)?,
            row.get::<_, Option<i64>>(3)?,
        ))
    })? {
        let (user_id, unread, typing, cleared_at) = row?;
        conversation.unread_count.insert(user_id.clone(), unread);
        conversation.typing.insert(user_id.clone(), typing);
        if let Some(cleared_at) = cleared_at {
            conversation.cleared_at.insert(user_id, cleared_at);
        }
    }

    Ok(Some(conversation))
}

fn load_message_in(conn: &Connection, key: &str, message_id: &str) -> Result<Option<Message>> {
    let message = conn
        .query_row(
            &format!(
                "SELECT {} FROM messages WHERE conversation_key = ?1 AND id = ?2",
                MESSAGE_COLUMNS
            ),
            params![key, message_id],
            row_to_message,
        )
        .optional()?;

    let Some(mut message) = message else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT user_id FROM message_deleted_for WHERE message_id = ?1")?;
    message.deleted_for = stmt
        .query_map(params![message_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<_, _>>()?;

    Ok(Some(message))
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let reply_id: Option<String> = row.get(7)?;
    let reply_to = match reply_id {
        Some(id) => Some(ReplySnapshot {
            id,
            text: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            sender_name: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        }),
        None => None,
    };

    let mut message = Message::new(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?);
    message.read = row.get(5)?;
    message.is_deleted = row.get(6)?;
    message.reply_to = reply_to;
    Ok(message)
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    let mut profile = UserProfile::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?);
    profile.avatar_url = row.get(2)?;
    Ok(profile)
}

impl Storage {
    /// Create storage at the configured path, creating its directory if needed
    pub fn open_configured(settings: &crate::storage::ChatSettings) -> Result<Self> {
        let path = Path::new(&settings.database_path);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    Error::Storage(format!("Failed to create database directory: {}", e))
                })?;
            }
        }
        Self::new(path)
    }
}
