//! Conversation identity
//!
//! Every two-party conversation is addressed by a canonical key derived from
//! the two participant ids. The key is the same no matter which side derives
//! it, so both participants meet on the same conversation document.

use crate::{Error, Result};

/// Separator placed between the two ordered participant ids.
///
/// User ids are never allowed to contain it (see [`validate_user_id`]), which
/// keeps distinct pairs from colliding.
pub const KEY_SEPARATOR: char = ':';

/// Derive the canonical conversation key for two users
///
/// The ids are ordered lexicographically and joined with [`KEY_SEPARATOR`],
/// so `conversation_key(a, b) == conversation_key(b, a)`.
///
/// # Example
/// ```rust
/// use campuschat::identity::conversation_key;
///
/// assert_eq!(conversation_key("zoe", "adam"), "adam:zoe");
/// assert_eq!(conversation_key("adam", "zoe"), conversation_key("zoe", "adam"));
/// ```
pub fn conversation_key(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{}{}{}", first, KEY_SEPARATOR, second)
}

/// Split a conversation key back into its two participant ids
///
/// Returns `None` if the key was not produced by [`conversation_key`],
/// including keys whose ids are out of order or name one user twice.
pub fn participants_of(key: &str) -> Option<(String, String)> {
    let (first, second) = key.split_once(KEY_SEPARATOR)?;
    if first.is_empty() || second.is_empty() || second.contains(KEY_SEPARATOR) {
        return None;
    }
    // Only the canonical ordering addresses a conversation
    if first >= second {
        return None;
    }
    Some((first.to_string(), second.to_string()))
}

/// Return the participant of `key` that is not `me`
pub fn other_participant(key: &str, me: &str) -> Option<String> {
    let (first, second) = participants_of(key)?;
    if first == me {
        Some(second)
    } else if second == me {
        Some(first)
    } else {
        None
    }
}

/// Check that a user id can take part in a conversation key
///
/// # Errors
/// Returns `Error::Validation` if the id is empty, contains whitespace, or
/// contains the key separator.
pub fn validate_user_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::Validation("user id must not be empty".to_string()));
    }
    if id.contains(KEY_SEPARATOR) {
        return Err(Error::Validation(format!(
            "user id '{}' must not contain '{}'",
            id, KEY_SEPARATOR
        )));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(Error::Validation(format!(
            "user id '{}' must not contain whitespace",
            id
        )));
    }
    Ok(())
}

/// Source of the current caller's user id
///
/// Authentication itself happens elsewhere; the chat core only needs the
/// stable id of whoever is signed in.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user's id
    fn current_user_id(&self) -> &str;
}

/// Identity provider for an already-authenticated user id
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    uid: String,
}

impl StaticIdentity {
    /// Wrap a known user id, validating it first
    pub fn new(uid: impl Into<String>) -> Result<Self> {
        let uid = uid.into();
        validate_user_id(&uid)?;
        Ok(Self { uid })
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> &str {
        &self.uid
    }
}
