//! Chat list aggregation
//!
//! Joins the roster with the caller's conversations into two partitions:
//! people the caller has talked to, newest conversation first, and everyone
//! else, alphabetically. The list is recomputed whenever a profile, a block
//! list, one of the caller's conversations, or the open conversation changes.

use crate::{
    storage::{Conversation, UserProfile},
    store::{ChatStore, EventCursor},
    Error, Result,
};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::watch;

/// One row of the chat list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListEntry {
    /// The other user
    pub profile: UserProfile,
    /// Preview of the newest message (interacted rows only)
    pub last_message: Option<String>,
    /// Timestamp of the newest message (interacted rows only)
    pub last_message_at: Option<i64>,
    /// Unread badge
    pub unread: u32,
    /// Whether the other user is typing right now
    pub is_typing: bool,
    /// Whether the caller has blocked this user
    pub is_blocked: bool,
}

impl ChatListEntry {
    fn suggested(profile: &UserProfile) -> Self {
        Self {
            profile: profile.clone(),
            last_message: None,
            last_message_at: None,
            unread: 0,
            is_typing: false,
            is_blocked: false,
        }
    }

    /// Whether the row should show an unread badge
    pub fn has_unread(&self) -> bool {
        self.unread > 0
    }

    /// Text shown under the name
    pub fn preview(&self) -> &str {
        match (&self.last_message_at, &self.last_message) {
            (None, _) => "Start conversation",
            (Some(_), Some(text)) if !text.trim().is_empty() => text,
            (Some(_), _) => "Attachment",
        }
    }
}

/// The caller's chat list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatList {
    /// Users with an existing conversation, newest first
    pub interacted: Vec<ChatListEntry>,
    /// Users without a conversation, by display name
    pub suggested: Vec<ChatListEntry>,
}

impl ChatList {
    /// Total unread messages across all rows
    pub fn total_unread(&self) -> u32 {
        self.interacted.iter().map(|e| e.unread).sum()
    }

    /// Find the row for `uid` in either partition
    pub fn entry(&self, uid: &str) -> Option<&ChatListEntry> {
        self.interacted
            .iter()
            .chain(self.suggested.iter())
            .find(|e| e.profile.uid == uid)
    }

    /// Flag rows of users in `blocked`
    pub fn mark_blocked(&mut self, blocked: &BTreeSet<String>) {
        for entry in self.interacted.iter_mut().chain(self.suggested.iter_mut()) {
            entry.is_blocked = blocked.contains(&entry.profile.uid);
        }
    }
}

/// Build the chat list for `caller_id`
///
/// - Conversations whose other participant is missing from the roster are
///   skipped; the two inputs come from independent subscriptions and may
///   briefly disagree.
/// - Interacted rows are ordered by `last_message_at` descending, ties by uid.
/// - Suggested rows are ordered by display name (case-insensitive), ties by uid.
/// - The row of `viewing` (the user whose conversation is open) always shows
///   zero unread, even before the stored counter has been reset.
pub fn build_chat_list(
    caller_id: &str,
    roster: &[UserProfile],
    conversations: &[Conversation],
    viewing: Option<&str>,
) -> ChatList {
    let by_uid: HashMap<&str, &UserProfile> = roster
        .iter()
        .filter(|p| p.uid != caller_id)
        .map(|p| (p.uid.as_str(), p))
        .collect();

    let mut interacted = Vec::new();
    let mut interacted_ids = HashSet::new();

    for conversation in conversations.iter().filter(|c| c.has_history()) {
        let Some(other_id) = conversation.other_participant(caller_id) else {
            continue;
        };
        let Some(profile) = by_uid.get(other_id) else {
            continue;
        };
        if !interacted_ids.insert(other_id) {
            continue;
        }

        let unread = if viewing == Some(other_id) {
            0
        } else {
            conversation.unread_for(caller_id)
        };

        interacted.push(ChatListEntry {
            profile: (*profile).clone(),
            last_message: conversation.last_message.clone(),
            last_message_at: conversation.last_message_at,
            unread,
            is_typing: conversation.is_typing(other_id),
            is_blocked: false,
        });
    }

    interacted.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| a.profile.uid.cmp(&b.profile.uid))
    });

    let mut suggested: Vec<ChatListEntry> = by_uid
        .values()
        .filter(|p| !interacted_ids.contains(p.uid.as_str()))
        .map(|p| ChatListEntry::suggested(p))
        .collect();
    suggested.sort_by(|a, b| compare_names(&a.profile, &b.profile));

    ChatList {
        interacted,
        suggested,
    }
}

fn compare_names(a: &UserProfile, b: &UserProfile) -> Ordering {
    a.display_name()
        .to_lowercase()
        .cmp(&b.display_name().to_lowercase())
        .then_with(|| a.display_name().cmp(b.display_name()))
        .then_with(|| a.uid.cmp(&b.uid))
}

/// Push-based chat list subscription
///
/// The first call to [`ChatListStream::next`] returns the current list; each
/// later call waits until the roster, one of the caller's conversations, or
/// the open conversation changes.
pub struct ChatListStream {
    store: ChatStore,
    caller_id: String,
    viewing: watch::Receiver<Option<String>>,
    cursor: EventCursor,
    primed: bool,
}

impl ChatListStream {
    /// Subscribe on behalf of `caller_id`, following the open conversation in `viewing`
    pub fn new(store: ChatStore, caller_id: &str, viewing: watch::Receiver<Option<String>>) -> Self {
        let cursor = store.cursor();
        Self {
            store,
            caller_id: caller_id.to_string(),
            viewing,
            cursor,
            primed: false,
        }
    }

    /// Wait for the next list
    pub async fn next(&mut self) -> Result<ChatList> {
        if self.primed {
            let caller_id = self.caller_id.clone();
            tokio::select! {
                changed = self.cursor.changed(|event| event.affects_chat_list_of(&caller_id)) => changed?,
                viewing = self.viewing.changed() => {
                    viewing.map_err(|_| Error::SubscriptionClosed)?;
                }
            }
        }
        self.primed = true;

        let viewing = self.viewing.borrow_and_update().clone();
        let roster = self.store.load_roster(&self.caller_id).await?;
        let conversations = self.store.conversations_for(&self.caller_id).await?;
        let blocked = self
            .store
            .load_profile(&self.caller_id)
            .await?
            .map(|p| p.blocked_users)
            .unwrap_or_default();

        let mut list = build_chat_list(&self.caller_id, &roster, &conversations, viewing.as_deref());
        list.mark_blocked(&blocked);

        tracing::debug!(
            "Chat list for {}: {} interacted, {} suggested",
            self.caller_id,
            list.interacted.len(),
            list.suggested.len()
        );
        Ok(list)
    }
}
