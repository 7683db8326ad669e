//! Shared test helpers

use crate::storage::{Storage, UserProfile};
use crate::{conversation_key, ChatStore};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const CAROL: &str = "carol";

/// Conversation key between alice and bob
pub fn alice_bob() -> String {
    conversation_key(ALICE, BOB)
}

/// Profiles for alice, bob and carol
pub fn profiles() -> Vec<UserProfile> {
    vec![
        UserProfile::new(ALICE, "Alice"),
        UserProfile::new(BOB, "Bob"),
        UserProfile::new(CAROL, "carol"),
    ]
}

/// In-memory storage with the three test users
pub fn seeded_storage() -> Storage {
    let mut storage = Storage::new_in_memory().expect("Failed to create storage");
    for profile in profiles() {
        storage.upsert_profile(&profile).expect("Failed to save profile");
    }
    storage
}

/// In-memory store with the three test users
pub async fn seeded_store() -> ChatStore {
    let store = ChatStore::in_memory().expect("Failed to create store");
    for profile in profiles() {
        store.upsert_profile(&profile).await.expect("Failed to save profile");
    }
    store
}
