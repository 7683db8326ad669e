// Storage DB Tests - Testing the SQLite document store

use crate::storage::{ChatSettings, ReplySnapshot, Storage, UserProfile, TOMBSTONE_TEXT};
use crate::tests::helpers::{alice_bob, seeded_storage, ALICE, BOB, CAROL};
use crate::Error;
use tempfile::TempDir;

// ========== Profiles ==========

#[test]
fn test_upsert_and_load_profile() {
    let mut storage = Storage::new_in_memory().expect("Failed to create storage");
    let profile = UserProfile::new(ALICE, "Alice").with_avatar("https://cdn.example/a.png");

    storage.upsert_profile(&profile).expect("Failed to save profile");
    let loaded = storage
        .load_profile(ALICE)
        .expect("Failed to load profile")
        .expect("Profile not found");

    assert_eq!(loaded, profile);
}

#[test]
fn test_upsert_profile_updates_name() {
    let mut storage = seeded_storage();

    storage
        .upsert_profile(&UserProfile::new(BOB, "Robert"))
        .expect("Failed to update profile");

    let loaded = storage.load_profile(BOB).unwrap().unwrap();
    assert_eq!(loaded.name, "Robert");
}

#[test]
fn test_load_missing_profile() {
    let storage = seeded_storage();
    assert!(storage.load_profile("nobody").unwrap().is_none());
}

#[test]
fn test_upsert_profile_rejects_invalid_uid() {
    let mut storage = Storage::new_in_memory().unwrap();
    let result = storage.upsert_profile(&UserProfile::new("a:b", "Broken"));
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn test_load_roster_excludes_caller() {
    let storage = seeded_storage();

    let roster = storage.load_roster(ALICE).expect("Failed to load roster");
    let uids: Vec<&str> = roster.iter().map(|p| p.uid.as_str()).collect();

    assert_eq!(uids, vec![BOB, CAROL]);
}

#[test]
fn test_block_user() {
    let mut storage = seeded_storage();

    storage.block_user(ALICE, BOB).expect("Failed to block");
    storage.block_user(ALICE, BOB).expect("Blocking twice must be a no-op");

    let alice = storage.load_profile(ALICE).unwrap().unwrap();
    assert!(alice.has_blocked(BOB));
    assert_eq!(alice.blocked_users.len(), 1);

    let roster = storage.load_roster(CAROL).unwrap();
    let alice_in_roster = roster.iter().find(|p| p.uid == ALICE).unwrap();
    assert!(alice_in_roster.has_blocked(BOB));
}

#[test]
fn test_block_self_rejected() {
    let mut storage = seeded_storage();
    assert!(matches!(storage.block_user(ALICE, ALICE), Err(Error::Validation(_))));
}

// ========== Conversations ==========

#[test]
fn test_conversation_absent_before_any_write() {
    let storage = seeded_storage();
    assert!(storage.load_conversation(&alice_bob()).unwrap().is_none());
    assert!(storage.load_conversations_for(ALICE).unwrap().is_empty());
}

#[test]
fn test_metadata_write_creates_conversation_without_history() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    storage.set_typing(&key, ALICE, true).expect("Failed to set typing");

    let conversation = storage.load_conversation(&key).unwrap().expect("Conversation created");
    assert!(conversation.is_typing(ALICE));
    assert!(!conversation.has_history());
    assert_eq!(conversation.unread_for(BOB), 0);

    // Not listed until a message is sent
    assert!(storage.load_conversations_for(ALICE).unwrap().is_empty());
}

#[test]
fn test_reset_unread_on_missing_conversation() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    storage.reset_unread(&key, BOB).expect("Reset must succeed without a conversation");
    storage.reset_unread(&key, BOB).expect("Reset must be idempotent");

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.unread_for(BOB), 0);
}

#[test]
fn test_metadata_write_by_outsider_rejected() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    assert!(matches!(storage.set_typing(&key, CAROL, true), Err(Error::Permission(_))));
    assert!(matches!(storage.reset_unread(&key, CAROL), Err(Error::Permission(_))));
    assert!(matches!(storage.clear_history(&key, CAROL), Err(Error::Permission(_))));
}

#[test]
fn test_malformed_key_rejected() {
    let mut storage = seeded_storage();

    assert!(matches!(storage.set_typing("alice", ALICE, true), Err(Error::Validation(_))));
    assert!(matches!(storage.set_typing("alice:alice", ALICE, true), Err(Error::Validation(_))));
}

#[test]
fn test_non_canonical_key_rejected() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    storage.append_message(&key, ALICE, "hi", None).unwrap();

    let reversed = format!("{}:{}", BOB, ALICE);
    assert!(matches!(
        storage.append_message(&reversed, BOB, "hey", None),
        Err(Error::Validation(_))
    ));
    assert!(matches!(storage.set_typing(&reversed, BOB, true), Err(Error::Validation(_))));
    assert!(matches!(storage.reset_unread(&reversed, BOB), Err(Error::Validation(_))));
    assert!(matches!(storage.clear_history(&reversed, BOB), Err(Error::Validation(_))));
    assert!(matches!(
        storage.mark_conversation_read(&reversed, BOB, ALICE),
        Err(Error::Validation(_))
    ));

    // Still exactly one conversation for the pair
    let conversations = storage.load_conversations_for(ALICE).unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].key, key);
    assert!(storage.load_conversation(&reversed).unwrap().is_none());
}

// ========== Messages ==========

#[test]
fn test_append_message_updates_conversation() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    storage.set_typing(&key, ALICE, true).unwrap();
    let message = storage
        .append_message(&key, ALICE, "hello", None)
        .expect("Failed to append");

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.last_message.as_deref(), Some("hello"));
    assert_eq!(conversation.last_message_at, Some(message.created_at));
    assert_eq!(conversation.unread_for(BOB), 1);
    assert_eq!(conversation.unread_for(ALICE), 0);
    assert!(!conversation.is_typing(ALICE), "sending clears the sender's typing flag");

    let listed = storage.load_conversations_for(BOB).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, key);
}

#[test]
fn test_append_rejects_blank_text() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    let result = storage.append_message(&key, ALICE, "   \n", None);

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(storage.load_conversation(&key).unwrap().is_none(), "nothing is written");
}

#[test]
fn test_append_by_outsider_rejected() {
    let mut storage = seeded_storage();
    let result = storage.append_message(&alice_bob(), CAROL, "hi", None);
    assert!(matches!(result, Err(Error::Permission(_))));
}

#[test]
fn test_created_at_strictly_increasing() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    let mut last = i64::MIN;
    for i in 0..20 {
        let sender = if i % 2 == 0 { ALICE } else { BOB };
        let message = storage.append_message(&key, sender, &format!("m{}", i), None).unwrap();
        assert!(message.created_at > last);
        last = message.created_at;
    }

    let loaded = storage.load_messages(&key).unwrap();
    assert_eq!(loaded.len(), 20);
    assert!(loaded.windows(2).all(|w| w[0].created_at < w[1].created_at));
    assert_eq!(loaded[0].text, "m0");
    assert_eq!(loaded[19].text, "m19");
}

#[test]
fn test_append_with_reply_persists_snapshot() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    let original = storage.append_message(&key, BOB, "lunch?", None).unwrap();
    let reply = storage
        .append_message(&key, ALICE, "sure", Some(ReplySnapshot::of(&original, "Bob")))
        .unwrap();

    let loaded = storage.load_message(&key, &reply.id).unwrap().unwrap();
    let snapshot = loaded.reply_to.expect("Reply snapshot missing");
    assert_eq!(snapshot.id, original.id);
    assert_eq!(snapshot.text, "lunch?");
    assert_eq!(snapshot.sender_name, "Bob");
}

#[test]
fn test_load_message_from_other_conversation() {
    let mut storage = seeded_storage();
    let message = storage.append_message(&alice_bob(), ALICE, "hi", None).unwrap();

    let other_key = crate::conversation_key(ALICE, CAROL);
    assert!(storage.load_message(&other_key, &message.id).unwrap().is_none());
}

// ========== Deletion ==========

#[test]
fn test_delete_for_self_hides_and_decrements_unread() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    let message = storage.append_message(&key, ALICE, "hi", None).unwrap();

    let deleted = storage.delete_message_for(&key, &message.id, BOB).unwrap();
    assert!(deleted.is_hidden_for(BOB));

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.unread_for(BOB), 0);

    // Idempotent: no second decrement, no duplicate entry
    storage.delete_message_for(&key, &message.id, BOB).unwrap();
    let loaded = storage.load_message(&key, &message.id).unwrap().unwrap();
    assert_eq!(loaded.deleted_for.len(), 1);
    assert!(!loaded.is_hidden_for(ALICE));
}

#[test]
fn test_delete_for_self_by_sender_keeps_recipient_unread() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    let message = storage.append_message(&key, ALICE, "hi", None).unwrap();

    storage.delete_message_for(&key, &message.id, ALICE).unwrap();

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.unread_for(BOB), 1);
}

#[test]
fn test_delete_for_self_missing_message() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    storage.append_message(&key, ALICE, "hi", None).unwrap();

    let result = storage.delete_message_for(&key, "nope", BOB);
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_delete_for_everyone() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    let original = storage.append_message(&key, BOB, "question", None).unwrap();
    let message = storage
        .append_message(&key, ALICE, "secret", Some(ReplySnapshot::of(&original, "Bob")))
        .unwrap();

    let deleted = storage
        .delete_message_for_everyone(&key, &message.id, ALICE, TOMBSTONE_TEXT)
        .expect("Sender may delete");

    assert!(deleted.is_deleted);
    assert_eq!(deleted.text, TOMBSTONE_TEXT);

    let loaded = storage.load_message(&key, &message.id).unwrap().unwrap();
    assert!(loaded.is_deleted);
    assert_eq!(loaded.text, TOMBSTONE_TEXT);
    assert!(loaded.reply_to.is_none());

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.unread_for(BOB), 0, "the deleted message no longer counts");
    assert_eq!(conversation.last_message.as_deref(), Some(TOMBSTONE_TEXT));
}

#[test]
fn test_delete_for_everyone_keeps_newer_preview() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    let first = storage.append_message(&key, ALICE, "first", None).unwrap();
    storage.append_message(&key, BOB, "second", None).unwrap();

    storage
        .delete_message_for_everyone(&key, &first.id, ALICE, TOMBSTONE_TEXT)
        .unwrap();

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.last_message.as_deref(), Some("second"));
}

#[test]
fn test_delete_for_everyone_by_recipient_rejected() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    let message = storage.append_message(&key, ALICE, "mine", None).unwrap();

    let result = storage.delete_message_for_everyone(&key, &message.id, BOB, TOMBSTONE_TEXT);
    assert!(matches!(result, Err(Error::Permission(_))));

    let loaded = storage.load_message(&key, &message.id).unwrap().unwrap();
    assert!(!loaded.is_deleted);
    assert_eq!(loaded.text, "mine");
    assert_eq!(storage.load_conversation(&key).unwrap().unwrap().unread_for(BOB), 1);
}

#[test]
fn test_delete_for_everyone_is_terminal() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    let message = storage.append_message(&key, ALICE, "oops", None).unwrap();

    storage
        .delete_message_for_everyone(&key, &message.id, ALICE, TOMBSTONE_TEXT)
        .unwrap();
    let again = storage
        .delete_message_for_everyone(&key, &message.id, ALICE, "other text")
        .unwrap();

    assert_eq!(again.text, TOMBSTONE_TEXT);
    assert_eq!(storage.load_conversation(&key).unwrap().unwrap().unread_for(BOB), 0);
}

#[test]
fn test_delete_for_everyone_missing_message() {
    let mut storage = seeded_storage();
    let result = storage.delete_message_for_everyone(&alice_bob(), "nope", ALICE, TOMBSTONE_TEXT);
    assert!(matches!(result, Err(Error::NotFound(_))));
}

// ========== Read receipts ==========

#[test]
fn test_mark_conversation_read() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    storage.append_message(&key, ALICE, "one", None).unwrap();
    storage.append_message(&key, ALICE, "two", None).unwrap();
    storage.append_message(&key, BOB, "mine", None).unwrap();

    let flipped = storage.mark_conversation_read(&key, BOB, ALICE).unwrap();
    assert_eq!(flipped, 2);

    let messages = storage.load_messages(&key).unwrap();
    assert!(messages.iter().filter(|m| m.is_from(ALICE)).all(|m| m.read));
    assert!(messages.iter().filter(|m| m.is_from(BOB)).all(|m| !m.read));

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.unread_for(BOB), 0);
    assert_eq!(conversation.unread_for(ALICE), 1);

    // Idempotent
    assert_eq!(storage.mark_conversation_read(&key, BOB, ALICE).unwrap(), 0);
}

#[test]
fn test_mark_conversation_read_wrong_other() {
    let mut storage = seeded_storage();
    let key = alice_bob();

    assert!(matches!(
        storage.mark_conversation_read(&key, BOB, CAROL),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        storage.mark_conversation_read(&key, BOB, BOB),
        Err(Error::Validation(_))
    ));
}

// ========== History clearing ==========

#[test]
fn test_clear_history_sets_watermark() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    let message = storage.append_message(&key, ALICE, "old", None).unwrap();

    let watermark = storage.clear_history(&key, BOB).unwrap();
    assert!(watermark >= message.created_at);

    let conversation = storage.load_conversation(&key).unwrap().unwrap();
    assert_eq!(conversation.cleared_at_for(BOB), Some(watermark));
    assert_eq!(conversation.cleared_at_for(ALICE), None);
    assert_eq!(conversation.unread_for(BOB), 0);

    // The messages themselves survive
    assert_eq!(storage.load_messages(&key).unwrap().len(), 1);
}

#[test]
fn test_clear_history_never_moves_backwards() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    storage.append_message(&key, ALICE, "old", None).unwrap();

    let first = storage.clear_history(&key, BOB).unwrap();
    let second = storage.clear_history(&key, BOB).unwrap();
    assert!(second >= first);
}

#[test]
fn test_append_after_clear_is_after_watermark() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    storage.append_message(&key, ALICE, "old", None).unwrap();

    let watermark = storage.clear_history(&key, BOB).unwrap();
    let fresh = storage.append_message(&key, ALICE, "new", None).unwrap();

    assert!(fresh.created_at > watermark);
    assert!(fresh.is_visible_to(BOB, Some(watermark)));
    assert_eq!(storage.load_conversation(&key).unwrap().unwrap().unread_for(BOB), 1);
}

#[test]
fn test_reconcile_unread() {
    let mut storage = seeded_storage();
    let key = alice_bob();
    storage.append_message(&key, ALICE, "one", None).unwrap();
    let two = storage.append_message(&key, ALICE, "two", None).unwrap();
    storage.append_message(&key, ALICE, "three", None).unwrap();

    // Simulate a client that reset the counter without flipping messages
    storage.reset_unread(&key, BOB).unwrap();
    assert_eq!(storage.load_conversation(&key).unwrap().unwrap().unread_for(BOB), 0);

    storage.delete_message_for(&key, &two.id, BOB).unwrap();
    let count = storage.reconcile_unread(&key, BOB).unwrap();

    assert_eq!(count, 2);
    assert_eq!(storage.load_conversation(&key).unwrap().unwrap().unread_for(BOB), 2);
}

// ========== Persistence ==========

#[test]
fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("chat.db");
    let key = alice_bob();

    let message_id = {
        let mut storage = Storage::new(&db_path).expect("Failed to open storage");
        storage.upsert_profile(&UserProfile::new(ALICE, "Alice")).unwrap();
        storage.append_message(&key, ALICE, "persisted", None).unwrap().id
    };

    let storage = Storage::new(&db_path).expect("Failed to reopen storage");
    let message = storage.load_message(&key, &message_id).unwrap().unwrap();
    assert_eq!(message.text, "persisted");
    assert_eq!(storage.load_conversation(&key).unwrap().unwrap().unread_for(BOB), 1);
    assert!(storage.load_profile(ALICE).unwrap().is_some());
}

#[test]
fn test_open_configured_creates_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("nested").join("dir").join("chat.db");

    let settings = ChatSettings {
        database_path: db_path.to_string_lossy().to_string(),
        ..ChatSettings::default()
    };

    Storage::open_configured(&settings).expect("Failed to open configured storage");
    assert!(db_path.exists());
}
