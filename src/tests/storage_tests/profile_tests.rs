// Profile Tests - Testing UserProfile

use crate::storage::UserProfile;

#[test]
fn test_profile_creation() {
    let profile = UserProfile::new("alice", "Alice").with_avatar("https://cdn.example/alice.png");

    assert_eq!(profile.uid, "alice");
    assert_eq!(profile.display_name(), "Alice");
    assert_eq!(profile.avatar_url.as_deref(), Some("https://cdn.example/alice.png"));
    assert!(profile.blocked_users.is_empty());
}

#[test]
fn test_display_name_falls_back_to_uid() {
    let profile = UserProfile::new("u_42", "   ");
    assert_eq!(profile.display_name(), "u_42");
}

#[test]
fn test_has_blocked() {
    let mut profile = UserProfile::new("alice", "Alice");
    profile.blocked_users.insert("bob".to_string());

    assert!(profile.has_blocked("bob"));
    assert!(!profile.has_blocked("carol"));
}
