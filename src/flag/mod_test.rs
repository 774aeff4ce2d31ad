use super::*;

// =============================================================================
// MemoryFlagStore
// =============================================================================

#[test]
fn set_get_remove() {
    let store = MemoryFlagStore::new();
    assert!(store.get("f").is_none());
    store.set("f", "true", 7);
    assert_eq!(store.get("f").as_deref(), Some("true"));
    store.remove("f");
    assert!(store.get("f").is_none());
}

#[test]
fn entry_expires_after_ttl() {
    let store = MemoryFlagStore::new();
    store.set("f", "true", 7);
    let expires_at = store.expires_at("f").unwrap();

    let in_six_days = OffsetDateTime::now_utc() + Duration::days(6);
    assert_eq!(store.get_at("f", in_six_days).as_deref(), Some("true"));

    assert!(store.get_at("f", expires_at + Duration::seconds(1)).is_none());
    assert!(store.expires_at("f").is_none(), "expired entry should be dropped on read");
}

#[test]
fn set_refreshes_expiry() {
    let store = MemoryFlagStore::new();
    store.set("f", "true", 1);
    let first = store.expires_at("f").unwrap();
    store.set("f", "true", 7);
    assert!(store.expires_at("f").unwrap() > first);
}

// =============================================================================
// LoginFlag
// =============================================================================

#[test]
fn login_flag_from_config() {
    let flag = LoginFlag::from_config(&AuthConfig::default());
    assert_eq!(flag.name(), "admin-template-auth");
    assert_eq!(flag.ttl_days(), 7);
}

#[test]
fn mark_sets_and_clears() {
    let store = MemoryFlagStore::new();
    let flag = LoginFlag::new("auth", 7);
    assert!(!flag.is_set(&store));

    flag.mark(&store, true);
    assert!(flag.is_set(&store));
    assert_eq!(store.get("auth").as_deref(), Some(LoginFlag::VALUE));

    flag.mark(&store, false);
    assert!(!flag.is_set(&store));
}

#[test]
fn mark_uses_configured_lifetime() {
    let store = MemoryFlagStore::new();
    LoginFlag::new("auth", 7).mark(&store, true);
    let remaining = store.expires_at("auth").unwrap() - OffsetDateTime::now_utc();
    assert!(remaining > Duration::days(6));
    assert!(remaining <= Duration::days(7));
}
