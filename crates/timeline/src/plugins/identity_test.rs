//! Tests for identity tracking

use beacon_protocol::WriteKey;
use serde_json::json;

use super::*;

fn storage() -> Arc<BatchStore> {
    Arc::new(BatchStore::in_memory(WriteKey::new("wk").unwrap()))
}

#[test]
fn test_load_mints_and_persists_anonymous_id() {
    let storage = storage();
    let plugin = IdentityPlugin::load(storage.clone()).unwrap();

    let anon = plugin.user_info().anonymous_id.clone();
    assert!(!anon.is_empty());
    assert_eq!(storage.read(StorageKey::AnonymousId), Some(anon.clone()));

    // A second load reuses the stored id
    let again = IdentityPlugin::load(storage).unwrap();
    assert_eq!(again.user_info().anonymous_id, anon);
}

#[tokio::test]
async fn test_stamps_identity_on_track() {
    let plugin = IdentityPlugin::load(storage()).unwrap();

    let event = plugin
        .execute(Event::track("opened"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(event.anonymous_id, plugin.user_info().anonymous_id);
    assert_eq!(event.user_id, None);
}

#[tokio::test]
async fn test_identify_updates_and_persists() {
    let storage = storage();
    let plugin = IdentityPlugin::load(storage.clone()).unwrap();

    let mut traits = Map::new();
    traits.insert("plan".to_string(), json!("pro"));
    plugin
        .execute(Event::identify("user-1").with_traits(traits))
        .await
        .unwrap();

    let info = plugin.user_info();
    assert_eq!(info.user_id.as_deref(), Some("user-1"));
    assert_eq!(info.traits["plan"], "pro");
    assert_eq!(storage.read(StorageKey::UserId).as_deref(), Some("user-1"));

    // Later events carry the user id
    let event = plugin
        .execute(Event::track("opened"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.user_id.as_deref(), Some("user-1"));

    // Reloaded from storage
    let reloaded = IdentityPlugin::load(storage).unwrap();
    assert_eq!(reloaded.user_info().user_id.as_deref(), Some("user-1"));
    assert_eq!(reloaded.user_info().traits["plan"], "pro");
}

#[tokio::test]
async fn test_alias_fills_previous_id() {
    let plugin = IdentityPlugin::load(storage()).unwrap();
    plugin.execute(Event::identify("old")).await.unwrap();

    let event = plugin
        .execute(Event::alias("new"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(event.payload["previousId"], "old");
    assert_eq!(event.user_id.as_deref(), Some("new"));
    assert_eq!(plugin.user_info().user_id.as_deref(), Some("new"));
}

#[tokio::test]
async fn test_alias_without_user_uses_anonymous_id() {
    let plugin = IdentityPlugin::load(storage()).unwrap();
    let anon = plugin.user_info().anonymous_id.clone();

    let event = plugin
        .execute(Event::alias("new"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(event.payload["previousId"], anon.as_str());
}

#[tokio::test]
async fn test_reset_forgets_user() {
    let storage = storage();
    let plugin = IdentityPlugin::load(storage.clone()).unwrap();
    plugin.execute(Event::identify("user-1")).await.unwrap();
    let old_anon = plugin.user_info().anonymous_id.clone();

    plugin.reset().unwrap();

    let info = plugin.user_info();
    assert_eq!(info.user_id, None);
    assert!(info.traits.is_empty());
    assert_ne!(info.anonymous_id, old_anon);
    assert_eq!(storage.read(StorageKey::UserId), None);
    assert_eq!(
        storage.read(StorageKey::AnonymousId),
        Some(info.anonymous_id.clone())
    );
}

#[tokio::test]
async fn test_subscriber_observes_identify() {
    let plugin = IdentityPlugin::load(storage()).unwrap();
    let mut rx = plugin.subscribe();

    plugin.execute(Event::identify("user-2")).await.unwrap();

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().user_id.as_deref(), Some("user-2"));
}
