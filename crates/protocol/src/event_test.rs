//! Tests for the event model

use super::*;
use serde_json::{Map, Value, json};

#[test]
fn test_track_serializes_with_camel_case_fields() {
    let mut event = Event::track("Order Completed");
    event.anonymous_id = "anon-1".into();
    event.assign_message_id("m-1");

    let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "track");
    assert_eq!(json["event"], "Order Completed");
    assert_eq!(json["anonymousId"], "anon-1");
    assert_eq!(json["messageId"], "m-1");
    assert!(json.get("userId").is_none());
}

#[test]
fn test_message_id_assigned_once() {
    let mut event = Event::track("a");
    assert!(event.message_id().is_none());
    assert!(event.assign_message_id("first"));
    assert!(!event.assign_message_id("second"));
    assert_eq!(event.message_id(), Some("first"));
}

#[test]
fn test_round_trip_keeps_payload() {
    let mut props = Map::new();
    props.insert("price".into(), json!(9.99));
    let event = Event::track("Purchase").with_properties(props);

    let parsed = Event::from_json(&event.to_json().unwrap()).unwrap();
    assert_eq!(parsed, event);
    assert_eq!(parsed.payload["properties"]["price"], json!(9.99));
}

#[test]
fn test_identify_carries_user_and_traits() {
    let mut traits = Map::new();
    traits.insert("email".into(), json!("a@b.c"));
    let event = Event::identify("user-1").with_traits(traits);

    assert_eq!(event.event_type, EventType::Identify);
    assert_eq!(event.user_id.as_deref(), Some("user-1"));
    assert_eq!(event.traits().unwrap()["email"], "a@b.c");
}

#[test]
fn test_integration_enabled_rules() {
    let mut event = Event::track("a");
    assert!(event.integration_enabled("Segment.io"));

    event.integrations.insert("Segment.io".into(), json!(false));
    assert!(!event.integration_enabled("Segment.io"));

    event.integrations.clear();
    event.integrations.insert("All".into(), json!(false));
    assert!(!event.integration_enabled("Segment.io"));

    event.integrations.insert("Segment.io".into(), json!({"apiKey": "x"}));
    assert!(event.integration_enabled("Segment.io"));
}

#[test]
fn test_event_type_names() {
    for (t, name) in [
        (EventType::Track, "track"),
        (EventType::Identify, "identify"),
        (EventType::Screen, "screen"),
        (EventType::Group, "group"),
        (EventType::Alias, "alias"),
        (EventType::Page, "page"),
    ] {
        assert_eq!(t.as_str(), name);
        assert_eq!(serde_json::to_value(t).unwrap(), json!(name));
    }
}

#[test]
fn test_from_json_rejects_unknown_type() {
    assert!(Event::from_json(r#"{"type":"bogus"}"#).is_err());
}
