// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::event::{event_type, Event};

use super::render_payload;

fn event() -> Event {
    let mut event = Event::new(event_type::TASK_ASSIGNED, "assigned t-1");
    event.id = "ev-1".into();
    event
}

#[test]
fn no_template_serializes_event_json() -> anyhow::Result<()> {
    let payload = render_payload(None, &event())?;
    let json: serde_json::Value = serde_json::from_str(&payload)?;
    assert_eq!(json["type"], "task_assigned");
    assert_eq!(json["id"], "ev-1");
    Ok(())
}

#[test]
fn blank_template_falls_back_to_json() -> anyhow::Result<()> {
    let payload = render_payload(Some("   "), &event())?;
    let json: serde_json::Value = serde_json::from_str(&payload)?;
    assert_eq!(json["type"], "task_assigned");
    Ok(())
}

#[test]
fn template_interpolates_event_fields() -> anyhow::Result<()> {
    let template = r#"{"text": "{{ type }}: {{ message }}"}"#;
    let payload = render_payload(Some(template), &event())?;
    assert_eq!(payload, r#"{"text": "task_assigned: assigned t-1"}"#);
    Ok(())
}

#[test]
fn json_escape_filter_escapes_quotes() -> anyhow::Result<()> {
    let mut event = event();
    event.message = "said \"hi\"\nthen left".into();
    let template = r#"{"text": "{{ message | json_escape }}"}"#;
    let payload = render_payload(Some(template), &event)?;
    // The rendered payload must itself be valid JSON.
    let json: serde_json::Value = serde_json::from_str(&payload)?;
    assert_eq!(json["text"], "said \"hi\"\nthen left");
    Ok(())
}

#[test]
fn json_filter_marshals_values() -> anyhow::Result<()> {
    let mut event = event();
    event.details = Some(serde_json::json!({"count": 3}));
    let template = r#"{"details": {{ details | json }}}"#;
    let payload = render_payload(Some(template), &event)?;
    let json: serde_json::Value = serde_json::from_str(&payload)?;
    assert_eq!(json["details"]["count"], 3);
    Ok(())
}

#[test]
fn json_filter_marshals_strings_with_quotes() -> anyhow::Result<()> {
    let template = r#"{"message": {{ message | json }}}"#;
    let payload = render_payload(Some(template), &event())?;
    assert_eq!(payload, r#"{"message": "assigned t-1"}"#);
    Ok(())
}

#[test]
fn parse_error_is_reported() {
    let broken = "{{ unclosed";
    let result = render_payload(Some(broken), &event());
    assert!(result.is_err());
}

#[test]
fn unknown_variable_is_a_render_error() {
    let result = render_payload(Some("{{ no_such_field }}"), &event());
    assert!(result.is_err());
}
