//! Bridge integration tests - host event sequences through the full
//! handler/filter/transform/enricher pipeline into a capturing adapter.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

use ui_bridge::events::registry::{native, ui, MOUNTED_HOST_EVENTS};
use ui_bridge::events::translation::truncate;
use ui_bridge::events::PatternSet;
use ui_bridge::{MockAdapter, UiBridge, UiCommand, UiEvent};

async fn bridge_with(options: Value) -> (UiBridge, Arc<MockAdapter>) {
    let bridge = UiBridge::configure(options).unwrap();
    let mock = Arc::new(MockAdapter::new());
    bridge.attach_adapter(mock.clone()).await;
    (bridge, mock)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn sample_payload(event_name: &str) -> Value {
    match event_name {
        native::CONTENT_BLOCK_START => json!({"block_type": "thinking", "block_index": 0}),
        native::CONTENT_BLOCK_DELTA => json!({"block_index": 0, "delta": {"thinking": "hmm"}}),
        native::CONTENT_BLOCK_END => json!({
            "block_index": 0,
            "block": {"type": "thinking", "thinking": "done"},
            "usage": {"input_tokens": 1, "output_tokens": 2},
        }),
        native::TOOL_PRE | native::TOOL_POST => json!({"tool_name": "bash", "result": "ok"}),
        native::ORCHESTRATOR_COMPLETE => json!({"content": "final answer"}),
        _ => json!({"prompt": "hi", "error": "boom"}),
    }
}

fn pattern_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(vec![
            "*", "tool:*", "tool:pre", "session:*", "content_block:*", "error", "orchestrator:*",
            "thinking:*",
        ]),
        0..4,
    )
    .prop_map(|v| v.into_iter().map(String::from).collect())
}

proptest! {
    #[test]
    fn prop_gated_events_never_emit(
        patterns in pattern_strategy(),
        event_name in prop::sample::select(MOUNTED_HOST_EVENTS.to_vec()),
    ) {
        let gate = PatternSet::new(patterns.iter().map(String::as_str));
        let emitted = runtime().block_on(async {
            let (bridge, mock) = bridge_with(json!({"events": patterns})).await;
            bridge.handle_host_event(event_name, &sample_payload(event_name)).await;
            mock.events().len()
        });
        if !gate.matches(event_name) {
            prop_assert_eq!(emitted, 0);
        }
    }

    #[test]
    fn prop_always_true_filter_changes_nothing(
        names in prop::collection::vec(prop::sample::select(MOUNTED_HOST_EVENTS.to_vec()), 1..12),
    ) {
        let (plain, filtered) = runtime().block_on(async {
            let (plain, plain_mock) = bridge_with(json!({"preset": "verbose"})).await;
            let (filtered, filtered_mock) = bridge_with(json!({"preset": "verbose"})).await;
            filtered.register_filter(|_: &UiEvent| true).await;

            for name in &names {
                let payload = sample_payload(name);
                plain.handle_host_event(name, &payload).await;
                filtered.handle_host_event(name, &payload).await;
            }
            let shape = |events: Vec<UiEvent>| -> Vec<(String, Value)> {
                events
                    .into_iter()
                    .map(|e| {
                        let mut data = e.data;
                        data.remove("duration_ms");
                        data.remove("started_at");
                        (e.event_type, Value::Object(data))
                    })
                    .collect()
            };
            (shape(plain_mock.events()), shape(filtered_mock.events()))
        });
        prop_assert_eq!(plain, filtered);
    }

    #[test]
    fn prop_truncate_keeps_prefix_and_counts_rest(text in "\\PC{0,80}", max_len in 1usize..40) {
        let out = truncate(&text, max_len);
        let total = text.chars().count();
        if total <= max_len {
            prop_assert_eq!(out, text);
        } else {
            let prefix: String = text.chars().take(max_len).collect();
            prop_assert!(out.starts_with(&prefix));
            let suffix = format!("... ({} more chars)", total - max_len);
            prop_assert!(out.ends_with(&suffix));
        }
    }
}

#[tokio::test]
async fn test_tool_call_correlation_and_duration() {
    let (bridge, mock) = bridge_with(json!({})).await;

    bridge
        .handle_host_event("tool:pre", &json!({"tool_name": "grep", "tool_input": {"pattern": "fn"}}))
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    bridge
        .handle_host_event(
            "tool:post",
            &json!({"tool_name": "grep", "tool_response": {"success": true, "output": "3 matches"}}),
        )
        .await;

    let start = mock.assert_event_emitted(ui::TOOL_START, &json!({"tool_name": "grep"}));
    let result = mock.assert_event_emitted(
        ui::TOOL_RESULT,
        &json!({"tool_name": "grep", "success": true, "output": "3 matches"}),
    );
    assert_eq!(result.parent_event_id, Some(start.event_id));
    assert!(result.data["duration_ms"].as_u64().is_some());
}

#[tokio::test]
async fn test_thinking_block_scenario() {
    let (bridge, mock) = bridge_with(json!({})).await;

    bridge
        .handle_host_event(
            "content_block:start",
            &json!({"block_type": "thinking", "block_index": 0, "session_id": "s1"}),
        )
        .await;
    bridge
        .handle_host_event("content_block:delta", &json!({"block_index": 0, "delta": {"thinking": "hm"}}))
        .await;
    bridge
        .handle_host_event(
            "content_block:end",
            &json!({
                "block_index": 0,
                "block": {"type": "thinking", "thinking": "Let me check"},
                "usage": {"input_tokens": 12, "output_tokens": 30},
            }),
        )
        .await;

    let types: Vec<String> = mock.events().into_iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![ui::THINKING_START, ui::THINKING_END, ui::TOKEN_USAGE]);

    let start = mock.last_event_of_type(ui::THINKING_START).unwrap();
    let end = mock.assert_event_emitted(ui::THINKING_END, &json!({"content": "Let me check"}));
    assert_eq!(end.parent_event_id, Some(start.event_id));
    mock.assert_event_emitted(ui::TOKEN_USAGE, &json!({"input_tokens": 12, "output_tokens": 30}));
}

#[tokio::test]
async fn test_truncation_applies_to_tool_output() {
    let (bridge, mock) = bridge_with(json!({"display": {"truncate_output": 20}})).await;
    bridge
        .handle_host_event(
            "tool:post",
            &json!({"tool_name": "cat", "tool_response": {"output": "a".repeat(50)}}),
        )
        .await;

    let result = mock.last_event_of_type(ui::TOOL_RESULT).unwrap();
    assert_eq!(
        result.data["output"],
        format!("{}... (30 more chars)", "a".repeat(20))
    );
}

#[tokio::test]
async fn test_history_keeps_most_recent_events() {
    let (bridge, _mock) =
        bridge_with(json!({"history": {"enabled": true, "max_events": 5}})).await;
    for i in 0..10 {
        bridge.emit_custom("notification", json!({"n": i})).await;
    }

    let history = bridge.history();
    assert_eq!(history.len(), 5);
    let ns: Vec<i64> = history.iter().map(|e| e.data["n"].as_i64().unwrap()).collect();
    assert_eq!(ns, vec![5, 6, 7, 8, 9]);
}

#[tokio::test]
async fn test_history_replay_reaches_new_adapter() {
    let (bridge, first) = bridge_with(json!({"history": {"enabled": true}})).await;
    bridge.handle_host_event("session:start", &json!({"prompt": "hi"})).await;
    bridge.handle_host_event("tool:pre", &json!({"tool_name": "ls"})).await;

    let second = Arc::new(MockAdapter::new());
    bridge.attach_adapter(second.clone()).await;
    bridge.replay(bridge.history()).await;

    assert_eq!(first.events(), second.events());
}

#[tokio::test]
async fn test_minimal_preset_gates_to_results_and_errors() {
    let (bridge, mock) = bridge_with(json!({"preset": "minimal"})).await;

    bridge.handle_host_event("session:start", &json!({"prompt": "hi"})).await;
    bridge.handle_host_event("tool:pre", &json!({"tool_name": "ls"})).await;
    bridge
        .handle_host_event("tool:post", &json!({"tool_name": "ls", "result": "a b"}))
        .await;

    let types: Vec<String> = mock.events().into_iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![ui::TOOL_RESULT]);
}

#[tokio::test]
async fn test_full_pipeline_ordering() {
    let (bridge, mock) = bridge_with(json!({})).await;

    bridge
        .register_handler("tool:pre", |name: &str, payload: &Value, b: &UiBridge| {
            let mut event = b.default_translate(name, payload)?;
            event.data.insert("icon".into(), json!("wrench"));
            Some(event)
        })
        .await;
    bridge
        .register_filter(|e: &UiEvent| e.data.get("tool_name") != Some(&json!("secret")))
        .await;
    bridge
        .register_transform(|mut e: UiEvent| {
            e.data.insert("stamped".into(), json!(true));
            e
        })
        .await;
    bridge
        .register_enricher("tool:*", |_: &str, _: &Value, primary: &UiEvent| {
            vec![UiEvent::new(
                "status",
                json!({"after": primary.event_type}),
            )]
        })
        .await;

    bridge.handle_host_event("tool:pre", &json!({"tool_name": "secret"})).await;
    assert!(mock.events().is_empty());

    let primary = bridge
        .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
        .await
        .unwrap();
    assert_eq!(primary.data["icon"], "wrench");
    assert_eq!(primary.data["stamped"], true);

    let types: Vec<String> = mock.events().into_iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![ui::TOOL_START, "status"]);
    mock.assert_event_emitted("status", &json!({"after": ui::TOOL_START}));
}

#[tokio::test]
async fn test_command_round_trip() {
    let (bridge, _mock) = bridge_with(json!({})).await;
    bridge
        .register_command_handler("echo", |data: serde_json::Map<String, Value>| async move {
            Ok::<_, ui_bridge::Error>(Value::Object(data))
        })
        .await;

    let result = bridge
        .dispatch_command(&UiCommand::new("echo", json!({"x": 1})))
        .await
        .unwrap();
    assert_eq!(result, json!({"x": 1}));

    let err = bridge
        .dispatch_command(&UiCommand::new("nope", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_COMMAND");
}

#[tokio::test]
async fn test_native_mode_uses_host_names() {
    let (bridge, mock) = bridge_with(json!({"event_mode": "native"})).await;
    bridge.handle_host_event("tool:pre", &json!({"tool_name": "ls"})).await;
    bridge
        .handle_host_event("content_block:delta", &json!({"block_index": 1, "delta": {"text": "he"}}))
        .await;

    let types: Vec<String> = mock.events().into_iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![native::TOOL_PRE, native::CONTENT_BLOCK_DELTA]);
}
