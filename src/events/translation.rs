//! Default translation - host runtime events → outbound UI events.
//!
//! Deterministic mapping apart from id generation and the correlation maps,
//! which are read and written only here.
//!
//! Translation rules:
//!   session:start          → SESSION_START {prompt}
//!   session:end            → SESSION_END (full payload)
//!   content_block:start    → THINKING_START for thinking/reasoning blocks,
//!                            CONTENT_BLOCK_START otherwise (native only)
//!   content_block:delta    → CONTENT_BLOCK_DELTA / THINKING_DELTA (native only)
//!   thinking:delta         → THINKING_DELTA (native only)
//!   content_block:end      → THINKING_END (+ pending TOKEN_USAGE), or TOKEN_USAGE
//!   tool:pre               → TOOL_START
//!   tool:post              → TOOL_RESULT (parent = TOOL_START)
//!   orchestrator:complete  → MESSAGE_END when content is non-empty
//!   error*                 → ERROR (full payload)
//!   (all others)           → None

use serde_json::{json, Map, Value};

use super::correlation::CorrelationState;
use super::registry::{native, EventKind, NamingScheme};
use crate::schema::UiEvent;
use crate::types::{BridgeConfig, EventId};

/// Payload keys of `tool:post` that are not copied into TOOL_RESULT data.
const TOOL_POST_KNOWN_FIELDS: &[&str] = &[
    "tool_name",
    "tool_response",
    "result",
    "tool_input",
    "session_id",
];

/// Separator between parent session id and delegated agent name.
const AGENT_SEPARATOR: char = '_';

/// Output of the default translator for one host event.
#[derive(Debug, Default)]
pub struct Translation {
    /// The event returned to the caller and run through filters/transforms.
    pub primary: Option<UiEvent>,
    /// Secondary events emitted right after the primary one.
    pub pending: Vec<UiEvent>,
}

impl Translation {
    fn none() -> Self {
        Self::default()
    }

    fn primary(event: UiEvent) -> Self {
        Self {
            primary: Some(event),
            pending: Vec::new(),
        }
    }
}

/// Translate one host event.
pub fn translate_host_event(
    event_name: &str,
    payload: &Value,
    config: &BridgeConfig,
    scheme: NamingScheme,
    state: &mut CorrelationState,
) -> Translation {
    let ctx = Context::new(payload, config, scheme);

    match event_name {
        native::SESSION_START => {
            let prompt = payload.get("prompt").cloned().unwrap_or_else(|| json!(""));
            Translation::primary(ctx.event(EventKind::SessionStart, json!({ "prompt": prompt })))
        }

        native::SESSION_END => {
            Translation::primary(ctx.event(EventKind::SessionEnd, payload.clone()))
        }

        native::CONTENT_BLOCK_START => {
            let block_type = payload
                .get("block_type")
                .or_else(|| payload.pointer("/block/type"))
                .and_then(|v| v.as_str());
            let block_index = block_index(payload);

            if is_thinking(block_type) && config.display.show_thinking {
                let event_id = EventId::new();
                state.open_thinking(block_index, event_id.clone());

                let mut data = json!({ "block_index": block_index });
                if scheme == NamingScheme::Native {
                    data["block_type"] = json!(block_type);
                }
                return Translation::primary(
                    ctx.event(EventKind::ThinkingStart, data).with_event_id(event_id),
                );
            }

            match scheme {
                NamingScheme::Native => Translation::primary(ctx.event(
                    EventKind::ContentBlockStart,
                    json!({
                        "block_index": block_index,
                        "block_type": block_type,
                    }),
                )),
                // UI-friendly mode only surfaces thinking start/end
                NamingScheme::UiFriendly => Translation::none(),
            }
        }

        native::CONTENT_BLOCK_DELTA | native::THINKING_DELTA => {
            if scheme == NamingScheme::UiFriendly {
                return Translation::none();
            }

            let delta = payload.get("delta");
            let delta_type = delta.and_then(|d| d.get("type")).and_then(|v| v.as_str());
            let thinking = event_name == native::THINKING_DELTA
                || delta_type.is_some_and(|t| t.starts_with("thinking") || t.starts_with("reasoning"))
                || is_thinking(payload.get("block_type").and_then(|v| v.as_str()));

            if thinking && !config.display.show_thinking {
                return Translation::none();
            }

            let kind = if thinking {
                EventKind::ThinkingDelta
            } else {
                EventKind::ContentBlockDelta
            };
            Translation::primary(ctx.event(
                kind,
                json!({
                    "block_index": block_index(payload),
                    "text": delta_text(payload),
                }),
            ))
        }

        native::CONTENT_BLOCK_END => {
            let block_index = block_index(payload);
            let block = payload.get("block");
            let block_type = block
                .and_then(|b| b.get("type"))
                .or_else(|| payload.get("block_type"))
                .and_then(|v| v.as_str());
            let usage = payload.get("usage").filter(|u| is_present(u));

            if is_thinking(block_type) && config.display.show_thinking {
                let parent_id = state.close_thinking(block_index);
                let content = block
                    .and_then(|b| non_empty_str(b.get("thinking")).or_else(|| non_empty_str(b.get("text"))))
                    .unwrap_or("");

                let mut translation = Translation::primary(
                    ctx.event(
                        EventKind::ThinkingEnd,
                        json!({
                            "block_index": block_index,
                            "content": content,
                        }),
                    )
                    .with_parent(parent_id),
                );
                if let Some(usage) = usage {
                    translation.pending.push(ctx.token_usage(usage));
                }
                return translation;
            }

            match usage {
                Some(usage) => Translation::primary(ctx.token_usage(usage)),
                None => Translation::none(),
            }
        }

        native::TOOL_PRE => {
            let tool_name = tool_name(payload);
            let event_id = EventId::new();
            state.open_tool(tool_name, event_id.clone());

            let mut data = json!({ "tool_name": tool_name });
            if config.display.show_tool_arguments {
                let args = payload.get("tool_input").cloned().unwrap_or_else(|| json!({}));
                data["arguments"] = json!(truncate(&stringify(&args), config.display.truncate_output));
            }

            Translation::primary(ctx.event(EventKind::ToolStart, data).with_event_id(event_id))
        }

        native::TOOL_POST => {
            let tool_name = tool_name(payload);
            let open = state.close_tool(tool_name);

            let result = payload
                .get("tool_response")
                .or_else(|| payload.get("result"))
                .cloned()
                .unwrap_or_else(|| json!({}));
            let (success, output) = match &result {
                Value::Object(obj) => (
                    obj.get("success").and_then(|v| v.as_bool()).unwrap_or(true),
                    stringify(obj.get("output").unwrap_or(&result)),
                ),
                other => (true, stringify(other)),
            };

            // Custom fields first, so handlers can decorate the payload
            let mut data: Map<String, Value> = payload
                .as_object()
                .map(|obj| {
                    obj.iter()
                        .filter(|(k, _)| !TOOL_POST_KNOWN_FIELDS.contains(&k.as_str()))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default();

            data.insert("tool_name".to_string(), json!(tool_name));
            data.insert("success".to_string(), json!(success));
            if config.display.show_tool_output {
                data.insert(
                    "output".to_string(),
                    json!(truncate(&output, config.display.truncate_output)),
                );
            }
            if let Some(open) = &open {
                if config.display.include_duration {
                    data.insert("duration_ms".to_string(), json!(open.elapsed_ms()));
                }
                if config.display.include_timestamps {
                    data.insert("started_at".to_string(), json!(open.started_at.to_rfc3339()));
                }
            }

            Translation::primary(
                ctx.event(EventKind::ToolResult, Value::Object(data))
                    .with_parent(open.map(|o| o.event_id)),
            )
        }

        native::ORCHESTRATOR_COMPLETE => {
            let content = payload.get("content").filter(|c| is_present(c));
            match content {
                Some(content) => Translation::primary(ctx.event(
                    EventKind::MessageEnd,
                    json!({
                        "content": content,
                        "role": payload.get("role").and_then(|v| v.as_str()).unwrap_or("assistant"),
                        "turn_count": payload.get("turn_count"),
                        "status": payload.get("status"),
                        "orchestrator": payload.get("orchestrator"),
                    }),
                )),
                None => Translation::none(),
            }
        }

        name if name.starts_with("error") => {
            Translation::primary(ctx.event(EventKind::Error, payload.clone()))
        }

        // provider:*, approval:* and other host events are not forwarded
        _ => Translation::none(),
    }
}

/// Cut `text` to `max_len` characters, noting how many were omitted.
///
/// `max_len == 0` disables truncation.
pub fn truncate(text: &str, max_len: usize) -> String {
    if max_len == 0 {
        return text.to_string();
    }
    let total = text.chars().count();
    if total <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len).collect();
    format!("{}... ({} more chars)", kept, total - max_len)
}

/// Agent name encoded in a hierarchical session id (`parent_agent`).
pub fn parse_agent_name(session_id: Option<&str>) -> Option<String> {
    session_id?
        .split_once(AGENT_SEPARATOR)
        .map(|(_, agent)| agent)
        .filter(|agent| !agent.is_empty())
        .map(str::to_string)
}

/// Envelope fields shared by every event built for one host event.
struct Context<'a> {
    scheme: NamingScheme,
    session_id: Option<&'a str>,
    agent_name: Option<String>,
    indent: bool,
}

impl<'a> Context<'a> {
    fn new(payload: &'a Value, config: &BridgeConfig, scheme: NamingScheme) -> Self {
        let session_id = payload.get("session_id").and_then(|v| v.as_str());
        let agent_name = if config.agents.parse_agent_names {
            parse_agent_name(session_id)
        } else {
            None
        };
        Self {
            scheme,
            session_id,
            indent: config.agents.indent_sub_agents && agent_name.is_some(),
            agent_name,
        }
    }

    fn event(&self, kind: EventKind, data: Value) -> UiEvent {
        let hints = self.indent.then(|| {
            let mut hints = Map::new();
            hints.insert("indent".to_string(), json!(1));
            hints
        });
        UiEvent::new(kind.name(self.scheme), data)
            .with_session(self.session_id.map(str::to_string))
            .with_agent(self.agent_name.clone())
            .with_hints(hints)
    }

    fn token_usage(&self, usage: &Value) -> UiEvent {
        self.event(
            EventKind::TokenUsage,
            json!({
                "input_tokens": usage.get("input_tokens").cloned().unwrap_or_else(|| json!(0)),
                "output_tokens": usage.get("output_tokens").cloned().unwrap_or_else(|| json!(0)),
            }),
        )
    }
}

fn is_thinking(block_type: Option<&str>) -> bool {
    matches!(block_type, Some("thinking") | Some("reasoning"))
}

fn block_index(payload: &Value) -> Option<u64> {
    payload.get("block_index").and_then(|v| v.as_u64())
}

fn tool_name(payload: &Value) -> &str {
    payload
        .get("tool_name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

fn delta_text(payload: &Value) -> String {
    let delta = payload.get("delta");
    if let Some(Value::String(text)) = delta {
        return text.clone();
    }
    delta
        .and_then(|d| non_empty_str(d.get("text")).or_else(|| non_empty_str(d.get("thinking"))))
        .or_else(|| non_empty_str(payload.get("text")))
        .or_else(|| non_empty_str(payload.get("thinking")))
        .unwrap_or("")
        .to_string()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// Falsy values (null, empty string/array/object) count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

/// Strings pass through unquoted; everything else is compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
