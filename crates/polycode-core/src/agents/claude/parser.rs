//! Claude stream-json classifier.
//!
//! # Event flow for one turn
//!
//! ```text
//! system/init
//! message_start
//!   content_block_start (thinking)   content_block_delta (thinking_delta)*   content_block_stop
//!   content_block_start (text)       content_block_delta (text_delta)*       content_block_stop
//!   content_block_start (tool_use)   content_block_delta (input_json_delta)* content_block_stop
//! message_delta (stop_reason) / message_stop
//! assistant          (one-shot snapshot of the whole message)
//! user               (tool results)
//! ...
//! result
//! ```
//!
//! Block events may be bare or wrapped in `stream_event`. Tool arguments are
//! buffered in [`ClassifierState::tool_buffer`] until their block stops.

use serde::Deserialize;
use serde_json::Value;

use crate::agents::display::{first_line, non_blank, truncate_chars};
use crate::agents::event::{Classification, ParsedUpdate, TitleHint};
use crate::agents::tools::render_tool;
use crate::agents::ClassifierState;

use super::buffer::ToolCallBuffer;
use super::types::{AssistantMessage, ClaudeStreamEvent};

const THINKING: &str = "Thinking";

/// Longest derived title, in characters, before the ellipsis.
const MAX_TITLE_CHARS: usize = 50;

/// Classify one Claude payload, updating the session's classifier state.
pub fn classify(payload: &Value, state: &mut ClassifierState) -> Classification {
    let event = match ClaudeStreamEvent::deserialize(payload) {
        Ok(event) => event,
        Err(_) => return Classification::empty(),
    };

    match event.event_type.as_str() {
        "stream_event" => match event.event.as_ref().map(|inner| ClaudeStreamEvent::deserialize(inner)) {
            Some(Ok(inner)) => classify_stream(&inner, state),
            _ => Classification::empty(),
        },

        "message_start" | "message_delta" | "message_stop" | "content_block_start"
        | "content_block_delta" | "content_block_stop" => classify_stream(&event, state),

        "system" => classify_system(&event),

        "assistant" => classify_assistant(&event, state),

        // Tool results flow back to the model; the turn is still running.
        "user" => Classification::status(THINKING),

        "result" => classify_result(&event, state),

        _ => Classification::empty(),
    }
}

fn classify_system(event: &ClaudeStreamEvent) -> Classification {
    if event.subtype.as_deref() != Some("init") {
        return Classification::empty();
    }
    let status = match non_blank(event.model.as_deref()) {
        Some(model) => format!("Initialized ({model})"),
        None => "Initialized".to_string(),
    };
    Classification {
        native_session_id: non_blank(event.session_id.as_deref()).map(str::to_string),
        ..Classification::status(status)
    }
}

// ============================================================================
// BLOCK STREAM
// ============================================================================

fn classify_stream(event: &ClaudeStreamEvent, state: &mut ClassifierState) -> Classification {
    match event.event_type.as_str() {
        "message_start" => Classification::status(THINKING),

        "content_block_start" => {
            let Some(block) = event.content_block.as_ref() else {
                return Classification::empty();
            };
            state.streaming = true;
            let mut classification = Classification::status(THINKING);
            if block.block_type == "tool_use" {
                // A start without a stop for the previous tool: keep what we have.
                if let Some(stale) = state.tool_buffer.take() {
                    log::debug!("Flushing unterminated tool call {}", stale.tool_name);
                    classification.updates.push(stale.finish());
                }
                let name = non_blank(block.name.as_deref()).unwrap_or("Tool");
                state.tool_buffer = Some(ToolCallBuffer::open(
                    name,
                    event.index,
                    block.input.as_ref(),
                ));
            }
            classification
        }

        "content_block_delta" => {
            let Some(delta) = event.delta.as_ref() else {
                return Classification::empty();
            };
            state.streaming = true;
            match delta.delta_type.as_str() {
                "text_delta" => match delta.text.as_deref().filter(|t| !t.is_empty()) {
                    Some(text) => {
                        state.final_text_reflected = true;
                        Classification::status(THINKING).with_update(ParsedUpdate::text_delta(text))
                    }
                    None => Classification::empty(),
                },
                "thinking_delta" => match delta.thinking.as_deref().filter(|t| !t.is_empty()) {
                    Some(thinking) => Classification::status(THINKING)
                        .with_update(ParsedUpdate::reasoning_delta(thinking)),
                    None => Classification::empty(),
                },
                "input_json_delta" => {
                    let fragment = delta.partial_json.as_deref().unwrap_or("");
                    match state.tool_buffer.as_mut() {
                        Some(buffer) => buffer.push(fragment),
                        None => log::debug!("Argument fragment with no open tool call"),
                    }
                    Classification::status(THINKING)
                }
                _ => Classification::empty(),
            }
        }

        "content_block_stop" => {
            let closes = state
                .tool_buffer
                .as_ref()
                .is_some_and(|buffer| buffer.closes_at(event.index));
            match state.tool_buffer.take_if(|_| closes) {
                Some(buffer) => Classification::empty().with_update(buffer.finish()),
                None => Classification::empty(),
            }
        }

        "message_delta" => {
            let stop_reason = event.delta.as_ref().and_then(|d| d.stop_reason.as_deref());
            match stop_reason {
                Some("tool_use") => Classification::status("Using tool"),
                Some("end_turn") => Classification::status("Finalizing response"),
                _ => Classification::status(THINKING),
            }
        }

        // The stop-reason status from message_delta stays until the next event.
        "message_stop" => Classification::empty(),

        _ => Classification::empty(),
    }
}

// ============================================================================
// ONE-SHOT MESSAGES
// ============================================================================

/// Decompose a complete assistant message. Reasoning collapses into one
/// entry, each tool call gets its own, text collapses into one.
fn classify_assistant(event: &ClaudeStreamEvent, state: &mut ClassifierState) -> Classification {
    let mut classification = Classification::status(THINKING);

    // Block events already delivered this content piece by piece.
    if state.streaming {
        return classification;
    }

    let Some(message) = event
        .message
        .as_ref()
        .and_then(|m| AssistantMessage::deserialize(m).ok())
    else {
        return classification;
    };

    let mut thinking = Vec::new();
    let mut tools = Vec::new();
    let mut texts = Vec::new();
    for block in &message.content {
        match block.block_type.as_str() {
            "thinking" => thinking.extend(non_blank(block.thinking.as_deref())),
            "text" => texts.extend(non_blank(block.text.as_deref())),
            "tool_use" => {
                let name = non_blank(block.name.as_deref()).unwrap_or("Tool");
                let input = block.input.clone().unwrap_or(Value::Null);
                tools.push(ParsedUpdate::tool(render_tool(name, &input)));
            }
            _ => {}
        }
    }

    if !thinking.is_empty() {
        classification
            .updates
            .push(ParsedUpdate::final_reasoning(thinking.join("\n\n")));
    }
    classification.updates.extend(tools);
    if !texts.is_empty() {
        state.final_text_reflected = true;
        classification
            .updates
            .push(ParsedUpdate::final_text(texts.join("\n\n")));
    }
    classification
}

fn classify_result(event: &ClaudeStreamEvent, state: &mut ClassifierState) -> Classification {
    let mut classification = Classification::empty().end_turn();
    classification.native_session_id = non_blank(event.session_id.as_deref()).map(str::to_string);

    if let Some(stale) = state.tool_buffer.take() {
        log::debug!("Turn ended with open tool call {}", stale.tool_name);
        classification.updates.push(stale.finish());
    }

    let text = non_blank(event.result.as_deref());
    if event.is_error {
        let detail = text
            .or(non_blank(event.subtype.as_deref()))
            .unwrap_or("turn failed");
        classification
            .updates
            .push(ParsedUpdate::error(format!("Error: {detail}")));
    } else if let Some(text) = text {
        if !state.final_text_reflected {
            classification.updates.push(ParsedUpdate::final_text(text));
        }
        classification.title = derive_title(text).map(TitleHint::Derived);
    }

    state.reset_turn();
    classification
}

/// Title from the first non-empty line of an answer, markdown heading
/// markers stripped.
fn derive_title(text: &str) -> Option<String> {
    let line = first_line(text)?.trim_start_matches('#').trim();
    if line.chars().count() <= 2 {
        return None;
    }
    Some(truncate_chars(line, MAX_TITLE_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::event::{MergeMode, StatusHint};
    use crate::conversation::MessageType;
    use serde_json::json;

    fn wrap(event: Value) -> Value {
        json!({"type": "stream_event", "event": event})
    }

    fn run(state: &mut ClassifierState, payloads: &[Value]) -> Vec<Classification> {
        payloads.iter().map(|p| classify(p, state)).collect()
    }

    fn all_updates(classifications: &[Classification]) -> Vec<ParsedUpdate> {
        classifications
            .iter()
            .flat_map(|c| c.updates.iter().cloned())
            .collect()
    }

    mod tool_buffer {
        use super::*;

        #[test]
        fn fragments_become_one_tool_entry() {
            let mut state = ClassifierState::new();
            let results = run(
                &mut state,
                &[
                    wrap(json!({"type": "content_block_start", "index": 1,
                        "content_block": {"type": "tool_use", "id": "t1", "name": "Read", "input": {}}})),
                    wrap(json!({"type": "content_block_delta", "index": 1,
                        "delta": {"type": "input_json_delta", "partial_json": "{\"path\":"}})),
                    wrap(json!({"type": "content_block_delta", "index": 1,
                        "delta": {"type": "input_json_delta", "partial_json": "\"a.txt\"}"}})),
                    wrap(json!({"type": "content_block_stop", "index": 1})),
                ],
            );

            assert!(results[..3].iter().all(|c| c.updates.is_empty()));
            let updates = all_updates(&results);
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].message_type, MessageType::Tool);
            assert_eq!(updates[0].mode, MergeMode::NewEntry);
            assert!(updates[0].content.contains("a.txt"));
            assert!(state.tool_buffer.is_none());
        }

        #[test]
        fn bare_events_work_too() {
            let mut state = ClassifierState::new();
            let results = run(
                &mut state,
                &[
                    json!({"type": "content_block_start", "index": 0,
                        "content_block": {"type": "tool_use", "name": "Bash", "input": {}}}),
                    json!({"type": "content_block_delta", "index": 0,
                        "delta": {"type": "input_json_delta", "partial_json": "{\"command\":\"ls -la\"}"}}),
                    json!({"type": "content_block_stop", "index": 0}),
                ],
            );
            assert_eq!(all_updates(&results), vec![ParsedUpdate::tool("[Bash] ls -la")]);
        }

        #[test]
        fn stop_for_other_block_keeps_buffer_open() {
            let mut state = ClassifierState::new();
            run(
                &mut state,
                &[json!({"type": "content_block_start", "index": 2,
                    "content_block": {"type": "tool_use", "name": "Read", "input": {}}})],
            );
            let c = classify(&json!({"type": "content_block_stop", "index": 1}), &mut state);
            assert!(c.updates.is_empty());
            assert!(state.tool_buffer.is_some());
        }

        #[test]
        fn stop_without_buffer_is_noop() {
            let mut state = ClassifierState::new();
            let c = classify(&wrap(json!({"type": "content_block_stop", "index": 0})), &mut state);
            assert!(c.updates.is_empty());
        }

        #[test]
        fn seeded_input_needs_no_deltas() {
            let mut state = ClassifierState::new();
            let results = run(
                &mut state,
                &[
                    json!({"type": "content_block_start", "index": 0,
                        "content_block": {"type": "tool_use", "name": "Read", "input": {"file_path": "b.rs"}}}),
                    json!({"type": "content_block_stop", "index": 0}),
                ],
            );
            assert_eq!(all_updates(&results), vec![ParsedUpdate::tool("[Read] b.rs")]);
        }

        #[test]
        fn new_start_flushes_stale_buffer() {
            let mut state = ClassifierState::new();
            let results = run(
                &mut state,
                &[
                    json!({"type": "content_block_start", "index": 0,
                        "content_block": {"type": "tool_use", "name": "Read", "input": {"file_path": "old.rs"}}}),
                    json!({"type": "content_block_start", "index": 1,
                        "content_block": {"type": "tool_use", "name": "Read", "input": {"file_path": "new.rs"}}}),
                ],
            );
            assert_eq!(results[1].updates, vec![ParsedUpdate::tool("[Read] old.rs")]);
            assert_eq!(state.tool_buffer.as_ref().unwrap().block_index, Some(1));
        }

        #[test]
        fn malformed_arguments_still_render() {
            let mut state = ClassifierState::new();
            let results = run(
                &mut state,
                &[
                    json!({"type": "content_block_start", "index": 0,
                        "content_block": {"type": "tool_use", "name": "TodoWrite"}}),
                    json!({"type": "content_block_delta", "index": 0,
                        "delta": {"type": "input_json_delta", "partial_json": "{\"todos\": ["}}),
                    json!({"type": "content_block_stop", "index": 0}),
                ],
            );
            assert_eq!(all_updates(&results), vec![ParsedUpdate::tool("[TodoWrite]")]);
        }

        #[test]
        fn edit_renders_before_and_after() {
            let mut state = ClassifierState::new();
            let args = json!({"file_path": "src/x.rs", "old_string": "a", "new_string": "b"}).to_string();
            let results = run(
                &mut state,
                &[
                    json!({"type": "content_block_start", "index": 0,
                        "content_block": {"type": "tool_use", "name": "Edit", "input": {}}}),
                    json!({"type": "content_block_delta", "index": 0,
                        "delta": {"type": "input_json_delta", "partial_json": args}}),
                    json!({"type": "content_block_stop", "index": 0}),
                ],
            );
            assert_eq!(
                all_updates(&results),
                vec![ParsedUpdate::tool("[Edit] src/x.rs\n- a\n+ b")]
            );
        }
    }

    mod deltas {
        use super::*;

        #[test]
        fn text_and_thinking_deltas_append() {
            let mut state = ClassifierState::new();
            let results = run(
                &mut state,
                &[
                    wrap(json!({"type": "content_block_delta", "index": 0,
                        "delta": {"type": "thinking_delta", "thinking": "Let me see"}})),
                    wrap(json!({"type": "content_block_delta", "index": 1,
                        "delta": {"type": "text_delta", "text": "Hi"}})),
                ],
            );
            assert_eq!(
                all_updates(&results),
                vec![
                    ParsedUpdate::reasoning_delta("Let me see"),
                    ParsedUpdate::text_delta("Hi"),
                ]
            );
            assert!(state.final_text_reflected);
        }

        #[test]
        fn stop_reasons_drive_status() {
            let mut state = ClassifierState::new();
            let tool = classify(
                &wrap(json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}})),
                &mut state,
            );
            assert_eq!(tool.status, StatusHint::Set("Using tool".into()));

            let end = classify(
                &json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}}),
                &mut state,
            );
            assert_eq!(end.status, StatusHint::Set("Finalizing response".into()));
        }

        #[test]
        fn message_start_is_thinking() {
            let mut state = ClassifierState::new();
            let c = classify(&wrap(json!({"type": "message_start", "message": {}})), &mut state);
            assert_eq!(c.status, StatusHint::Set("Thinking".into()));
        }
    }

    mod one_shot {
        use super::*;

        #[test]
        fn decomposes_parts_in_order() {
            let mut state = ClassifierState::new();
            let c = classify(
                &json!({"type": "assistant", "message": {"role": "assistant", "content": [
                    {"type": "thinking", "thinking": "First"},
                    {"type": "text", "text": "Looking."},
                    {"type": "tool_use", "name": "Read", "input": {"file_path": "a.rs"}},
                    {"type": "thinking", "thinking": "Second"},
                    {"type": "tool_use", "name": "Bash", "input": {"command": "ls"}},
                    {"type": "text", "text": "Done."}
                ]}}),
                &mut state,
            );
            assert_eq!(
                c.updates,
                vec![
                    ParsedUpdate::final_reasoning("First\n\nSecond"),
                    ParsedUpdate::tool("[Read] a.rs"),
                    ParsedUpdate::tool("[Bash] ls"),
                    ParsedUpdate::final_text("Looking.\n\nDone."),
                ]
            );
            assert!(state.final_text_reflected);
        }

        #[test]
        fn ignored_after_block_stream() {
            let mut state = ClassifierState::new();
            classify(
                &wrap(json!({"type": "content_block_delta", "index": 0,
                    "delta": {"type": "text_delta", "text": "Hi"}})),
                &mut state,
            );
            let c = classify(
                &json!({"type": "assistant", "message": {"content": [{"type": "text", "text": "Hi"}]}}),
                &mut state,
            );
            assert!(c.updates.is_empty());
        }

        #[test]
        fn user_tool_results_keep_thinking() {
            let mut state = ClassifierState::new();
            let c = classify(
                &json!({"type": "user", "message": {"role": "user", "content": "plain"}}),
                &mut state,
            );
            assert_eq!(c.status, StatusHint::Set("Thinking".into()));
            assert!(c.updates.is_empty());
        }
    }

    mod results {
        use super::*;

        #[test]
        fn result_ends_turn_with_final_text() {
            let mut state = ClassifierState::new();
            let c = classify(
                &json!({"type": "result", "subtype": "success", "result": "All done.", "session_id": "sess-9"}),
                &mut state,
            );
            assert!(c.turn_ended);
            assert_eq!(c.status, StatusHint::Clear);
            assert_eq!(c.updates, vec![ParsedUpdate::final_text("All done.")]);
            assert_eq!(c.native_session_id.as_deref(), Some("sess-9"));
        }

        #[test]
        fn result_skips_text_already_streamed() {
            let mut state = ClassifierState::new();
            classify(
                &json!({"type": "content_block_delta", "index": 0,
                    "delta": {"type": "text_delta", "text": "All done."}}),
                &mut state,
            );
            let c = classify(&json!({"type": "result", "result": "All done."}), &mut state);
            assert!(c.updates.is_empty());
            assert!(c.turn_ended);
            assert_eq!(state, ClassifierState::default());
        }

        #[test]
        fn flag_resets_for_next_turn() {
            let mut state = ClassifierState::new();
            classify(
                &json!({"type": "assistant", "message": {"content": [{"type": "text", "text": "One"}]}}),
                &mut state,
            );
            classify(&json!({"type": "result", "result": "One"}), &mut state);

            let c = classify(&json!({"type": "result", "result": "Two"}), &mut state);
            assert_eq!(c.updates, vec![ParsedUpdate::final_text("Two")]);
        }

        #[test]
        fn error_result_surfaces_error() {
            let mut state = ClassifierState::new();
            let c = classify(
                &json!({"type": "result", "subtype": "error_max_turns", "is_error": true}),
                &mut state,
            );
            assert!(c.turn_ended);
            assert_eq!(c.updates, vec![ParsedUpdate::error("Error: error_max_turns")]);
            assert!(c.title.is_none());
        }

        #[test]
        fn result_flushes_open_tool_call() {
            let mut state = ClassifierState::new();
            classify(
                &json!({"type": "content_block_start", "index": 0,
                    "content_block": {"type": "tool_use", "name": "Read", "input": {"file_path": "z"}}}),
                &mut state,
            );
            let c = classify(&json!({"type": "result", "result": "ok"}), &mut state);
            assert_eq!(c.updates[0], ParsedUpdate::tool("[Read] z"));
            assert!(state.tool_buffer.is_none());
        }

        #[test]
        fn derives_title_from_first_line() {
            let mut state = ClassifierState::new();
            let c = classify(
                &json!({"type": "result", "result": "\n## Refactored the parser\n\nDetails..."}),
                &mut state,
            );
            assert_eq!(
                c.title,
                Some(TitleHint::Derived("Refactored the parser".into()))
            );
        }

        #[test]
        fn title_rules() {
            assert_eq!(derive_title("ok"), None);
            assert_eq!(derive_title("# Hi"), None);
            let long = "a".repeat(80);
            let title = derive_title(&long).unwrap();
            assert_eq!(title.chars().count(), MAX_TITLE_CHARS + 1);
            assert!(title.ends_with('…'));
        }
    }

    #[test]
    fn system_init_reports_model_and_session() {
        let mut state = ClassifierState::new();
        let c = classify(
            &json!({"type": "system", "subtype": "init", "model": "claude-sonnet", "session_id": "s-1"}),
            &mut state,
        );
        assert_eq!(c.status, StatusHint::Set("Initialized (claude-sonnet)".into()));
        assert_eq!(c.native_session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn unknown_event_is_empty() {
        let mut state = ClassifierState::new();
        assert!(classify(&json!({"type": "keep_alive"}), &mut state).is_empty());
        assert!(classify(&json!({"type": "stream_event"}), &mut state).is_empty());
        assert!(classify(&json!({"type": "system", "subtype": "compact"}), &mut state).is_empty());
    }
}
