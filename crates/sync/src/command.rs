//! JSON command protocol for scripted sessions and agents.
//!
//! One command per JSON object, tagged by `"command"`. Editor coordinates are
//! 1-based like the widget's; screen coordinates are pixels.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use shared::EntityKey;

use crate::error::SyncError;
use crate::harness::TestHarness;
use crate::state::history::NodeId;
use crate::state::interaction::Modifiers;
use crate::sync::editor::{EditorPosition, TextEdit};
use crate::sync::EditorSyncOutcome;
use crate::viewport::marquee::MarqueeMode;

/// A command the harness can execute.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Reload the sample plan, optionally shifted down by comment lines
    LoadFixture {
        #[serde(default)]
        line_offset: u32,
    },
    /// Parser reported an error; keep the stale scene
    ParseFailed { message: String },
    /// Click at a screen position, or on an entity's projected centre
    Click {
        #[serde(default)]
        at: Option<[f32; 2]>,
        #[serde(default)]
        entity: Option<EntityKey>,
        #[serde(default)]
        shift: bool,
    },
    /// Primary-button drag (marquee)
    Drag {
        from: [f32; 2],
        to: [f32; 2],
        #[serde(default)]
        shift: bool,
    },
    /// Collapse the editor to one or more cursors
    SetCursor { positions: Vec<EditorPosition> },
    /// Select a span of text
    SelectText { start: EditorPosition, end: EditorPosition },
    /// Advance the clock and fire due timers
    Tick { ms: u64 },
    SetMarqueeMode { mode: MarqueeMode },
    /// Replace the buffer as one edit
    Edit {
        text: String,
        #[serde(default)]
        label: Option<String>,
    },
    /// Several edits recorded as one history node
    BulkEdit {
        edits: Vec<TextEdit>,
        #[serde(default)]
        label: Option<String>,
    },
    Undo,
    Redo,
    /// Restore any retained history node
    Checkout { id: NodeId },
    /// Selection, editor and sync state
    Inspect,
    /// The history tree
    History,
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

fn invalid(msg: &str) -> CommandResponse {
    CommandResponse::err(SyncError::InvalidCommand(msg.to_string()).to_string())
}

fn selection_data(harness: &TestHarness) -> serde_json::Value {
    serde_json::json!({ "selected": harness.selected_names() })
}

fn outcome_data(outcome: &EditorSyncOutcome) -> serde_json::Value {
    let names = |keys: &[EntityKey]| keys.iter().map(ToString::to_string).collect::<Vec<_>>();
    match outcome {
        EditorSyncOutcome::Idle => serde_json::json!({ "outcome": "idle" }),
        EditorSyncOutcome::Suppressed => serde_json::json!({ "outcome": "suppressed" }),
        EditorSyncOutcome::Selected(keys) => {
            serde_json::json!({ "outcome": "selected", "entities": names(keys) })
        }
        EditorSyncOutcome::Previewed(keys) => {
            serde_json::json!({ "outcome": "previewed", "entities": names(keys) })
        }
    }
}

/// Execute a single command on the harness.
pub fn execute_command(harness: &mut TestHarness, cmd: AgentCommand) -> CommandResponse {
    match cmd {
        AgentCommand::LoadFixture { line_offset } => {
            harness.load_fixture(line_offset);
            CommandResponse::ok_with_data(serde_json::json!({
                "entity_count": harness.doc.registry().entity_count(),
                "mesh_count": harness.doc.registry().mesh_count(),
            }))
        }

        AgentCommand::ParseFailed { message } => {
            harness.parse_failed(&message);
            CommandResponse::ok()
        }

        AgentCommand::Click { at, entity, shift } => {
            let modifiers = if shift { Modifiers::SHIFT } else { Modifiers::NONE };
            match (at, entity) {
                (Some([x, y]), _) => harness.click(x, y, modifiers),
                (None, Some(key)) => {
                    if !harness.click_entity(&key, modifiers) {
                        return CommandResponse::err(format!("{key} is not visible"));
                    }
                }
                (None, None) => return invalid("click needs `at` or `entity`"),
            }
            CommandResponse::ok_with_data(selection_data(harness))
        }

        AgentCommand::Drag { from, to, shift } => {
            let modifiers = if shift { Modifiers::SHIFT } else { Modifiers::NONE };
            harness.drag(Vec2::from(from), Vec2::from(to), modifiers);
            CommandResponse::ok_with_data(selection_data(harness))
        }

        AgentCommand::SetCursor { positions } => {
            if positions.is_empty() {
                return invalid("set_cursor needs at least one position");
            }
            let positions: Vec<(u32, u32)> = positions.iter().map(|p| (p.line, p.column)).collect();
            harness.set_cursors(&positions);
            CommandResponse::ok()
        }

        AgentCommand::SelectText { start, end } => {
            harness.select_text(start, end);
            CommandResponse::ok()
        }

        AgentCommand::Tick { ms } => {
            let outcome = harness.advance(ms);
            let mut data = outcome_data(&outcome);
            data["selected"] = serde_json::json!(harness.selected_names());
            CommandResponse::ok_with_data(data)
        }

        AgentCommand::SetMarqueeMode { mode } => {
            harness.set_marquee_mode(mode);
            CommandResponse::ok_with_data(serde_json::json!({ "mode": mode }))
        }

        AgentCommand::Edit { text, label } => {
            let node = harness.edit(&text, label);
            CommandResponse::ok_with_data(serde_json::json!({ "node": node }))
        }

        AgentCommand::BulkEdit { edits, label } => {
            let node = harness.bulk_edit(&edits, label);
            CommandResponse::ok_with_data(serde_json::json!({ "node": node }))
        }

        AgentCommand::Undo => {
            let success = harness.undo();
            CommandResponse::ok_with_data(serde_json::json!({ "undone": success }))
        }

        AgentCommand::Redo => {
            let success = harness.redo();
            CommandResponse::ok_with_data(serde_json::json!({ "redone": success }))
        }

        AgentCommand::Checkout { id } => match harness.checkout(id) {
            Ok(()) => CommandResponse::ok_with_data(serde_json::json!({ "current": id })),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        AgentCommand::Inspect => {
            let doc = &harness.doc;
            let editor = doc.editor();
            CommandResponse::ok_with_data(serde_json::json!({
                "selected": harness.selected_names(),
                "entity_count": doc.registry().entity_count(),
                "mesh_count": doc.registry().mesh_count(),
                "marquee_mode": doc.marquee_mode(),
                "stale": doc.is_stale(),
                "error_overlay": doc.error_overlay(),
                "editor_selection": harness.editor_selection(),
                "decorations": editor.decorations(),
                "revealed_line": editor.revealed_line(),
                "stats": doc.sync_stats(),
            }))
        }

        AgentCommand::History => {
            let history = harness.doc.history();
            let mut ids: Vec<NodeId> = history.leaves();
            ids.extend(history.active_path());
            ids.sort_unstable();
            ids.dedup();
            let nodes: Vec<serde_json::Value> = ids
                .iter()
                .filter_map(|id| history.node(*id))
                .map(|node| {
                    serde_json::json!({
                        "id": node.id,
                        "parent": node.parent,
                        "children": node.children,
                        "label": node.metadata.label,
                        "entity_count": node.metadata.entity_count,
                    })
                })
                .collect();
            CommandResponse::ok_with_data(serde_json::json!({
                "current": history.current_id(),
                "root": history.root_id(),
                "len": history.len(),
                "leaves": history.leaves(),
                "nodes": nodes,
            }))
        }
    }
}

/// Parse and execute a single JSON command string.
pub fn execute_json(harness: &mut TestHarness, json: &str) -> Result<CommandResponse, SyncError> {
    let cmd: AgentCommand = serde_json::from_str(json)?;
    Ok(execute_command(harness, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(
    harness: &mut TestHarness,
    json: &str,
) -> Result<Vec<CommandResponse>, SyncError> {
    let cmds: Vec<AgentCommand> = serde_json::from_str(json)?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(harness, cmd))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::EntityType;

    #[test]
    fn test_command_serde_undo() {
        let json = r#"{"command": "undo"}"#;
        let cmd: AgentCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, AgentCommand::Undo));
    }

    #[test]
    fn test_command_serde_click_entity() {
        let json = r#"{"command": "click", "entity": {"floor_id": "Floor1", "entity_type": "room", "entity_id": "Kitchen"}}"#;
        let cmd: AgentCommand = serde_json::from_str(json).unwrap();
        match cmd {
            AgentCommand::Click { at, entity, shift } => {
                assert!(at.is_none());
                assert!(!shift);
                assert_eq!(entity.unwrap().entity_type, EntityType::Room);
            }
            _ => panic!("Expected Click"),
        }
    }

    #[test]
    fn test_command_serde_set_marquee_mode() {
        let json = r#"{"command": "set_marquee_mode", "mode": "containment"}"#;
        let cmd: AgentCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(
            cmd,
            AgentCommand::SetMarqueeMode {
                mode: MarqueeMode::Containment
            }
        ));
    }

    #[test]
    fn test_execute_click_and_inspect() {
        let mut h = TestHarness::new();
        let json = r#"{"command": "click", "entity": {"floor_id": "Floor1", "entity_type": "room", "entity_id": "Living"}}"#;
        let resp = execute_json(&mut h, json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data.unwrap()["selected"][0], "Floor1/room:Living");

        let resp = execute_json(&mut h, r#"{"command": "inspect"}"#).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data["stats"]["editor_updates"], 1);
        assert_eq!(data["revealed_line"], 7);
    }

    #[test]
    fn test_execute_cursor_then_tick() {
        let mut h = TestHarness::new();
        let batch = r#"[
            {"command": "set_cursor", "positions": [{"line": 4, "column": 8}]},
            {"command": "tick", "ms": 50},
            {"command": "tick", "ms": 60}
        ]"#;
        let resps = execute_json_batch(&mut h, batch).unwrap();
        assert_eq!(resps.len(), 3);
        assert_eq!(resps[1].data.as_ref().unwrap()["outcome"], "idle");
        let last = resps[2].data.as_ref().unwrap();
        assert_eq!(last["outcome"], "selected");
        assert_eq!(last["selected"][0], "Floor1/wall:K_north");
    }

    #[test]
    fn test_execute_checkout_unknown_node() {
        let mut h = TestHarness::new();
        let resp = execute_json(&mut h, r#"{"command": "checkout", "id": 999}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("999"));
    }

    #[test]
    fn test_execute_history_after_edit() {
        let mut h = TestHarness::new();
        execute_json(
            &mut h,
            r#"{"command": "edit", "text": "floor Empty {\n}\n", "label": "clear"}"#,
        )
        .unwrap();
        let resp = execute_json(&mut h, r#"{"command": "history"}"#).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data["len"], 2);
        assert_eq!(data["nodes"][1]["label"], "clear");
    }

    #[test]
    fn test_execute_click_needs_target() {
        let mut h = TestHarness::new();
        let resp = execute_json(&mut h, r#"{"command": "click"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("invalid command"));
    }

    #[test]
    fn test_execute_invalid_json() {
        let mut h = TestHarness::new();
        let result = execute_json(&mut h, "not valid json");
        assert!(matches!(result, Err(SyncError::Json(_))));
    }
}
