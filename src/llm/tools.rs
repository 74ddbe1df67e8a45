//! Board-editing tool definitions for the AI agent.
//!
//! [`ToolKind`] is the closed set of tools; [`board_tools`] renders their
//! schemas for the completion API. Object references in every schema accept
//! either a full UUID or a three-word label.

use serde_json::json;

use super::types::Tool;

/// Every tool the agent may call. Dispatch matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CreateObject,
    UpdateObjects,
    DeleteObjects,
    GetBoardState,
    FitFrameToContents,
    LayoutObjects,
    ApplyTemplate,
    SearchTemplates,
}

impl ToolKind {
    pub const ALL: [Self; 8] = [
        Self::CreateObject,
        Self::UpdateObjects,
        Self::DeleteObjects,
        Self::GetBoardState,
        Self::FitFrameToContents,
        Self::LayoutObjects,
        Self::ApplyTemplate,
        Self::SearchTemplates,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateObject => "createObject",
            Self::UpdateObjects => "updateObjects",
            Self::DeleteObjects => "deleteObjects",
            Self::GetBoardState => "getBoardState",
            Self::FitFrameToContents => "fitFrameToContents",
            Self::LayoutObjects => "layoutObjects",
            Self::ApplyTemplate => "applyTemplate",
            Self::SearchTemplates => "searchTemplates",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

const REF_DESCRIPTION: &str = "Object UUID or its three-word label";

fn field_properties() -> serde_json::Value {
    json!({
        "x": { "type": "number", "description": "Center x" },
        "y": { "type": "number", "description": "Center y" },
        "width": { "type": "number" },
        "height": { "type": "number" },
        "rotation": { "type": "number" },
        "zIndex": { "type": "integer" },
        "text": { "type": "string" },
        "title": { "type": "string" },
        "color": { "type": "string" },
        "style": { "type": "string", "enum": ["line", "arrow", "dashed"] },
        "url": { "type": "string" }
    })
}

/// Build the set of tools available to the board agent.
#[must_use]
pub fn board_tools() -> Vec<Tool> {
    ToolKind::ALL.into_iter().map(tool_definition).collect()
}

fn tool_definition(kind: ToolKind) -> Tool {
    let (description, input_schema) = match kind {
        ToolKind::CreateObject => (
            "Create one object. x/y are the center point. Connectors take `from` and `to` references.",
            json!({
                "type": "object",
                "properties": {
                    "kind": {
                        "type": "string",
                        "enum": ["sticky", "rectangle", "circle", "text", "frame", "connector", "embed"]
                    },
                    "x": { "type": "number" },
                    "y": { "type": "number" },
                    "width": { "type": "number" },
                    "height": { "type": "number" },
                    "rotation": { "type": "number" },
                    "zIndex": { "type": "integer" },
                    "text": { "type": "string" },
                    "title": { "type": "string" },
                    "color": { "type": "string" },
                    "from": { "type": "string", "description": REF_DESCRIPTION },
                    "to": { "type": "string", "description": REF_DESCRIPTION },
                    "style": { "type": "string", "enum": ["line", "arrow", "dashed"] },
                    "url": { "type": "string" }
                },
                "required": ["kind"]
            }),
        ),
        ToolKind::UpdateObjects => (
            "Update one object ({target, fields}) or many ({updates: [{target, fields}]}). \
             x/y are centers; resizing keeps the center; moving a frame moves its contents.",
            json!({
                "type": "object",
                "properties": {
                    "target": { "type": "string", "description": REF_DESCRIPTION },
                    "fields": { "type": "object", "properties": field_properties() },
                    "updates": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "target": { "type": "string", "description": REF_DESCRIPTION },
                                "fields": { "type": "object", "properties": field_properties() }
                            },
                            "required": ["target", "fields"]
                        }
                    }
                }
            }),
        ),
        ToolKind::DeleteObjects => (
            "Delete objects. Connectors attached to a deleted object are removed too.",
            json!({
                "type": "object",
                "properties": {
                    "targets": { "type": "array", "items": { "type": "string", "description": REF_DESCRIPTION } }
                },
                "required": ["targets"]
            }),
        ),
        ToolKind::GetBoardState => (
            "Read the board. Optional filter (exact match; text/title match case-insensitive substrings), \
             field projection, viewport restriction, and a question to answer with a summary.",
            json!({
                "type": "object",
                "properties": {
                    "filter": { "type": "object" },
                    "fields": { "type": "array", "items": { "type": "string" } },
                    "inViewport": { "type": "boolean" },
                    "question": { "type": "string" }
                }
            }),
        ),
        ToolKind::FitFrameToContents => (
            "Resize a frame around its contents (explicit list, or everything overlapping it).",
            json!({
                "type": "object",
                "properties": {
                    "frame": { "type": "string", "description": REF_DESCRIPTION },
                    "contents": { "type": "array", "items": { "type": "string" } },
                    "padding": { "type": "number" }
                },
                "required": ["frame"]
            }),
        ),
        ToolKind::LayoutObjects => (
            "Arrange objects: grid, distribute along an axis, or align edges/centers.",
            json!({
                "type": "object",
                "properties": {
                    "targets": { "type": "array", "items": { "type": "string" } },
                    "mode": { "type": "string", "enum": ["grid", "distribute", "align"] },
                    "columns": { "type": "integer", "minimum": 1 },
                    "gap": { "type": "number" },
                    "axis": { "type": "string", "enum": ["horizontal", "vertical"] },
                    "alignment": {
                        "type": "string",
                        "enum": ["left", "right", "center", "top", "bottom", "middle"]
                    }
                },
                "required": ["targets", "mode"]
            }),
        ),
        ToolKind::ApplyTemplate => (
            "Place templates using the template DSL. One line per template: \
             `name \"Title\"; slot a | slot b; ...`, followed by `@path value` patch lines.",
            json!({
                "type": "object",
                "properties": {
                    "dsl": { "type": "string" },
                    "x": { "type": "number" },
                    "y": { "type": "number" }
                },
                "required": ["dsl"]
            }),
        ),
        ToolKind::SearchTemplates => (
            "Search the template catalog by keyword. An empty query lists every template.",
            json!({
                "type": "object",
                "properties": { "query": { "type": "string" } }
            }),
        ),
    };
    Tool { name: kind.name().into(), description: description.into(), input_schema }
}

#[cfg(test)]
#[path = "tools_test.rs"]
mod tests;
