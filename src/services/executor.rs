//! Tool executor: routes a model tool call to its handler.
//!
//! DESIGN
//! ======
//! Handlers take the raw JSON input and return `Result<Value, ToolError>`.
//! Success payloads carry `ok: true`; [`ToolError::to_result`] renders a
//! failure as `{ok: false, error, code, ...}` so the model can read it and
//! correct itself. Nothing here panics on bad input.
//!
//! Tool coordinates are centers; store coordinates are top-left. Handlers
//! convert at the boundary and [`describe`] converts back.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::info;

use super::resolve::ResolveError;
use crate::error::ErrorCode;
use crate::label::uuid_to_label;
use crate::llm::LlmChat;
use crate::llm::tools::ToolKind;
use crate::state::{BoardObject, ObjectStore, Rect, StoreError};
use crate::template::{TemplateCatalog, TemplateError};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ErrorCode for ToolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "E_UNKNOWN_TOOL",
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::Resolve(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Template(e) => e.error_code(),
        }
    }
}

impl ToolError {
    /// Failure payload handed back to the model.
    #[must_use]
    pub fn to_result(&self) -> Value {
        let mut out = json!({ "ok": false, "error": self.to_string(), "code": self.error_code() });
        if let Self::Resolve(resolve) = self {
            match resolve {
                ResolveError::NotFound { object_count, kinds, .. } => {
                    out["objectCount"] = json!(object_count);
                    out["kinds"] = json!(kinds);
                }
                ResolveError::Ambiguous { candidates, .. } => {
                    out["candidates"] = json!(candidates);
                }
            }
        }
        out
    }
}

pub(crate) fn invalid(msg: impl Into<String>) -> ToolError {
    ToolError::InvalidInput(msg.into())
}

// =============================================================================
// EXECUTOR
// =============================================================================

/// Secondary completion used to answer board questions.
#[derive(Clone)]
pub struct Summarizer {
    pub llm: Arc<dyn LlmChat>,
    pub model: String,
    pub max_tokens: u32,
}

/// Everything a tool handler needs: the store, the template catalog, and an
/// optional summarizer for board questions.
#[derive(Clone)]
pub struct ToolExecutor {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) catalog: Arc<dyn TemplateCatalog>,
    pub(crate) summarizer: Option<Summarizer>,
}

impl ToolExecutor {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, catalog: Arc<dyn TemplateCatalog>) -> Self {
        Self { store, catalog, summarizer: None }
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn TemplateCatalog {
        self.catalog.as_ref()
    }

    /// Where to put things when the model gives no position: the viewport
    /// center when known, else the board origin.
    pub(crate) async fn default_center(&self) -> (f64, f64) {
        self.store
            .viewport()
            .await
            .map_or((0.0, 0.0), |v| v.center())
    }

    /// Run a tool by name.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] for unknown tools, malformed input, failed
    /// reference resolution, template errors, and store rejections.
    pub async fn execute(&self, name: &str, input: &Value) -> Result<Value, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_owned()))?;
        info!(tool = kind.name(), "tool: dispatch");
        match kind {
            ToolKind::CreateObject => super::object::create_object(self, input).await,
            ToolKind::UpdateObjects => super::object::update_objects(self, input).await,
            ToolKind::DeleteObjects => super::object::delete_objects(self, input).await,
            ToolKind::GetBoardState => super::query::get_board_state(self, input).await,
            ToolKind::FitFrameToContents => super::arrange::fit_frame_to_contents(self, input).await,
            ToolKind::LayoutObjects => super::arrange::layout_objects(self, input).await,
            ToolKind::ApplyTemplate => super::template::apply_template(self, input).await,
            ToolKind::SearchTemplates => Ok(super::template::search_templates(self, input)),
        }
    }
}

// =============================================================================
// INPUT HELPERS
// =============================================================================

pub(crate) fn str_arg<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

pub(crate) fn f64_arg(input: &Value, key: &str) -> Option<f64> {
    input.get(key).and_then(Value::as_f64)
}

pub(crate) fn positive_arg(input: &Value, key: &str) -> Option<f64> {
    f64_arg(input, key).filter(|v| *v > 0.0)
}

pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    str_arg(input, key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| invalid(format!("'{key}' is required")))
}

/// A list of references. A bare string is accepted as a one-item list.
pub(crate) fn refs_arg(input: &Value, key: &str) -> Option<Vec<String>> {
    match input.get(key)? {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => Some(items.iter().filter_map(Value::as_str).map(str::to_owned).collect()),
        _ => None,
    }
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Model-facing view of an object: center coordinates, label, and props
/// flattened alongside geometry.
#[must_use]
pub fn describe(obj: &BoardObject) -> Value {
    let (cx, cy) = obj.bounds().center();
    let mut out = Map::new();
    out.insert("id".into(), json!(obj.id));
    out.insert("label".into(), json!(uuid_to_label(&obj.id)));
    out.insert("kind".into(), json!(obj.kind));
    out.insert("x".into(), json!(cx));
    out.insert("y".into(), json!(cy));
    out.insert("width".into(), json!(obj.width));
    out.insert("height".into(), json!(obj.height));
    out.insert("rotation".into(), json!(obj.rotation));
    out.insert("zIndex".into(), json!(obj.z_index));
    if let Value::Object(props) = &obj.props {
        for (key, value) in props {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    Value::Object(out)
}

/// Where a connector is stored: the midpoint of its endpoints' centers.
pub(crate) fn connector_anchor(from: &Rect, to: &Rect) -> (f64, f64) {
    let ((fx, fy), (tx, ty)) = (from.center(), to.center());
    (f64::midpoint(fx, tx), f64::midpoint(fy, ty))
}

/// Stacking order for a new object: frames one step under the current top,
/// other kinds one step over it.
pub(crate) fn next_z<'a>(existing: impl IntoIterator<Item = &'a BoardObject>, kind: &str) -> i64 {
    let max_z = existing.into_iter().map(|o| o.z_index).max().unwrap_or(0);
    if kind == "frame" { max_z - 1 } else { max_z + 1 }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
