//! Board query tool: filter, viewport, projection, optional summary.

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::executor::{Summarizer, ToolError, ToolExecutor, describe, str_arg};
use crate::llm::types::{ChatRequest, LlmError, Message};

const SUMMARY_SYSTEM: &str = "You answer questions about a collaborative whiteboard. \
     You are given the user's question and a JSON list of board objects (centers in x/y). \
     Answer concisely from the data only. Refer to objects by their label.";

/// Keys matched by case-insensitive substring instead of equality.
const FUZZY_KEYS: [&str; 2] = ["text", "title"];

pub(crate) async fn get_board_state(ctx: &ToolExecutor, input: &Value) -> Result<Value, ToolError> {
    let objects = ctx.store.get_objects().await;
    let mut sorted: Vec<_> = objects.values().collect();
    sorted.sort_by(|a, b| a.z_index.cmp(&b.z_index).then(a.id.cmp(&b.id)));

    let in_viewport = input
        .get("inViewport")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let viewport = if in_viewport { ctx.store.viewport().await } else { None };
    let filter = input.get("filter").and_then(Value::as_object);
    let fields: Option<Vec<&str>> = input
        .get("fields")
        .and_then(Value::as_array)
        .map(|f| f.iter().filter_map(Value::as_str).collect());

    let matching: Vec<Value> = sorted
        .into_iter()
        .filter(|obj| viewport.is_none_or(|v| v.intersects(&obj.bounds())))
        .map(describe)
        .filter(|view| filter.is_none_or(|f| matches_filter(view, f)))
        .map(|view| match &fields {
            Some(keys) => project(&view, keys),
            None => view,
        })
        .collect();
    info!(total = objects.len(), matched = matching.len(), "tool: board state queried");

    let mut out = json!({ "ok": true, "count": matching.len(), "objects": matching });
    if in_viewport && viewport.is_none() {
        out["viewportAvailable"] = json!(false);
    }

    let question = str_arg(input, "question").filter(|q| !q.trim().is_empty());
    if let (Some(question), Some(summarizer)) = (question, &ctx.summarizer) {
        match summarize(summarizer, question, &out["objects"]).await {
            Ok(answer) => {
                out["answer"] = json!(answer);
                if let Value::Object(map) = &mut out {
                    map.remove("objects");
                }
            }
            Err(e) => {
                warn!(error = %e, "tool: board summary failed; returning raw data");
                out["summaryError"] = json!(e.to_string());
            }
        }
    }
    Ok(out)
}

fn matches_filter(view: &Value, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(key, wanted)| {
        let Some(actual) = view.get(key) else {
            return false;
        };
        match (actual, wanted) {
            (Value::String(a), Value::String(w)) if FUZZY_KEYS.contains(&key.as_str()) => {
                a.to_lowercase().contains(&w.to_lowercase())
            }
            (Value::Number(a), Value::Number(w)) => a.as_f64() == w.as_f64(),
            _ => actual == wanted,
        }
    })
}

/// Keep only `keys`, plus `id` so every row stays addressable.
fn project(view: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    if let Some(id) = view.get("id") {
        out.insert("id".into(), id.clone());
    }
    for key in keys {
        if let Some(value) = view.get(*key) {
            out.insert((*key).to_owned(), value.clone());
        }
    }
    Value::Object(out)
}

async fn summarize(summarizer: &Summarizer, question: &str, objects: &Value) -> Result<String, LlmError> {
    let messages = [Message::user_text(format!(
        "<question>{question}</question>\n<board>{objects}</board>"
    ))];
    let request = ChatRequest {
        model: Some(&summarizer.model),
        max_tokens: summarizer.max_tokens,
        system: SUMMARY_SYSTEM,
        messages: &messages,
        tools: None,
        thinking: None,
    };
    let response = summarizer.llm.chat(&request).await?;
    Ok(response.text().unwrap_or_default())
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
