use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::*;
use crate::llm::types::{ChatResponse, ContentBlock, LlmChat, LlmError};
use crate::llm::StreamCallbacks;
use crate::services::test_helpers::board;
use crate::state::Rect;
use crate::state::test_helpers::{frame, object, sticky};

/// Summarizer stub: answers with fixed text, or fails every call.
struct ScriptedSummary {
    answer: Option<&'static str>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LlmChat for ScriptedSummary {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.model, Some("summary-model"));
        assert!(request.tools.is_none());
        match self.answer {
            Some(text) => Ok(ChatResponse {
                content: vec![ContentBlock::Text { text: text.into() }],
                model: "summary-model".into(),
                stop_reason: Some("end_turn".into()),
                input_tokens: 1,
                output_tokens: 1,
            }),
            None => Err(LlmError::ApiResponse { status: 500, body: "boom".into() }),
        }
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest<'_>,
        _callbacks: &mut (dyn StreamCallbacks + Send),
    ) -> Result<ChatResponse, LlmError> {
        self.chat(request).await
    }
}

fn with_summary(exec: ToolExecutor, answer: Option<&'static str>) -> (ToolExecutor, Arc<ScriptedSummary>) {
    let llm = Arc::new(ScriptedSummary { answer, calls: AtomicUsize::new(0) });
    let exec = exec.with_summarizer(Summarizer { llm: llm.clone(), model: "summary-model".into(), max_tokens: 256 });
    (exec, llm)
}

fn sample() -> Vec<crate::state::BoardObject> {
    vec![
        sticky("Buy Milk", 0.0, 0.0),
        sticky("call mom", 300.0, 0.0),
        frame("Groceries", -50.0, -50.0, 600.0, 400.0),
        object("circle", 5000.0, 5000.0, 120.0, 120.0),
    ]
}

#[tokio::test]
async fn returns_everything_without_filters() {
    let (_, exec) = board(sample());
    let result = get_board_state(&exec, &json!({})).await.unwrap();
    assert_eq!(result["ok"], true);
    assert_eq!(result["count"], 4);
    assert!(result["objects"][0]["label"].is_string());
}

#[tokio::test]
async fn text_filter_is_case_insensitive_substring() {
    let (_, exec) = board(sample());
    let result = get_board_state(&exec, &json!({"filter": {"text": "MILK"}})).await.unwrap();
    assert_eq!(result["count"], 1);
    assert_eq!(result["objects"][0]["text"], "Buy Milk");
}

#[tokio::test]
async fn other_filters_are_exact() {
    let (_, exec) = board(sample());
    let result = get_board_state(&exec, &json!({"filter": {"kind": "stick"}})).await.unwrap();
    assert_eq!(result["count"], 0);
    let result = get_board_state(&exec, &json!({"filter": {"kind": "sticky", "width": 200}}))
        .await
        .unwrap();
    assert_eq!(result["count"], 2);
}

#[tokio::test]
async fn projection_keeps_id() {
    let (_, exec) = board(sample());
    let result = get_board_state(&exec, &json!({"fields": ["kind"], "filter": {"kind": "circle"}}))
        .await
        .unwrap();
    let row = result["objects"][0].as_object().unwrap();
    assert_eq!(row.len(), 2);
    assert!(row.contains_key("id"));
    assert_eq!(row["kind"], "circle");
}

#[tokio::test]
async fn in_viewport_uses_the_viewport() {
    let (store, exec) = board(sample());
    let result = get_board_state(&exec, &json!({"inViewport": true})).await.unwrap();
    assert_eq!(result["count"], 4);
    assert_eq!(result["viewportAvailable"], false);

    store
        .set_viewport(Some(Rect { x: 4900.0, y: 4900.0, width: 500.0, height: 500.0 }))
        .await;
    let result = get_board_state(&exec, &json!({"inViewport": true})).await.unwrap();
    assert_eq!(result["count"], 1);
    assert_eq!(result["objects"][0]["kind"], "circle");
}

#[tokio::test]
async fn question_is_answered_by_the_summarizer() {
    let (_, exec) = board(sample());
    let (exec, llm) = with_summary(exec, Some("Two notes about chores."));
    let result = get_board_state(&exec, &json!({"question": "what is here?"})).await.unwrap();
    assert_eq!(result["answer"], "Two notes about chores.");
    assert!(result.get("objects").is_none());
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn summary_failure_falls_back_to_raw_data() {
    let (_, exec) = board(sample());
    let (exec, llm) = with_summary(exec, None);
    let result = get_board_state(&exec, &json!({"question": "what is here?"})).await.unwrap();
    assert_eq!(result["ok"], true);
    assert_eq!(result["count"], 4);
    assert!(result["summaryError"].is_string());
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn question_without_summarizer_returns_data() {
    let (_, exec) = board(sample());
    let result = get_board_state(&exec, &json!({"question": "anything?"})).await.unwrap();
    assert_eq!(result["count"], 4);
    assert!(result.get("answer").is_none());
}
