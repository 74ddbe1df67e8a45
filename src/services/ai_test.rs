use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::llm::stream::NoopCallbacks;
use crate::llm::types::Content;
use crate::services::test_helpers::{board, executor};
use crate::state::{BoardObject, Fields, NewObject, ObjectStore, StoreError, Viewport};

// =========================================================================
// MockLlm
// =========================================================================

/// What the mock saw for one request.
#[derive(Debug, Clone)]
struct Seen {
    streamed: bool,
    max_tokens: u32,
    thinking: Option<u32>,
    messages: Vec<Message>,
}

struct MockLlm {
    responses: Mutex<Vec<Result<ChatResponse, LlmError>>>,
    seen: Mutex<Vec<Seen>>,
}

impl MockLlm {
    fn new(responses: Vec<ChatResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    fn scripted(responses: Vec<Result<ChatResponse, LlmError>>) -> Self {
        Self { responses: Mutex::new(responses), seen: Mutex::new(Vec::new()) }
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn next(&self, request: &ChatRequest<'_>, streamed: bool) -> Result<ChatResponse, LlmError> {
        self.seen.lock().unwrap().push(Seen {
            streamed,
            max_tokens: request.max_tokens,
            thinking: request.thinking,
            messages: request.messages.to_vec(),
        });
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() { Ok(text_response("done", "end_turn")) } else { responses.remove(0) }
    }
}

#[async_trait::async_trait]
impl LlmChat for MockLlm {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        self.next(request, false)
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest<'_>,
        _callbacks: &mut (dyn StreamCallbacks + Send),
    ) -> Result<ChatResponse, LlmError> {
        self.next(request, true)
    }
}

/// Endpoint that asks for a tool on every round.
struct AlwaysToolUse {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl LlmChat for AlwaysToolUse {
    async fn chat(&self, _request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(tool_response(vec![tool_use(&format!("t{n}"), "getBoardState", json!({}))]))
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest<'_>,
        _callbacks: &mut (dyn StreamCallbacks + Send),
    ) -> Result<ChatResponse, LlmError> {
        self.chat(request).await
    }
}

fn text_response(text: &str, stop: &str) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::Text { text: text.into() }],
        model: "mock".into(),
        stop_reason: Some(stop.into()),
        input_tokens: 10,
        output_tokens: 5,
    }
}

fn tool_response(content: Vec<ContentBlock>) -> ChatResponse {
    ChatResponse {
        content,
        model: "mock".into(),
        stop_reason: Some("tool_use".into()),
        input_tokens: 10,
        output_tokens: 5,
    }
}

fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse { id: id.into(), name: name.into(), input }
}

fn thinking(text: &str) -> ContentBlock {
    ContentBlock::Thinking { thinking: text.into(), signature: Some("sig".into()) }
}

fn non_stream() -> AgentConfig {
    AgentConfig { stream: false, ..AgentConfig::default() }
}

fn tool_results(message: &Message) -> Vec<(String, String, Option<bool>)> {
    match &message.content {
        Content::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                    Some((tool_use_id.clone(), content.clone(), *is_error))
                }
                _ => None,
            })
            .collect(),
        Content::Text(_) => Vec::new(),
    }
}

// =========================================================================
// build_system_prompt
// =========================================================================

#[test]
fn system_prompt_lists_templates_and_context() {
    let prompt = build_system_prompt(&["kanban", "swot"], Some("Viewport: 0,0 to 800,600"));
    assert!(prompt.contains("kanban, swot"));
    assert!(prompt.contains("Viewport: 0,0 to 800,600"));
    assert!(prompt.contains("three-word label"));
    assert!(prompt.contains("<user_input>"));
}

#[test]
fn system_prompt_without_templates_or_context() {
    let prompt = build_system_prompt(&[], Some("   "));
    assert!(prompt.contains("No templates are installed"));
    assert!(!prompt.contains("Context:"));
}

// =========================================================================
// handle_prompt
// =========================================================================

#[tokio::test]
async fn plain_answer_ends_after_one_round() {
    let (_, exec) = board(vec![]);
    let llm = Arc::new(MockLlm::new(vec![text_response("Hello there", "end_turn")]));
    let agent = Agent::new(llm.clone(), exec, non_stream());

    let reply = agent.handle_prompt("hi", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    assert_eq!(reply.text, "Hello there");
    assert_eq!(reply.rounds, 1);
    assert_eq!(reply.tool_calls, 0);
    assert_eq!((reply.input_tokens, reply.output_tokens), (10, 5));
    assert_eq!(reply.history.len(), 2);
    assert_eq!(reply.history[0].content, Content::Text("<user_input>hi</user_input>".into()));
    assert_eq!(reply.history[1].role, "assistant");
}

#[tokio::test]
async fn tool_round_mutates_board_and_strips_thinking() {
    let (store, exec) = board(vec![]);
    let llm = Arc::new(MockLlm::new(vec![
        tool_response(vec![
            thinking("plan the note"),
            tool_use("call-1", "createObject", json!({"kind": "sticky", "text": "hello", "x": 0, "y": 0})),
        ]),
        text_response("Added a note.", "end_turn"),
    ]));
    let agent = Agent::new(llm.clone(), exec, non_stream());

    let reply = agent
        .handle_prompt("add a note", Vec::new(), None, &mut NoopCallbacks)
        .await
        .unwrap();
    assert_eq!(reply.text, "Added a note.");
    assert_eq!(reply.rounds, 2);
    assert_eq!(reply.tool_calls, 1);
    assert_eq!(store.get_objects().await.len(), 1);

    // user, assistant(tool_use), user(tool_result), assistant(text)
    assert_eq!(reply.history.len(), 4);
    let Content::Blocks(assistant) = &reply.history[1].content else {
        panic!("assistant turn should be blocks");
    };
    assert_eq!(assistant.len(), 1);
    assert!(matches!(assistant[0], ContentBlock::ToolUse { .. }));

    let results = tool_results(&reply.history[2]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call-1");
    assert!(results[0].1.contains("\"ok\":true"));
    assert_eq!(results[0].2, None);

    // The second request carried the tool result.
    let seen = llm.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].messages.len(), 3);
}

#[tokio::test]
async fn every_tool_use_gets_a_result_in_one_message() {
    let (_, exec) = board(vec![]);
    let llm = Arc::new(MockLlm::new(vec![tool_response(vec![
        tool_use("a", "searchTemplates", json!({"query": "kanban"})),
        tool_use("b", "deleteObjects", json!({"targets": ["nobody"]})),
        tool_use("c", "noSuchTool", json!({})),
    ])]));
    let agent = Agent::new(llm, exec, non_stream());

    let reply = agent.handle_prompt("go", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    let results = tool_results(&reply.history[2]);
    let ids: Vec<&str> = results.iter().map(|r| r.0.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(results[0].2, None);
    assert_eq!(results[1].2, Some(true));
    assert!(results[1].1.contains("E_OBJECT_NOT_FOUND"));
    assert_eq!(results[2].2, Some(true));
    assert!(results[2].1.contains("E_UNKNOWN_TOOL"));
    assert_eq!(reply.text, "done");
}

#[tokio::test]
async fn always_tool_use_stops_after_exactly_forty_rounds() {
    let (_, exec) = board(vec![]);
    let llm = Arc::new(AlwaysToolUse { calls: AtomicUsize::new(0) });
    let agent = Agent::new(llm.clone(), exec, AgentConfig::default());

    let reply = agent.handle_prompt("loop", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    assert_eq!(llm.calls.load(Ordering::SeqCst), 40);
    assert_eq!(reply.rounds, 40);
    assert_eq!(reply.tool_calls, 40);
    assert_eq!(reply.text, "Done.");
}

#[tokio::test]
async fn terminal_stop_reason_skips_pending_tool_calls() {
    let (store, exec) = board(vec![]);
    let mut truncated = tool_response(vec![
        ContentBlock::Text { text: "Working on it".into() },
        tool_use("x", "createObject", json!({"kind": "sticky"})),
    ]);
    truncated.stop_reason = Some("max_tokens".into());
    let llm = Arc::new(MockLlm::new(vec![truncated]));
    let agent = Agent::new(llm.clone(), exec, non_stream());

    let reply = agent.handle_prompt("go", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    assert_eq!(reply.rounds, 1);
    assert_eq!(reply.text, "Working on it");
    assert!(store.get_objects().await.is_empty());
    assert_eq!(
        reply.history[1].content,
        Content::Blocks(vec![ContentBlock::Text { text: "Working on it".into() }])
    );
}

#[tokio::test]
async fn fallback_text_when_model_says_nothing() {
    let (_, exec) = board(vec![]);
    let silent = ChatResponse {
        content: vec![thinking("hmm")],
        model: "mock".into(),
        stop_reason: Some("end_turn".into()),
        input_tokens: 1,
        output_tokens: 1,
    };
    let agent = Agent::new(Arc::new(MockLlm::new(vec![silent])), exec, non_stream());
    let reply = agent.handle_prompt("?", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    assert_eq!(reply.text, "Done.");
    assert_eq!(reply.history.len(), 1);
}

#[tokio::test]
async fn prior_history_is_sent_first() {
    let (_, exec) = board(vec![]);
    let llm = Arc::new(MockLlm::new(vec![]));
    let agent = Agent::new(llm.clone(), exec, non_stream());
    let history = vec![
        Message::user_text("<user_input>earlier</user_input>"),
        Message::assistant_blocks(vec![ContentBlock::Text { text: "ok".into() }]),
    ];
    let reply = agent.handle_prompt("now", history, None, &mut NoopCallbacks).await.unwrap();
    assert_eq!(llm.seen()[0].messages.len(), 3);
    assert_eq!(reply.history.len(), 4);
}

#[tokio::test]
async fn completion_errors_abort_the_submission() {
    let (_, exec) = board(vec![]);
    let llm = Arc::new(MockLlm::scripted(vec![Err(LlmError::ApiResponse { status: 400, body: "bad".into() })]));
    let agent = Agent::new(llm, exec, non_stream());
    let err = agent.handle_prompt("go", Vec::new(), None, &mut NoopCallbacks).await.unwrap_err();
    assert_eq!(err.error_code(), "E_LLM_ERROR");
    assert!(!err.retryable());
}

#[tokio::test]
async fn streaming_mode_enables_thinking() {
    let (_, exec) = board(vec![]);
    let llm = Arc::new(MockLlm::new(vec![]));
    let agent = Agent::new(llm.clone(), exec.clone(), AgentConfig::default());
    agent.handle_prompt("go", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    let seen = &llm.seen()[0];
    assert!(seen.streamed);
    assert_eq!(seen.max_tokens, DEFAULT_AI_MAX_TOKENS);
    assert_eq!(seen.thinking, Some(DEFAULT_AI_THINKING_BUDGET));

    let llm = Arc::new(MockLlm::new(vec![]));
    let agent = Agent::new(llm.clone(), exec, non_stream());
    agent.handle_prompt("go", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    let seen = &llm.seen()[0];
    assert!(!seen.streamed);
    assert_eq!(seen.max_tokens, DEFAULT_AI_NON_STREAM_MAX_TOKENS);
    assert_eq!(seen.thinking, None);
}

// =========================================================================
// Panicking tools
// =========================================================================

/// Store whose reads blow up.
struct PanickingStore;

#[async_trait::async_trait]
impl ObjectStore for PanickingStore {
    async fn create_object(&self, _object: NewObject) -> Result<BoardObject, StoreError> {
        Err(StoreError::Rejected("read-only".into()))
    }

    async fn update_object(&self, id: Uuid, _fields: &Fields) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id))
    }

    async fn delete_object(&self, id: Uuid) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id))
    }

    async fn get_objects(&self) -> HashMap<Uuid, BoardObject> {
        panic!("snapshot unavailable");
    }

    async fn viewport(&self) -> Option<Viewport> {
        None
    }
}

#[tokio::test]
async fn tool_panics_become_error_results() {
    let exec = executor(Arc::new(PanickingStore));
    let llm = Arc::new(MockLlm::new(vec![tool_response(vec![tool_use("p", "getBoardState", json!({}))])]));
    let agent = Agent::new(llm, exec, non_stream());

    let reply = agent.handle_prompt("look", Vec::new(), None, &mut NoopCallbacks).await.unwrap();
    let results = tool_results(&reply.history[2]);
    assert_eq!(results[0].2, Some(true));
    assert!(results[0].1.contains("snapshot unavailable"));
    assert!(results[0].1.contains("E_TOOL_PANIC"));
}

// =========================================================================
// AgentConfig
// =========================================================================

#[test]
fn config_from_env_reads_overrides() {
    // Only this test touches AI_* variables.
    unsafe {
        std::env::set_var("AI_MAX_TOOL_ROUNDS", "5");
        std::env::set_var("AI_STREAM", "false");
        std::env::set_var("AI_THINKING_BUDGET", "lots");
    }
    let cfg = AgentConfig::from_env();
    unsafe {
        std::env::remove_var("AI_MAX_TOOL_ROUNDS");
        std::env::remove_var("AI_STREAM");
        std::env::remove_var("AI_THINKING_BUDGET");
    }
    assert_eq!(cfg.max_tool_rounds, 5);
    assert!(!cfg.stream);
    assert_eq!(cfg.thinking_budget, DEFAULT_AI_THINKING_BUDGET);
    assert_eq!(cfg.max_tokens, DEFAULT_AI_MAX_TOKENS);
}
