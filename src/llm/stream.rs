//! Streaming decoder for the Messages API server-sent event protocol.
//!
//! DESIGN
//! ======
//! The wire format is blank-line-separated records of `event: <name>` and
//! `data: <json>` lines. Reads may split anywhere, including inside a line or
//! a UTF-8 sequence, so raw bytes are buffered until a full line is available.
//! Dispatch looks at the `type` field inside the JSON payload; the `event:`
//! line is informational only.
//!
//! Content blocks are addressed by the protocol's `index` and may arrive
//! sparsely, so they live in a `Vec<Option<BlockState>>`. Tool-use input is a
//! raw JSON buffer until its `content_block_stop`, then parsed once; a buffer
//! that fails to parse finalizes to `{}`. All state belongs to one
//! [`StreamDecoder`], which belongs to one request.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, trace};

use super::types::{ContentBlock, LlmError};

// =============================================================================
// CALLBACKS
// =============================================================================

/// Live progress hooks fired while a stream is decoded. All methods default to no-ops.
pub trait StreamCallbacks {
    fn on_text(&mut self, _index: usize, _delta: &str) {}

    fn on_thinking(&mut self, _index: usize, _delta: &str) {}

    fn on_tool_start(&mut self, _index: usize, _id: &str, _name: &str) {}

    fn on_tool_delta(&mut self, _index: usize, _partial_json: &str) {}

    fn on_tool_end(&mut self, _index: usize, _id: &str, _name: &str, _input: &Value) {}

    fn on_stop(&mut self, _stop_reason: &str) {}
}

/// Callbacks that ignore everything.
pub struct NoopCallbacks;

impl StreamCallbacks for NoopCallbacks {}

// =============================================================================
// OUTPUT
// =============================================================================

/// Finalized result of one decoded stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMessage {
    /// Blocks in index order; unallocated indices are dropped.
    pub blocks: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub model: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// =============================================================================
// DECODER
// =============================================================================

#[derive(Debug)]
enum BlockState {
    Thinking { text: String, signature: Option<String> },
    Text { text: String },
    ToolUse { id: String, name: String, input: Value, raw: String, closed: bool },
}

impl BlockState {
    fn finish(self) -> ContentBlock {
        match self {
            Self::Thinking { text, signature } => ContentBlock::Thinking { thinking: text, signature },
            Self::Text { text } => ContentBlock::Text { text },
            Self::ToolUse { id, name, input, .. } => ContentBlock::ToolUse { id, name, input },
        }
    }
}

/// Incremental decoder. Feed it byte chunks, then call [`StreamDecoder::finish`].
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Bytes of the current, not yet terminated line.
    pending: Vec<u8>,
    /// `data:` lines of the record being assembled.
    data: Vec<String>,
    blocks: Vec<Option<BlockState>>,
    stop_reason: Option<String>,
    model: Option<String>,
    input_tokens: u64,
    output_tokens: u64,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of bytes, dispatching every record it completes.
    pub fn feed(&mut self, chunk: &[u8], callbacks: &mut dyn StreamCallbacks) {
        self.pending.extend_from_slice(chunk);
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line_bytes: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line_bytes[..newline]).into_owned();
            self.process_line(line.trim_end_matches('\r'), callbacks);
        }
    }

    /// Flush the trailing partial line and any unterminated record, then
    /// return the finalized blocks.
    pub fn finish(mut self, callbacks: &mut dyn StreamCallbacks) -> DecodedMessage {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(line.trim_end_matches('\r'), callbacks);
        }
        self.dispatch_record(callbacks);

        let blocks = self
            .blocks
            .into_iter()
            .flatten()
            .map(BlockState::finish)
            .collect();
        DecodedMessage {
            blocks,
            stop_reason: self.stop_reason,
            model: self.model,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        }
    }

    fn process_line(&mut self, line: &str, callbacks: &mut dyn StreamCallbacks) {
        if line.is_empty() {
            self.dispatch_record(callbacks);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if let Some(data) = line.strip_prefix("data:") {
            self.data.push(data.strip_prefix(' ').unwrap_or(data).to_owned());
        }
        // `event:`, `id:` and `retry:` lines carry nothing we dispatch on.
    }

    fn dispatch_record(&mut self, callbacks: &mut dyn StreamCallbacks) {
        if self.data.is_empty() {
            return;
        }
        let payload = std::mem::take(&mut self.data).join("\n");
        let event: Value = match serde_json::from_str(&payload) {
            Ok(v) => v,
            Err(e) => {
                trace!(error = %e, "stream: skipping unparseable record");
                return;
            }
        };

        match event.get("type").and_then(Value::as_str).unwrap_or("") {
            "message_start" => self.on_message_start(&event),
            "content_block_start" => self.on_block_start(&event, callbacks),
            "content_block_delta" => self.on_block_delta(&event, callbacks),
            "content_block_stop" => self.on_block_stop(&event, callbacks),
            "message_delta" => self.on_message_delta(&event, callbacks),
            other => trace!(event_type = other, "stream: skipping record"),
        }
    }

    fn on_message_start(&mut self, event: &Value) {
        let message = &event["message"];
        if let Some(model) = message.get("model").and_then(Value::as_str) {
            self.model = Some(model.to_owned());
        }
        self.record_usage(&message["usage"]);
    }

    fn on_block_start(&mut self, event: &Value, callbacks: &mut dyn StreamCallbacks) {
        let Some(index) = block_index(event) else {
            return;
        };
        let block = &event["content_block"];
        let state = match block.get("type").and_then(Value::as_str) {
            Some("thinking") => BlockState::Thinking { text: String::new(), signature: None },
            Some("text") => BlockState::Text { text: String::new() },
            Some("tool_use") => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or("").to_owned();
                let name = block.get("name").and_then(Value::as_str).unwrap_or("").to_owned();
                callbacks.on_tool_start(index, &id, &name);
                BlockState::ToolUse {
                    id,
                    name,
                    input: Value::Object(serde_json::Map::new()),
                    raw: String::new(),
                    closed: false,
                }
            }
            other => {
                trace!(index, block_type = ?other, "stream: skipping unknown block type");
                return;
            }
        };
        if self.blocks.len() <= index {
            self.blocks.resize_with(index.saturating_add(1), || None);
        }
        self.blocks[index] = Some(state);
    }

    fn on_block_delta(&mut self, event: &Value, callbacks: &mut dyn StreamCallbacks) {
        let Some(index) = block_index(event) else {
            return;
        };
        let Some(Some(state)) = self.blocks.get_mut(index) else {
            trace!(index, "stream: delta for unallocated block");
            return;
        };
        let delta = &event["delta"];
        match (delta.get("type").and_then(Value::as_str), state) {
            (Some("text_delta"), BlockState::Text { text }) => {
                let piece = delta.get("text").and_then(Value::as_str).unwrap_or("");
                text.push_str(piece);
                callbacks.on_text(index, piece);
            }
            (Some("thinking_delta"), BlockState::Thinking { text, .. }) => {
                let piece = delta.get("thinking").and_then(Value::as_str).unwrap_or("");
                text.push_str(piece);
                callbacks.on_thinking(index, piece);
            }
            (Some("signature_delta"), BlockState::Thinking { signature, .. }) => {
                let piece = delta.get("signature").and_then(Value::as_str).unwrap_or("");
                signature.get_or_insert_with(String::new).push_str(piece);
            }
            (Some("input_json_delta"), BlockState::ToolUse { raw, .. }) => {
                let piece = delta.get("partial_json").and_then(Value::as_str).unwrap_or("");
                raw.push_str(piece);
                callbacks.on_tool_delta(index, piece);
            }
            (delta_type, _) => trace!(index, ?delta_type, "stream: mismatched delta"),
        }
    }

    fn on_block_stop(&mut self, event: &Value, callbacks: &mut dyn StreamCallbacks) {
        let Some(index) = block_index(event) else {
            return;
        };
        let Some(Some(BlockState::ToolUse { id, name, input, raw, closed })) = self.blocks.get_mut(index) else {
            return;
        };
        if *closed {
            return;
        }
        *closed = true;
        *input = match serde_json::from_str::<Value>(raw) {
            Ok(parsed) if parsed.is_object() => parsed,
            Ok(_) | Err(_) => {
                if !raw.is_empty() {
                    debug!(index, tool = %name, "stream: tool input did not parse; using {{}}");
                }
                Value::Object(serde_json::Map::new())
            }
        };
        callbacks.on_tool_end(index, id, name, input);
    }

    fn on_message_delta(&mut self, event: &Value, callbacks: &mut dyn StreamCallbacks) {
        self.record_usage(&event["usage"]);
        if let Some(reason) = event["delta"].get("stop_reason").and_then(Value::as_str) {
            self.stop_reason = Some(reason.to_owned());
            callbacks.on_stop(reason);
        }
    }

    fn record_usage(&mut self, usage: &Value) {
        if let Some(n) = usage.get("input_tokens").and_then(Value::as_u64) {
            self.input_tokens = n;
        }
        if let Some(n) = usage.get("output_tokens").and_then(Value::as_u64) {
            self.output_tokens = n;
        }
    }
}

/// Highest block index the decoder will allocate; records beyond it are skipped.
const MAX_BLOCK_INDEX: usize = 4095;

fn block_index(event: &Value) -> Option<usize> {
    let raw = event.get("index").and_then(Value::as_u64)?;
    match usize::try_from(raw) {
        Ok(index) if index <= MAX_BLOCK_INDEX => Some(index),
        _ => {
            trace!(index = raw, "stream: skipping out-of-range block index");
            None
        }
    }
}

// =============================================================================
// ASYNC DRIVER
// =============================================================================

/// Decode a whole byte stream (e.g. `reqwest::Response::bytes_stream`).
///
/// # Errors
///
/// Returns [`LlmError::StreamInterrupted`] if the underlying stream yields an error.
pub async fn decode_stream<S, B, E>(
    stream: S,
    callbacks: &mut (dyn StreamCallbacks + Send),
) -> Result<DecodedMessage, LlmError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = StreamDecoder::new();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| LlmError::StreamInterrupted(e.to_string()))?;
        decoder.feed(bytes.as_ref(), &mut *callbacks);
    }
    Ok(decoder.finish(&mut *callbacks))
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
