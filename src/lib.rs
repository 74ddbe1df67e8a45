//! CollabBoard agent: natural-language board editing through model tool calls.
//!
//! DESIGN
//! ======
//! - `llm`: Anthropic Messages client, SSE stream decoder, retry policy, and
//!   the board tool schemas.
//! - `services`: the agent loop and the tool executor that turns tool calls
//!   into store mutations.
//! - `template`: the template DSL, markup language, patch language, layout
//!   engine, and catalog.
//! - `state`: board objects and the `ObjectStore` seam.
//! - `label`: three-word labels derived from object ids.

pub mod error;
pub mod label;
pub mod llm;
pub mod services;
pub mod state;
pub mod template;
