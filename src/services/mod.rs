//! Agent services: the tool executor, its handlers, and the agent loop.
//!
//! ARCHITECTURE
//! ============
//! `ai` drives the model. Every tool call it receives goes through
//! `executor::ToolExecutor`, which dispatches to the handler modules. Handlers
//! read the board through the `ObjectStore` seam and never cache between
//! calls.

pub mod ai;
mod arrange;
pub mod executor;
mod object;
mod query;
pub mod resolve;
mod template;

pub use ai::{Agent, AgentConfig, AgentError, AgentReply};
pub use executor::{Summarizer, ToolError, ToolExecutor};

#[cfg(test)]
#[path = "services_helpers_test.rs"]
pub(crate) mod test_helpers;
