//! LLM Service Module
//!
//! Chat and embedding access to an OpenAI-compatible provider, plus the
//! pieces built on top of it.
//!
//! # Architecture
//! ```text
//! ┌─────────────────┐
//! │   LLMSession    │  ← model registry, token budget, guardrails
//! └────────┬────────┘
//!          │ ChatBackend (trait)
//!    ┌─────┴─────┐
//!    ▼           ▼
//! ┌──────┐  ┌──────────┐
//! │OpenAI│  │ Scripted │
//! │Client│  │ (tests)  │
//! └──────┘  └──────────┘
//! ```
//!
//! - `tools`: function-calling tools exposed to the chat model
//! - `vector`: schema retrieval over embedded table descriptions
//! - `prompts` / `structured_outputs`: prompt text and typed outputs

mod client;
mod models;
pub mod prompts;
mod session;
pub mod structured_outputs;
pub mod tools;
pub mod vector;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ChatBackend, LLMClient};
pub use models::*;
pub use session::LLMSession;
pub use structured_outputs::{SqlQuery, StructuredOutput, summarize_result};
pub use tools::{TextToSqlTool, Tool, ToolError, Toolkit};
pub use vector::{FlatL2Index, SchemaRetriever};
