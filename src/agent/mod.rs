//! Tool-calling orchestration.
//!
//! [`ResponseGenerator`] lets the model decide whether to consult the course
//! tools, runs whatever it asks for through a [`ToolRegistry`](crate::tools::ToolRegistry),
//! and feeds the results back until it answers or the round budget is spent.

mod runner;

pub use runner::{
    GeneratedResponse, ResponseGenerator, ToolCallRecord, MAX_TOOL_ROUNDS, TOOL_FAILURE_FALLBACK,
};
