//! Agent definitions and tools shared by the voice and chat front ends.

pub mod agent;
pub mod chat;
pub mod llm_client;
pub mod tool;
pub mod tools;

pub use agent::{AgentConfig, AgentKind};
pub use tool::{ToolDefinition, ToolError, ToolRegistry};
