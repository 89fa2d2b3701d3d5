//! LLM protocol types and backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, Completion, Content, Message, ModelConfig, ModelRequest, ModelResponse, Role,
    ToolDescriptor, ToolInvocationRequest, ToolInvocationResult, Usage,
};
