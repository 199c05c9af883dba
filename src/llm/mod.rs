// LLM abstraction layer

pub mod google;
pub mod provider;

pub use google::*;
pub use provider::*;
pub use crate::types::{LLMMessage, LLMRequest, LLMResponse, TokenUsage};
