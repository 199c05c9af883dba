use async_trait::async_trait;
use crate::types::{AppResult, LLMRequest, LLMResponse};

/// A text-generation backend. The search enhancer only depends on this trait.
#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Model used when a request leaves `model` empty.
    fn default_model(&self) -> &str;
}
