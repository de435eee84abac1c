//! Language model clients.
//!
//! The generation engine only ever sees the [`LLM`] trait; concrete clients
//! are built from configuration through [`Provider`].

mod error;
mod openai;
mod provider;

pub use error::LLMError;
pub use openai::OpenAIClient;
pub use provider::Provider;

use async_trait::async_trait;

/// Trait for Large Language Model providers.
///
/// This abstraction allows swapping between different LLM providers
/// without changing the rest of the code. Retries and backoff are the
/// implementation's concern; the engine calls each method once.
///
/// # Example
///
/// ```ignore
/// use casegen_core::llm::{Provider, LLM};
///
/// let llm = Provider::from_env()?;
/// let response = llm.complete_with_system(SYSTEM, "Write login tests").await?;
/// ```
#[async_trait]
pub trait LLM: Send + Sync {
    /// Complete a prompt and return the response.
    async fn complete(&self, prompt: &str) -> Result<String, LLMError>;

    /// Complete a prompt with a system message.
    async fn complete_with_system(&self, system: &str, prompt: &str)
        -> Result<String, LLMError>;

    /// Provider label reported back to callers, e.g. `openai/gpt-4o`.
    fn name(&self) -> String;
}

/// Blanket implementation for boxed trait objects.
#[async_trait]
impl LLM for Box<dyn LLM> {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        (**self).complete(prompt).await
    }

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, LLMError> {
        (**self).complete_with_system(system, prompt).await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
