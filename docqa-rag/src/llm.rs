//! Language model trait for answer synthesis.

use async_trait::async_trait;

use crate::error::Result;

/// A hosted chat/completion model.
///
/// Each call is independent: the model keeps no conversation state of its
/// own, so everything it needs must be in `prompt`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{GeminiChatModel, LanguageModel};
///
/// let model = GeminiChatModel::new("your-api-key")?;
/// let answer = model.complete("Say hello").await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
