use async_trait::async_trait;

use crate::error::EnrichError;
use crate::types::Description;

/// Generates a natural-language description of an ad image.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Provider name, e.g. `openai`.
    fn provider(&self) -> &str;

    /// Model name as the provider knows it, e.g. `gpt-4o-mini`.
    fn model(&self) -> &str;

    /// Label stored on generated insights: `{provider}:{model}`.
    fn model_label(&self) -> String {
        format!("{}:{}", self.provider(), self.model())
    }

    async fn describe(&self, image_ref: &str) -> Result<Description, EnrichError>;
}
