use async_trait::async_trait;

use crate::types::{GenerationRequest, GenerationResult};

/// Image synthesis capability of a provider client. Non-throwing, like
/// [`crate::training::ModelTrainer`]: failures collapse into the
/// result's `status`/`error` fields.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn provider(&self) -> &str;

    /// Generates from a fine-tuned model referenced as
    /// `owner/name:version`. Waits for a terminal state before
    /// returning; a wait that outlives the client's timeout yields a
    /// `processing` result.
    async fn generate_with_trained_model(&self, request: GenerationRequest) -> GenerationResult;

    /// Generates from the fixed base-model runner with ad-hoc LoRA
    /// weights applied.
    async fn generate_with_lora(&self, request: GenerationRequest) -> GenerationResult;
}
