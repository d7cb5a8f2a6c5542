use async_trait::async_trait;

use crate::types::{TrainingJob, TrainingRequest};

/// Fine-tuning capability of a provider client.
///
/// Every operation returns a tagged value instead of an error: the
/// callers are HTTP route handlers that must always produce a
/// well-formed response, so failures collapse into the job's own
/// `status`/`error` fields. The `try_` twins on the concrete clients
/// expose the same operations through the `Result` channel.
#[async_trait]
pub trait ModelTrainer: Send + Sync {
    fn provider(&self) -> &str;

    /// Creates the destination model and submits the training job.
    /// Never returns an error; any failure yields a job in `failed`
    /// status with a synthesized id.
    async fn start_training(&self, request: TrainingRequest) -> TrainingJob;

    /// Re-fetches the job from the provider. Fetch failures yield a
    /// synthetic `failed` job carrying the fetch error.
    async fn training_status(&self, id: &str) -> TrainingJob;

    /// Requests cancellation; `false` on any failure.
    async fn cancel_training(&self, id: &str) -> bool;
}
