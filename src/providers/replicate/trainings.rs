//! Training orchestration: destination-model creation, trainer
//! selection, job submission, and the status/cancel operations.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use super::trainers::TrainerProfile;
use super::wire::{self, TrainingEnvelope};
use super::{Replicate, synthesized_id};
use crate::training::ModelTrainer;
use crate::types::{TrainingJob, TrainingRequest};
use crate::{PortrayError, Result};

/// Archive URLs may also point at the app's own download routes.
const INTERNAL_ARCHIVE_PREFIX: &str = "/api/";

impl Replicate {
    /// Fallible form of [`ModelTrainer::start_training`]. Validates the
    /// archive URL before any network call, creates the destination
    /// model, selects the trainer profile for the requested base
    /// model, and submits the job. No step is retried; the first
    /// failure surfaces immediately.
    pub async fn try_start_training(&self, request: &TrainingRequest) -> Result<TrainingJob> {
        let zip_url = validate_zip_url(request.zip_url.as_deref())?;

        let destination = self.create_destination_model(&request.model_name).await?;
        let profile = TrainerProfile::for_base_model(request.base_model);
        debug!(
            trainer = %profile.reference(),
            destination = %destination.reference(),
            trigger_word = %request.trigger_word,
            "submitting training job"
        );

        let path = format!(
            "models/{}/{}/versions/{}/trainings",
            profile.owner, profile.name, profile.version
        );
        let body = json!({
            "destination": destination.reference(),
            "input": training_input(profile, request, zip_url),
        });
        let envelope: TrainingEnvelope = self.post_json(&path, &body).await?;
        info!(job_id = %envelope.id, status = ?envelope.status, "training job submitted");

        let mut job = wire::training_job(envelope);
        job.destination_model_id = Some(destination.model_id);
        Ok(job)
    }

    pub async fn try_training_status(&self, id: &str) -> Result<TrainingJob> {
        let envelope: TrainingEnvelope = self.get_json(&format!("trainings/{id}")).await?;
        debug!(job_id = %id, status = ?envelope.status, "fetched training status");
        Ok(wire::training_job(envelope))
    }

    pub async fn try_cancel_training(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("trainings/{id}/cancel")).await
    }
}

#[async_trait]
impl ModelTrainer for Replicate {
    fn provider(&self) -> &str {
        "replicate"
    }

    async fn start_training(&self, request: TrainingRequest) -> TrainingJob {
        match self.try_start_training(&request).await {
            Ok(job) => job,
            Err(err) => {
                error!(model_name = %request.model_name, error = %err, "training start failed");
                TrainingJob::failed(synthesized_id("training-failed"), err.to_string())
            }
        }
    }

    async fn training_status(&self, id: &str) -> TrainingJob {
        match self.try_training_status(id).await {
            Ok(job) => job,
            Err(err) => {
                error!(job_id = %id, error = %err, "training status fetch failed");
                TrainingJob::failed(id, err.to_string())
            }
        }
    }

    async fn cancel_training(&self, id: &str) -> bool {
        match self.try_cancel_training(id).await {
            Ok(()) => {
                info!(job_id = %id, "training cancel requested");
                true
            }
            Err(err) => {
                warn!(job_id = %id, error = %err, "training cancel failed");
                false
            }
        }
    }
}

fn validate_zip_url(zip_url: Option<&str>) -> Result<&str> {
    let url = zip_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            PortrayError::InvalidInput(
                "training archive url is missing; package the training images first".to_string(),
            )
        })?;
    if url.starts_with("http") || url.starts_with(INTERNAL_ARCHIVE_PREFIX) {
        Ok(url)
    } else {
        Err(PortrayError::InvalidInput(format!(
            "training archive url {url:?} must be http(s) or an internal {INTERNAL_ARCHIVE_PREFIX} path"
        )))
    }
}

/// Hyperparameters submitted with the job: the profile's defaults,
/// with the caller's explicit overrides on top.
fn training_input(profile: &TrainerProfile, request: &TrainingRequest, zip_url: &str) -> Value {
    let defaults = &profile.defaults;
    json!({
        "input_images": zip_url,
        "trigger_word": request.trigger_word,
        "autocaption": true,
        "steps": request.steps.unwrap_or(defaults.steps),
        "lora_rank": request.lora_rank.unwrap_or(defaults.lora_rank),
        "optimizer": defaults.optimizer,
        "batch_size": request.batch_size.unwrap_or(defaults.batch_size),
        "resolution": request.resolution.as_deref().unwrap_or(defaults.resolution),
        "learning_rate": request.learning_rate.unwrap_or(defaults.learning_rate),
        "caption_dropout_rate": defaults.caption_dropout_rate,
        "cache_latents_to_disk": false,
        "wandb_sample_interval": defaults.sample_interval,
        "wandb_save_interval": defaults.save_interval,
    })
}
