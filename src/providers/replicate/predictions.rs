//! Generation invocation: trained-model and LoRA prediction requests,
//! the synchronous wait for completion, and response normalization.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::wire::{self, PredictionEnvelope};
use super::{Replicate, synthesized_id};
use crate::generation::ImageGenerator;
use crate::types::{GenerationRequest, GenerationResult};
use crate::utils::params::{compose_prompt, format_lora_weights, resolve_dimensions};
use crate::{PortrayError, Result};

const GUIDANCE_SCALE: f64 = 3.5;
const OUTPUT_FORMAT: &str = "webp";
const OUTPUT_QUALITY: u32 = 90;
const DEFAULT_INFERENCE_STEPS: u32 = 28;
const DEFAULT_LORA_SCALE: f64 = 1.0;

/// Base-model runner that LoRA generation applies weights to.
const LORA_RUNNER_OWNER: &str = "black-forest-labs";
const LORA_RUNNER_NAME: &str = "flux-dev-lora";

impl Replicate {
    /// Fallible form of [`ImageGenerator::generate_with_trained_model`].
    /// The model reference is validated before any network call.
    pub async fn try_generate_with_trained_model(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult> {
        let reference = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                PortrayError::InvalidInput("trained model reference is missing".to_string())
            })?;
        let (_owner, _name, version) = parse_model_reference(reference)?;

        let (width, height) = resolve_dimensions(request.aspect_ratio, request.width, request.height);
        let prompt = compose_prompt(request.trigger_word.as_deref(), &request.prompt);
        debug!(model = %reference, width, height, "starting trained-model generation");

        let input = base_input(&prompt, width, height, request);
        let envelope: PredictionEnvelope = self
            .post_json("predictions", &json!({ "version": version, "input": input }))
            .await?;
        let envelope = self.wait_for_prediction(envelope).await?;
        Ok(wire::prediction_result(envelope, width, height))
    }

    /// Fallible form of [`ImageGenerator::generate_with_lora`]. The
    /// weights path is qualified against the external weights host and
    /// handed to the fixed base-model runner.
    pub async fn try_generate_with_lora(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult> {
        let weights = request
            .lora_weights
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| PortrayError::InvalidInput("lora weights path is missing".to_string()))?;
        let lora_url = format_lora_weights(weights);

        let (width, height) = resolve_dimensions(request.aspect_ratio, request.width, request.height);
        let prompt = compose_prompt(request.trigger_word.as_deref(), &request.prompt);
        debug!(lora = %lora_url, width, height, "starting lora generation");

        let mut input = base_input(&prompt, width, height, request);
        input.insert("lora_weights".to_string(), Value::String(lora_url));
        input.insert(
            "lora_scale".to_string(),
            json!(request.lora_scale.unwrap_or(DEFAULT_LORA_SCALE)),
        );
        input.insert("go_fast".to_string(), Value::Bool(true));

        let path = format!("models/{LORA_RUNNER_OWNER}/{LORA_RUNNER_NAME}/predictions");
        let envelope: PredictionEnvelope =
            self.post_json(&path, &json!({ "input": input })).await?;
        let envelope = self.wait_for_prediction(envelope).await?;
        Ok(wire::prediction_result(envelope, width, height))
    }

    /// Polls the prediction until it reaches a terminal state or the
    /// wait timeout elapses, in which case the in-flight state is
    /// returned as-is and maps to a `processing` result.
    async fn wait_for_prediction(
        &self,
        mut envelope: PredictionEnvelope,
    ) -> Result<PredictionEnvelope> {
        let deadline = Instant::now() + self.wait_timeout();
        while !wire::is_terminal_prediction(&envelope) {
            if Instant::now() >= deadline {
                warn!(
                    prediction_id = %envelope.id,
                    "prediction wait timed out; returning in-flight state"
                );
                break;
            }
            sleep(self.poll_interval()).await;
            envelope = self.get_json(&format!("predictions/{}", envelope.id)).await?;
        }
        Ok(envelope)
    }
}

#[async_trait]
impl ImageGenerator for Replicate {
    fn provider(&self) -> &str {
        "replicate"
    }

    async fn generate_with_trained_model(&self, request: GenerationRequest) -> GenerationResult {
        match self.try_generate_with_trained_model(&request).await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "trained-model generation failed");
                GenerationResult::failed(synthesized_id("generation-failed"), err.to_string())
            }
        }
    }

    async fn generate_with_lora(&self, request: GenerationRequest) -> GenerationResult {
        match self.try_generate_with_lora(&request).await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "lora generation failed");
                GenerationResult::failed(synthesized_id("generation-failed"), err.to_string())
            }
        }
    }
}

/// Splits `owner/name:version`; all three parts must be non-empty.
fn parse_model_reference(reference: &str) -> Result<(&str, &str, &str)> {
    let (model, version) = reference.rsplit_once(':').ok_or_else(|| {
        PortrayError::InvalidInput(format!(
            "model reference {reference:?} is missing a version qualifier"
        ))
    })?;
    let (owner, name) = model.split_once('/').ok_or_else(|| {
        PortrayError::InvalidInput(format!(
            "model reference {reference:?} must name an owner/model pair"
        ))
    })?;
    if owner.trim().is_empty() || name.trim().is_empty() || version.trim().is_empty() {
        return Err(PortrayError::InvalidInput(format!(
            "model reference {reference:?} has an empty component"
        )));
    }
    Ok((owner, name, version))
}

fn base_input(
    prompt: &str,
    width: u32,
    height: u32,
    request: &GenerationRequest,
) -> Map<String, Value> {
    let mut input = Map::<String, Value>::new();
    input.insert("prompt".to_string(), Value::String(prompt.to_string()));
    input.insert("width".to_string(), json!(width));
    input.insert("height".to_string(), json!(height));
    input.insert("num_outputs".to_string(), json!(1));
    input.insert("guidance_scale".to_string(), json!(GUIDANCE_SCALE));
    input.insert(
        "num_inference_steps".to_string(),
        json!(request.num_inference_steps.unwrap_or(DEFAULT_INFERENCE_STEPS)),
    );
    input.insert(
        "output_format".to_string(),
        Value::String(OUTPUT_FORMAT.to_string()),
    );
    input.insert("output_quality".to_string(), json!(OUTPUT_QUALITY));
    if let Some(seed) = request.seed {
        input.insert("seed".to_string(), json!(seed));
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AspectRatio, GenerationStatus};
    use httpmock::{Method::GET, Method::POST, MockServer};
    use std::time::Duration;

    fn client(server: &MockServer) -> Replicate {
        Replicate::new("r8_test").with_base_url(server.url("/v1"))
    }

    #[test]
    fn model_references_require_all_three_parts() {
        assert!(parse_model_reference("acme/ana:ver123").is_ok());
        assert!(parse_model_reference("acme/ana").is_err());
        assert!(parse_model_reference("ana:ver123").is_err());
        assert!(parse_model_reference("acme/ana:").is_err());
        assert!(parse_model_reference("/ana:ver123").is_err());
    }

    #[tokio::test]
    async fn trained_model_generation_completes_with_the_first_output() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/predictions")
                    .body_includes("\"version\":\"ver123\"")
                    .body_includes("\"prompt\":\"sks, a studio portrait\"")
                    .body_includes("\"guidance_scale\":3.5")
                    .body_includes("\"output_format\":\"webp\"")
                    .body_includes("\"output_quality\":90")
                    .body_includes("\"width\":1344")
                    .body_includes("\"height\":768");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "id": "pred-1",
                            "status": "succeeded",
                            "output": ["https://cdn.example/a.webp", "https://cdn.example/b.webp"],
                        })
                        .to_string(),
                    );
            })
            .await;

        let mut request = GenerationRequest::new("a studio portrait");
        request.trigger_word = Some("sks".to_string());
        request.model = Some("acme/ana:ver123".to_string());
        request.aspect_ratio = Some(AspectRatio::Landscape16x9);
        let result = client(&server).generate_with_trained_model(request).await;

        mock.assert_async().await;
        assert_eq!(result.status, GenerationStatus::Completed);
        assert_eq!(result.images.len(), 1);
        assert_eq!(result.images[0].url, "https://cdn.example/a.webp");
        assert_eq!((result.images[0].width, result.images[0].height), (1344, 768));
    }

    #[tokio::test]
    async fn malformed_model_reference_fails_before_any_network_call() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/predictions");
                then.status(500);
            })
            .await;

        let mut request = GenerationRequest::new("a portrait");
        request.model = Some("acme/ana".to_string());
        let result = client(&server).generate_with_trained_model(request).await;

        assert_eq!(result.status, GenerationStatus::Failed);
        assert!(
            result
                .error
                .as_deref()
                .unwrap_or_default()
                .contains("version qualifier")
        );
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn failed_prediction_surfaces_the_provider_error() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/predictions");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "id": "pred-2",
                            "status": "failed",
                            "error": "NSFW content detected",
                        })
                        .to_string(),
                    );
            })
            .await;

        let mut request = GenerationRequest::new("a portrait");
        request.model = Some("acme/ana:ver123".to_string());
        let result = client(&server).generate_with_trained_model(request).await;

        assert_eq!(result.status, GenerationStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("NSFW content detected"));
        assert!(result.images.is_empty());
    }

    #[tokio::test]
    async fn generation_polls_until_the_prediction_succeeds() {
        let server = MockServer::start_async().await;
        let _create = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/predictions");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({"id": "pred-3", "status": "starting"}).to_string(),
                    );
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/predictions/pred-3");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "id": "pred-3",
                            "status": "succeeded",
                            "output": "https://cdn.example/c.webp",
                        })
                        .to_string(),
                    );
            })
            .await;

        let mut request = GenerationRequest::new("a portrait");
        request.model = Some("acme/ana:ver123".to_string());
        let result = client(&server)
            .with_poll_interval(Duration::from_millis(10))
            .generate_with_trained_model(request)
            .await;

        poll.assert_async().await;
        assert_eq!(result.status, GenerationStatus::Completed);
        assert_eq!(result.images[0].url, "https://cdn.example/c.webp");
    }

    #[tokio::test]
    async fn wait_timeout_yields_a_processing_result() {
        let server = MockServer::start_async().await;
        let _create = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/predictions");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({"id": "pred-4", "status": "processing"}).to_string(),
                    );
            })
            .await;
        let _poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/predictions/pred-4");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({"id": "pred-4", "status": "processing"}).to_string(),
                    );
            })
            .await;

        let mut request = GenerationRequest::new("a portrait");
        request.model = Some("acme/ana:ver123".to_string());
        let result = client(&server)
            .with_poll_interval(Duration::from_millis(5))
            .with_wait_timeout(Duration::from_millis(30))
            .generate_with_trained_model(request)
            .await;

        assert_eq!(result.status, GenerationStatus::Processing);
        assert!(result.images.is_empty());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn lora_generation_targets_the_fixed_runner_with_qualified_weights() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/models/black-forest-labs/flux-dev-lora/predictions")
                    .body_includes("\"lora_weights\":\"https://huggingface.co/acme/ana-lora\"")
                    .body_includes("\"lora_scale\":1.0")
                    .body_includes("\"go_fast\":true");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "id": "pred-5",
                            "status": "succeeded",
                            "output": ["https://cdn.example/d.webp"],
                        })
                        .to_string(),
                    );
            })
            .await;

        let mut request = GenerationRequest::new("a portrait");
        request.lora_weights = Some("acme/ana-lora".to_string());
        let result = client(&server).generate_with_lora(request).await;

        mock.assert_async().await;
        assert_eq!(result.status, GenerationStatus::Completed);
        assert_eq!(result.images[0].url, "https://cdn.example/d.webp");
    }

    #[tokio::test]
    async fn lora_generation_without_weights_fails_before_any_network_call() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/models/black-forest-labs/flux-dev-lora/predictions");
                then.status(500);
            })
            .await;

        let request = GenerationRequest::new("a portrait");
        let result = client(&server).generate_with_lora(request).await;

        assert_eq!(result.status, GenerationStatus::Failed);
        assert!(
            result
                .error
                .as_deref()
                .unwrap_or_default()
                .contains("lora weights")
        );
        mock.assert_calls(0);
    }
}
