//! Provider response shapes and their translation into the crate's
//! own result types. Loosely-typed provider fields stop here; nothing
//! downstream sees raw JSON except the explicit passthroughs on
//! [`TrainingJob`].

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::types::{
    GeneratedImage, GenerationResult, GenerationStatus, JobUrls, TrainingJob, TrainingStatus,
};

#[derive(Debug, Deserialize)]
pub(crate) struct TrainingEnvelope {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub urls: Option<UrlsEnvelope>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UrlsEnvelope {
    #[serde(default)]
    pub get: Option<String>,
    #[serde(default)]
    pub cancel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictionEnvelope {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelPage {
    #[serde(default)]
    pub results: Vec<ModelEnvelope>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEnvelope {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Total mapping from the provider's status string. Missing statuses
/// read as freshly-submitted; unknown strings are logged and treated
/// as still in flight rather than invented terminal states.
pub(crate) fn training_status(raw: Option<&str>) -> TrainingStatus {
    match raw {
        None => TrainingStatus::Starting,
        Some("starting") => TrainingStatus::Starting,
        Some("processing") => TrainingStatus::Processing,
        Some("succeeded") => TrainingStatus::Succeeded,
        Some("failed") => TrainingStatus::Failed,
        Some("canceled") | Some("cancelled") => TrainingStatus::Canceled,
        Some(other) => {
            warn!(status = %other, "unrecognized training status from provider");
            TrainingStatus::Processing
        }
    }
}

/// Provider errors arrive as strings or structured objects; both
/// flatten to a message.
pub(crate) fn error_text(error: Option<&Value>) -> Option<String> {
    match error {
        None | Some(Value::Null) => None,
        Some(Value::String(message)) => Some(message.clone()),
        Some(other) => Some(other.to_string()),
    }
}

pub(crate) fn training_job(envelope: TrainingEnvelope) -> TrainingJob {
    let status = training_status(envelope.status.as_deref());
    TrainingJob {
        id: envelope.id,
        status,
        urls: envelope.urls.map(|urls| JobUrls {
            get: urls.get,
            cancel: urls.cancel,
        }),
        error: error_text(envelope.error.as_ref()),
        output: envelope.output,
        logs: envelope.logs,
        input: envelope.input,
        destination_model_id: None,
    }
}

/// A prediction's output is a bare URL string or a sequence of them;
/// callers take the first element.
pub(crate) fn first_output_url(output: Option<&Value>) -> Option<String> {
    match output? {
        Value::String(url) => Some(url.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        other => {
            warn!(output = %other, "unrecognized prediction output shape");
            None
        }
    }
}

pub(crate) fn is_terminal_prediction(envelope: &PredictionEnvelope) -> bool {
    matches!(
        envelope.status.as_deref(),
        Some("succeeded") | Some("failed") | Some("canceled") | Some("cancelled")
    )
}

pub(crate) fn prediction_result(
    envelope: PredictionEnvelope,
    width: u32,
    height: u32,
) -> GenerationResult {
    match envelope.status.as_deref() {
        Some("succeeded") => match first_output_url(envelope.output.as_ref()) {
            Some(url) => GenerationResult {
                id: envelope.id,
                status: GenerationStatus::Completed,
                images: vec![GeneratedImage { url, width, height }],
                error: None,
            },
            None => {
                warn!(prediction_id = %envelope.id, "prediction succeeded without output");
                GenerationResult::failed(envelope.id, "prediction succeeded but returned no output")
            }
        },
        Some("failed") => {
            let message = error_text(envelope.error.as_ref())
                .unwrap_or_else(|| "prediction failed without an error message".to_string());
            GenerationResult::failed(envelope.id, message)
        }
        Some("canceled") | Some("cancelled") => {
            GenerationResult::failed(envelope.id, "prediction was canceled")
        }
        _ => GenerationResult::processing(envelope.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn training_status_mapping_is_total() {
        assert_eq!(training_status(None), TrainingStatus::Starting);
        assert_eq!(training_status(Some("starting")), TrainingStatus::Starting);
        assert_eq!(training_status(Some("succeeded")), TrainingStatus::Succeeded);
        assert_eq!(training_status(Some("cancelled")), TrainingStatus::Canceled);
        assert_eq!(training_status(Some("queued?")), TrainingStatus::Processing);
    }

    #[test]
    fn error_text_flattens_structured_errors() {
        assert_eq!(error_text(None), None);
        assert_eq!(error_text(Some(&Value::Null)), None);
        assert_eq!(
            error_text(Some(&json!("out of memory"))).as_deref(),
            Some("out of memory")
        );
        let structured = json!({"detail": "quota exceeded"});
        assert!(error_text(Some(&structured)).unwrap().contains("quota"));
    }

    #[test]
    fn first_output_url_takes_the_first_sequence_element() {
        let output = json!(["https://cdn.example/a.webp", "https://cdn.example/b.webp"]);
        assert_eq!(
            first_output_url(Some(&output)).as_deref(),
            Some("https://cdn.example/a.webp")
        );
        let single = json!("https://cdn.example/only.webp");
        assert_eq!(
            first_output_url(Some(&single)).as_deref(),
            Some("https://cdn.example/only.webp")
        );
        assert_eq!(first_output_url(None), None);
    }

    #[test]
    fn succeeded_prediction_maps_to_completed() {
        let envelope = PredictionEnvelope {
            id: "pred-1".to_string(),
            status: Some("succeeded".to_string()),
            output: Some(json!(["https://cdn.example/a.webp"])),
            error: None,
        };
        let result = prediction_result(envelope, 1024, 1024);
        assert_eq!(result.status, GenerationStatus::Completed);
        assert_eq!(result.images[0].url, "https://cdn.example/a.webp");
        assert_eq!((result.images[0].width, result.images[0].height), (1024, 1024));
    }

    #[test]
    fn succeeded_prediction_without_output_is_a_failure() {
        let envelope = PredictionEnvelope {
            id: "pred-2".to_string(),
            status: Some("succeeded".to_string()),
            output: None,
            error: None,
        };
        let result = prediction_result(envelope, 1024, 1024);
        assert_eq!(result.status, GenerationStatus::Failed);
        assert!(result.images.is_empty());
    }

    #[test]
    fn failed_prediction_preserves_the_provider_error() {
        let envelope = PredictionEnvelope {
            id: "pred-3".to_string(),
            status: Some("failed".to_string()),
            output: None,
            error: Some(json!("NSFW content detected")),
        };
        let result = prediction_result(envelope, 512, 512);
        assert_eq!(result.status, GenerationStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("NSFW content detected"));
    }

    #[test]
    fn in_flight_prediction_maps_to_processing() {
        let envelope = PredictionEnvelope {
            id: "pred-4".to_string(),
            status: Some("processing".to_string()),
            output: None,
            error: None,
        };
        let result = prediction_result(envelope, 512, 512);
        assert_eq!(result.status, GenerationStatus::Processing);
        assert!(result.images.is_empty());
        assert!(result.error.is_none());
    }
}
