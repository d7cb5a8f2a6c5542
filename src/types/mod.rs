use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle states a fine-tuning job moves through on the provider.
/// `succeeded`, `failed`, and `canceled` are terminal; a job is only
/// ever updated by re-fetching it from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl TrainingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// Base model family a training run fine-tunes. Selection of the
/// trainer profile is a total mapping over this enum; loose provider
/// strings that do not name SDXL resolve to Flux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BaseModel {
    #[default]
    Flux,
    #[serde(alias = "stable-diffusion-xl")]
    Sdxl,
}

impl BaseModel {
    /// Total mapping from a loosely-typed model name. Anything that is
    /// not the SDXL identifier (including the empty string) is Flux.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sdxl" | "stable-diffusion-xl" => Self::Sdxl,
            _ => Self::Flux,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub model_name: String,
    pub trigger_word: String,
    /// HTTP(S) URL or internal `/api/` path of the zipped training
    /// images. Validated before any network call; absence is a
    /// terminal input error, never retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_model: Option<BaseModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl TrainingRequest {
    pub fn new(
        model_name: impl Into<String>,
        trigger_word: impl Into<String>,
        zip_url: impl Into<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            trigger_word: trigger_word.into(),
            zip_url: Some(zip_url.into()),
            base_model: None,
            steps: None,
            learning_rate: None,
            lora_rank: None,
            batch_size: None,
            resolution: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJob {
    pub id: String,
    pub status: TrainingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<JobUrls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_model_id: Option<String>,
}

impl TrainingJob {
    /// Synthesizes a terminal failure value. Used wherever the
    /// non-throwing facade collapses an error into the job itself.
    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TrainingStatus::Failed,
            urls: None,
            error: Some(error.into()),
            output: None,
            logs: None,
            input: None,
            destination_model_id: None,
        }
    }
}

/// Namespace slot on the provider that a training job populates with
/// fine-tuned weights. Created once per training request, immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationModel {
    pub owner: String,
    pub model_id: String,
    pub visibility: String,
    pub hardware: String,
}

impl DestinationModel {
    /// `owner/model_id` form the provider expects as a training
    /// destination.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.owner, self.model_id)
    }
}

/// Summary row from the provider's model listing, used by the cleanup
/// operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Named aspect ratios with their fixed pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
}

impl AspectRatio {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Square => (1024, 1024),
            Self::Landscape16x9 => (1344, 768),
            Self::Portrait9x16 => (768, 1344),
            Self::Portrait3x4 => (896, 1152),
            Self::Landscape4x3 => (1152, 896),
        }
    }

    /// Total mapping from a loose ratio string; unrecognized input is
    /// square.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "16:9" => Self::Landscape16x9,
            "9:16" => Self::Portrait9x16,
            "3:4" => Self::Portrait3x4,
            "4:3" => Self::Landscape4x3,
            _ => Self::Square,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Prepended to the prompt unless already present
    /// (case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_word: Option<String>,
    /// Trained model reference in `owner/name:version` form. Required
    /// by trained-model generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// LoRA weights path, relative to the external weights host unless
    /// already fully qualified. Required by LoRA generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_weights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_scale: Option<f64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            trigger_word: None,
            model: None,
            lora_weights: None,
            width: None,
            height: None,
            aspect_ratio: None,
            num_inference_steps: None,
            seed: None,
            lora_scale: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
    Failed,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub id: String,
    pub status: GenerationStatus,
    /// Empty unless `status` is `completed`.
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: GenerationStatus::Failed,
            images: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn processing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: GenerationStatus::Processing,
            images: Vec::new(),
            error: None,
        }
    }
}
