mod error;
mod profile;

pub mod generation;
pub mod providers;
pub mod training;
pub mod types;
pub mod utils;

pub use error::{PortrayError, Result};
pub use profile::{
    API_TOKEN_KEYS, Env, ReplicateConfig, parse_dotenv, resolve_api_token,
    resolve_api_token_with_keys,
};

pub use generation::ImageGenerator;
pub use training::ModelTrainer;

pub use providers::Replicate;
pub use providers::replicate::{
    FLUX_TRAINER, SDXL_TRAINER, TrainerProfile, TrainingDefaults, available_trainers,
};

pub use types::{
    AspectRatio, BaseModel, DestinationModel, GeneratedImage, GenerationRequest, GenerationResult,
    GenerationStatus, JobUrls, ModelSummary, TrainingJob, TrainingRequest, TrainingStatus,
};
