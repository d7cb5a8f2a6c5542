use crate::types::BaseModel;

/// Fixed (owner, name, version) identity of a remote training
/// procedure plus its default hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerProfile {
    pub owner: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub base_model: BaseModel,
    pub defaults: TrainingDefaults,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingDefaults {
    pub steps: u32,
    pub lora_rank: u32,
    pub optimizer: &'static str,
    pub batch_size: u32,
    pub resolution: &'static str,
    pub learning_rate: f64,
    pub caption_dropout_rate: f64,
    pub sample_interval: u32,
    pub save_interval: u32,
}

pub const FLUX_TRAINER: TrainerProfile = TrainerProfile {
    owner: "ostris",
    name: "flux-dev-lora-trainer",
    version: "e440909d3512c31646ee2e0c7d6f6f4923224863a6a10c494606e79fb5844497",
    base_model: BaseModel::Flux,
    defaults: TrainingDefaults {
        steps: 1000,
        lora_rank: 16,
        optimizer: "adamw8bit",
        batch_size: 1,
        resolution: "512,768,1024",
        learning_rate: 4e-4,
        caption_dropout_rate: 0.05,
        sample_interval: 100,
        save_interval: 100,
    },
};

pub const SDXL_TRAINER: TrainerProfile = TrainerProfile {
    owner: "stability-ai",
    name: "sdxl",
    version: "7762fd07cf82c948538e41f63f77d685e02b063e37e496e96eefd46c929f9bdc",
    base_model: BaseModel::Sdxl,
    defaults: TrainingDefaults {
        steps: 1500,
        lora_rank: 32,
        optimizer: "adamw",
        batch_size: 2,
        resolution: "1024",
        learning_rate: 1e-4,
        caption_dropout_rate: 0.1,
        sample_interval: 200,
        save_interval: 500,
    },
};

static TRAINERS: [TrainerProfile; 2] = [FLUX_TRAINER, SDXL_TRAINER];

impl TrainerProfile {
    /// Total mapping from the requested base model; absent or
    /// unrecognized requests train against Flux.
    pub fn for_base_model(base_model: Option<BaseModel>) -> &'static TrainerProfile {
        match base_model.unwrap_or_default() {
            BaseModel::Flux => &FLUX_TRAINER,
            BaseModel::Sdxl => &SDXL_TRAINER,
        }
    }

    /// `owner/name:version` reference of the trainer itself.
    pub fn reference(&self) -> String {
        format!("{}/{}:{}", self.owner, self.name, self.version)
    }
}

/// Trainer profiles this adapter can submit jobs to.
pub fn available_trainers() -> &'static [TrainerProfile] {
    &TRAINERS
}
