//! Destination-model management: creation for training runs, plus the
//! listing/cleanup operations the maintenance tooling relies on.

use serde_json::json;
use tracing::{debug, info, warn};

use super::wire::{ModelEnvelope, ModelPage};
use super::{Replicate, timestamp_millis};
use crate::Result;
use crate::types::{DestinationModel, ModelSummary};
use crate::utils::params::slugify_model_name;

impl Replicate {
    /// Creates a private destination model under the configured owner
    /// namespace. The model id embeds a millisecond timestamp and a
    /// short random suffix so repeated requests with the same display
    /// name never collide.
    pub async fn create_destination_model(&self, model_name: &str) -> Result<DestinationModel> {
        let model_id = unique_model_id(model_name);
        debug!(owner = %self.model_owner(), model_id = %model_id, "creating destination model");

        let body = json!({
            "owner": self.model_owner(),
            "name": model_id,
            "description": format!("Personalized model for {model_name}"),
            "visibility": "private",
            "hardware": self.hardware(),
        });
        let created: ModelEnvelope = self.post_json("models", &body).await?;
        info!(model = %format!("{}/{}", created.owner, created.name), "destination model created");

        Ok(DestinationModel {
            owner: created.owner,
            model_id: created.name,
            visibility: "private".to_string(),
            hardware: self.hardware().to_string(),
        })
    }

    /// Lists every model under the configured owner namespace,
    /// following the provider's pagination cursor to the end.
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        let mut out = Vec::<ModelSummary>::new();
        let mut page: ModelPage = self
            .get_json(&format!("models?owner={}", self.model_owner()))
            .await?;

        loop {
            for model in page.results {
                out.push(ModelSummary {
                    owner: model.owner,
                    name: model.name,
                    description: model.description,
                    visibility: model.visibility,
                    created_at: model.created_at,
                });
            }
            match page.next.as_deref().filter(|next| !next.trim().is_empty()) {
                Some(next) => page = self.get_json_url(next).await?,
                None => break,
            }
        }

        debug!(owner = %self.model_owner(), count = out.len(), "listed models");
        Ok(out)
    }

    /// Deletes a model under the configured owner namespace. Returns
    /// whether the model existed; an already-deleted model is not an
    /// error so cleanup runs can be replayed.
    pub async fn delete_model(&self, model_id: &str) -> Result<bool> {
        let path = format!("models/{}/{}", self.model_owner(), model_id);
        let existed = self.delete_path(&path).await?;
        if existed {
            info!(owner = %self.model_owner(), model_id = %model_id, "model deleted");
        } else {
            warn!(owner = %self.model_owner(), model_id = %model_id, "model not found; nothing to delete");
        }
        Ok(existed)
    }
}

/// `slug-{millis}-{hex}`: unique across repeated requests with the
/// same display name.
pub(crate) fn unique_model_id(model_name: &str) -> String {
    format!(
        "{}-{}-{}",
        slugify_model_name(model_name),
        timestamp_millis(),
        random_suffix()
    )
}

fn random_suffix() -> String {
    let mut bytes = [0u8; 3];
    if getrandom::fill(&mut bytes).is_err() {
        // Entropy source failure still must not produce colliding ids.
        return format!("{:06x}", timestamp_millis() & 0xff_ffff);
    }
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
