use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::profile::{
    Env, ReplicateConfig, build_http_client, resolve_api_token, resolve_api_token_with_keys,
};
use crate::{PortrayError, Result};

mod models;
mod predictions;
mod trainers;
mod trainings;
mod wire;

pub use trainers::{FLUX_TRAINER, SDXL_TRAINER, TrainerProfile, TrainingDefaults, available_trainers};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
const DEFAULT_MODEL_OWNER: &str = "portray";
const DEFAULT_HARDWARE: &str = "gpu-t4";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for the Replicate training/inference API.
///
/// Holds one long-lived `reqwest::Client` shared read-only across
/// concurrent invocations; each operation is an independent
/// request/response exchange with no retries and no local queuing.
#[derive(Clone, Debug)]
pub struct Replicate {
    http: reqwest::Client,
    base_url: String,
    token: String,
    model_owner: String,
    hardware: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl Replicate {
    /// Builds a client from an explicit api token.
    pub fn new(api_token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client build should not fail");

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: api_token.into(),
            model_owner: DEFAULT_MODEL_OWNER.to_string(),
            hardware: DEFAULT_HARDWARE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Builds a client by resolving the token from the environment
    /// (`REPLICATE_API_TOKEN`, then the public fallback). Fails fast
    /// with a descriptive error when neither is set.
    pub fn from_env(env: &Env) -> Result<Self> {
        let token = resolve_api_token(None, env)?;
        Ok(Self::new(token))
    }

    pub fn from_config(config: &ReplicateConfig, env: &Env) -> Result<Self> {
        let keys = config
            .token_env_keys
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();
        let token = if keys.is_empty() {
            resolve_api_token(None, env)?
        } else {
            resolve_api_token_with_keys(None, env, &keys)?
        };

        let mut out = Self::new(token);
        if !config.http_headers.is_empty() {
            out = out.with_http_client(build_http_client(DEFAULT_TIMEOUT, &config.http_headers)?);
        }
        if let Some(base_url) = config.base_url.as_deref().filter(|s| !s.trim().is_empty()) {
            out = out.with_base_url(base_url);
        }
        if let Some(owner) = config.model_owner.as_deref().filter(|s| !s.trim().is_empty()) {
            out = out.with_model_owner(owner);
        }
        if let Some(hardware) = config.hardware.as_deref().filter(|s| !s.trim().is_empty()) {
            out = out.with_hardware(hardware);
        }
        Ok(out)
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Account namespace destination models are created under.
    pub fn with_model_owner(mut self, owner: impl Into<String>) -> Self {
        self.model_owner = owner.into();
        self
    }

    pub fn with_hardware(mut self, hardware: impl Into<String>) -> Self {
        self.hardware = hardware.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Upper bound on the synchronous wait for a prediction to reach a
    /// terminal state. A wait that exceeds it yields the in-flight
    /// state rather than an error.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn model_owner(&self) -> &str {
        &self.model_owner
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json_url(&self.endpoint(path)).await
    }

    /// Absolute-URL variant, for following the provider's pagination
    /// cursors.
    pub(crate) async fn get_json_url<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "GET");
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        Self::decode(response).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(path);
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub(crate) async fn post_empty(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path);
        debug!(%url, "POST");
        let response = self.http.post(url).bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortrayError::Api { status, body });
        }
        Ok(())
    }

    /// DELETE returning whether the resource existed (404 maps to
    /// `false`, not an error, so cleanup is idempotent).
    pub(crate) async fn delete_path(&self, path: &str) -> Result<bool> {
        let url = self.endpoint(path);
        debug!(%url, "DELETE");
        let response = self.http.delete(url).bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortrayError::Api { status, body });
        }
        Ok(true)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortrayError::Api { status, body });
        }
        Ok(response.json::<T>().await?)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    pub(crate) fn hardware(&self) -> &str {
        &self.hardware
    }
}

pub(crate) fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

/// Job/result id stamped onto synthetic failure values, so callers can
/// still correlate log lines with the response they got.
pub(crate) fn synthesized_id(prefix: &str) -> String {
    format!("{prefix}-{}", timestamp_millis())
}
