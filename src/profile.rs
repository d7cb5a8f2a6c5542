use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::{PortrayError, Result};

/// Environment keys checked, in order, for the provider api token when
/// no explicit token is given.
pub const API_TOKEN_KEYS: &[&str] = &["REPLICATE_API_TOKEN", "NEXT_PUBLIC_REPLICATE_API_TOKEN"];

/// Profile section configuring the provider client. The destination
/// model owner lives here rather than in code so a multi-tenant setup
/// can swap namespaces without touching call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReplicateConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model_owner: Option<String>,
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default)]
    pub token_env_keys: Vec<String>,
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

fn header_map_from_pairs(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            PortrayError::InvalidInput(format!("invalid http header name {name:?}: {err}"))
        })?;

        let header_value = HeaderValue::from_str(value).map_err(|err| {
            PortrayError::InvalidInput(format!(
                "invalid http header value for {name:?} (value={value:?}): {err}"
            ))
        })?;

        out.insert(header_name, header_value);
    }
    Ok(out)
}

pub(crate) fn build_http_client(
    timeout: Duration,
    headers: &BTreeMap<String, String>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if !headers.is_empty() {
        builder = builder.default_headers(header_map_from_pairs(headers)?);
    }
    builder.build().map_err(PortrayError::Http)
}

/// Environment lookup with a dotenv overlay. The overlay takes
/// precedence over the process environment, matching how the deployed
/// app layers `.env.local` over `.env`.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub dotenv: BTreeMap<String, String>,
}

impl Env {
    pub fn parse_dotenv(contents: &str) -> Self {
        Self {
            dotenv: parse_dotenv(contents),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.dotenv.get(key) {
            return Some(value.clone());
        }
        std::env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

pub fn parse_dotenv(contents: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::<String, String>::new();

    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line).trim();
        let Some((raw_key, raw_value)) = line.split_once('=') else {
            continue;
        };
        let key = raw_key.trim();
        if key.is_empty() {
            continue;
        }

        let mut value = raw_value.trim().to_string();
        if let Some(stripped) = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        {
            value = stripped.to_string();
        }

        if value.trim().is_empty() {
            continue;
        }

        out.insert(key.to_string(), value);
    }

    out
}

/// Resolves the provider api token: an explicit argument wins, then
/// each key in [`API_TOKEN_KEYS`] in order. Fails with a descriptive
/// error naming the keys tried when nothing is set.
pub fn resolve_api_token(explicit: Option<&str>, env: &Env) -> Result<String> {
    resolve_api_token_with_keys(explicit, env, API_TOKEN_KEYS)
}

pub fn resolve_api_token_with_keys(
    explicit: Option<&str>,
    env: &Env,
    keys: &[&str],
) -> Result<String> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }
    for key in keys {
        if let Some(value) = env.get(key) {
            return Ok(value);
        }
    }
    Err(PortrayError::Auth(format!(
        "no api token provided (tried: {})",
        keys.join(", ")
    )))
}
