use crate::types::AspectRatio;

/// External host LoRA weight paths resolve against when not already
/// fully qualified.
const WEIGHTS_HOST: &str = "https://huggingface.co";

/// Prepends the trigger word unless the prompt already contains it
/// (case-insensitive). Idempotent under repeated application.
pub fn compose_prompt(trigger_word: Option<&str>, prompt: &str) -> String {
    let Some(trigger) = trigger_word.map(str::trim).filter(|t| !t.is_empty()) else {
        return prompt.to_string();
    };
    if prompt.to_lowercase().contains(&trigger.to_lowercase()) {
        return prompt.to_string();
    }
    format!("{trigger}, {prompt}")
}

/// Explicit width and height win; otherwise the aspect-ratio table
/// decides, defaulting to 1024x1024.
pub fn resolve_dimensions(
    aspect_ratio: Option<AspectRatio>,
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    if let (Some(width), Some(height)) = (width, height) {
        return (width, height);
    }
    aspect_ratio.unwrap_or_default().dimensions()
}

/// Lower-cases and hyphenates a display name into a provider-safe
/// model slug.
pub fn slugify_model_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        out.push_str("model");
    }
    out
}

/// Qualifies a LoRA weights path against the external weights host
/// unless it is already a full URL.
pub fn format_lora_weights(path: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{WEIGHTS_HOST}/{}", path.trim_start_matches('/'))
}
