use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_TIMEOUT_SECS: f64 = 90.0;
const MIN_TIMEOUT_SECS: f64 = 15.0;
const MAX_TIMEOUT_SECS: f64 = 300.0;
const MIN_IMAGE_DIM: u32 = 128;

/// Process-level settings for the engine. Credentials are deliberately absent:
/// providers read them from the environment on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
    /// Longest image edge sent upstream; larger images are downscaled.
    pub max_image_dim: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            max_image_dim: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            api_base: read("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            model: read("CHEAPFINDS_MODEL").unwrap_or(defaults.model),
            request_timeout: Duration::from_secs_f64(clamped_secs(
                read("CHEAPFINDS_REQUEST_TIMEOUT_SECS").as_deref(),
            )),
            max_image_dim: read("CHEAPFINDS_MAX_IMAGE_DIM")
                .and_then(|value| value.parse::<u32>().ok())
                .map(|dim| dim.max(MIN_IMAGE_DIM)),
        }
    }
}

fn clamped_secs(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
        .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

/// Trimmed, non-empty value of an environment variable.
pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
