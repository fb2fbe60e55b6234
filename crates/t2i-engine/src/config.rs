//! Provider configuration as handed over by the caller.
//!
//! Every field is optional; unset, blank or non-positive values fall back to
//! the provider defaults below. Configs are immutable once a generator owns
//! them and are validated before the first network call.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use t2i_contracts::endpoint::{
    normalize_endpoint_path, normalize_multimodal_base_url, normalize_task_base_url,
};

use crate::error::{GenerationError, Result};
use crate::resolver::FetchOptions;

pub const DEFAULT_MULTIMODAL_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
pub const DEFAULT_MULTIMODAL_MODEL: &str = "wan2.6-t2i";
pub const DEFAULT_ASPECT_RATIO: &str = "3:4";

pub const DEFAULT_TASK_BASE_URL: &str = "https://api-inference.modelscope.cn";
pub const DEFAULT_TASK_ENDPOINT: &str = "/v1/images/generations";
pub const DEFAULT_TASK_STATUS_ENDPOINT: &str = "/v1/tasks";
pub const DEFAULT_TASK_MODEL: &str = "Tongyi-MAI/Z-Image-Turbo";
pub const DEFAULT_TASK_SIZE: &str = "1024x1024";
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 1900;

/// Synchronous multimodal-generation provider settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncProviderConfig {
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub default_aspect_ratio: Option<String>,
    pub prompt_extend: Option<bool>,
    pub watermark: Option<bool>,
    pub timeout_seconds: Option<f64>,
    pub download_timeout_seconds: Option<f64>,
    pub max_prompt_chars: Option<usize>,
    pub fetch_retries: Option<u32>,
    pub fetch_retry_backoff_seconds: Option<f64>,
}

impl SyncProviderConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        parse_config(raw, "synchronous provider")
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn base_url(&self) -> String {
        normalize_multimodal_base_url(
            self.base_url
                .as_deref()
                .unwrap_or(DEFAULT_MULTIMODAL_BASE_URL),
        )
    }

    pub fn model(&self) -> String {
        resolve_model(self.model.as_deref(), DEFAULT_MULTIMODAL_MODEL)
    }

    pub fn default_aspect_ratio(&self) -> String {
        self.default_aspect_ratio
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ASPECT_RATIO)
            .to_string()
    }

    pub fn prompt_extend(&self) -> bool {
        self.prompt_extend.unwrap_or(true)
    }

    pub fn watermark(&self) -> bool {
        self.watermark.unwrap_or(false)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds_or(self.timeout_seconds, 120.0)
    }

    pub fn max_prompt_chars(&self) -> Option<usize> {
        self.max_prompt_chars.filter(|value| *value > 0)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: seconds_or(self.download_timeout_seconds, 60.0),
            retries: self.fetch_retries.unwrap_or(0),
            retry_backoff: seconds_or(self.fetch_retry_backoff_seconds, 1.0),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_for_model(None)
    }

    /// Validates with `model` (when given) standing in for the configured one.
    pub fn validate_for_model(&self, model: Option<&str>) -> Result<()> {
        validate_common(
            "synchronous provider",
            self.api_key.as_ref(),
            &self.base_url(),
            &effective_model(model, self.model()),
        )
    }
}

/// Asynchronous submit-then-poll provider settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskProviderConfig {
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub endpoint_type: Option<String>,
    pub task_endpoint: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub poll_interval_seconds: Option<f64>,
    pub max_wait_seconds: Option<f64>,
    pub max_prompt_chars: Option<usize>,
    pub request_timeout_seconds: Option<f64>,
    pub download_timeout_seconds: Option<f64>,
    pub fetch_retries: Option<u32>,
    pub fetch_retry_backoff_seconds: Option<f64>,
}

impl TaskProviderConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        parse_config(raw, "task provider")
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn endpoint_path(&self) -> String {
        normalize_endpoint_path(
            self.endpoint_type.as_deref().unwrap_or_default(),
            DEFAULT_TASK_ENDPOINT,
        )
    }

    pub fn task_endpoint_path(&self) -> String {
        normalize_endpoint_path(
            self.task_endpoint.as_deref().unwrap_or_default(),
            DEFAULT_TASK_STATUS_ENDPOINT,
        )
    }

    pub fn base_url(&self) -> String {
        normalize_task_base_url(
            self.base_url.as_deref().unwrap_or(DEFAULT_TASK_BASE_URL),
            &self.endpoint_path(),
        )
    }

    pub fn model(&self) -> String {
        resolve_model(self.model.as_deref(), DEFAULT_TASK_MODEL)
    }

    pub fn size(&self) -> Option<String> {
        self.size
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn poll_interval(&self) -> Duration {
        seconds_or(self.poll_interval_seconds, 3.0)
    }

    pub fn max_wait(&self) -> Duration {
        seconds_or(self.max_wait_seconds, 300.0)
    }

    pub fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_PROMPT_CHARS)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds_or(self.request_timeout_seconds, 60.0)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: seconds_or(self.download_timeout_seconds, 120.0),
            retries: self.fetch_retries.unwrap_or(0),
            retry_backoff: seconds_or(self.fetch_retry_backoff_seconds, 1.0),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_for_model(None)
    }

    pub fn validate_for_model(&self, model: Option<&str>) -> Result<()> {
        validate_common(
            "task provider",
            self.api_key.as_ref(),
            &self.base_url(),
            &effective_model(model, self.model()),
        )
    }
}

fn parse_config<T: for<'de> Deserialize<'de>>(raw: &str, label: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|err| {
        GenerationError::Configuration(format!("invalid {label} configuration JSON: {err}"))
    })
}

/// An empty configured model falls back to the default; a blank one stays
/// blank so validation can reject it.
fn resolve_model(configured: Option<&str>, default: &str) -> String {
    configured
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .trim()
        .to_string()
}

fn effective_model(requested: Option<&str>, configured: String) -> String {
    requested
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or(configured)
}

fn validate_common(
    label: &str,
    api_key: Option<&SecretString>,
    base_url: &str,
    model: &str,
) -> Result<()> {
    let has_key = api_key
        .map(|key| !key.expose_secret().trim().is_empty())
        .unwrap_or(false);
    if !has_key {
        return Err(GenerationError::Configuration(format!(
            "{label} API key is not configured; set `api_key`"
        )));
    }
    if base_url.is_empty() {
        return Err(GenerationError::Configuration(format!(
            "{label} base URL is not configured; set `base_url`"
        )));
    }
    if model.is_empty() {
        return Err(GenerationError::Configuration(format!(
            "{label} model is not configured; set `model`"
        )));
    }
    Ok(())
}

fn seconds_or(value: Option<f64>, default_seconds: f64) -> Duration {
    value
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
        .unwrap_or_else(|| Duration::from_secs_f64(default_seconds))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::{seconds_or, SyncProviderConfig, TaskProviderConfig};

    #[test]
    fn sync_defaults_match_multimodal_convention() {
        let config = SyncProviderConfig::default();
        assert_eq!(config.base_url(), "https://dashscope.aliyuncs.com/api/v1");
        assert_eq!(config.model(), "wan2.6-t2i");
        assert_eq!(config.default_aspect_ratio(), "3:4");
        assert!(config.prompt_extend());
        assert!(!config.watermark());
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(60));
        assert_eq!(config.fetch_options().retries, 0);
        assert_eq!(config.max_prompt_chars(), None);
    }

    #[test]
    fn task_defaults_match_task_convention() {
        let config = TaskProviderConfig::default();
        assert_eq!(config.base_url(), "https://api-inference.modelscope.cn");
        assert_eq!(config.endpoint_path(), "/v1/images/generations");
        assert_eq!(config.task_endpoint_path(), "/v1/tasks");
        assert_eq!(config.model(), "Tongyi-MAI/Z-Image-Turbo");
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.max_wait(), Duration::from_secs(300));
        assert_eq!(config.max_prompt_chars(), 1900);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(120));
        assert_eq!(config.size(), None);
    }

    #[test]
    fn task_base_url_drops_version_shared_with_endpoint() {
        let config = TaskProviderConfig::default()
            .with_base_url("https://api-inference.modelscope.cn/v1/");
        assert_eq!(config.base_url(), "https://api-inference.modelscope.cn");

        let config = TaskProviderConfig {
            endpoint_type: Some("v2/images".to_string()),
            ..TaskProviderConfig::default()
        }
        .with_base_url("https://proxy.local/v2");
        assert_eq!(config.endpoint_path(), "/v2/images");
        assert_eq!(config.base_url(), "https://proxy.local");
    }

    #[test]
    fn validation_reports_missing_pieces() {
        let err = TaskProviderConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("API key"), "{err}");

        let err = TaskProviderConfig::default()
            .with_api_key("   ")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("API key"), "{err}");

        let err = SyncProviderConfig::default()
            .with_api_key("sk-test")
            .with_base_url("  ")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("base URL"), "{err}");

        let err = TaskProviderConfig {
            model: Some("  ".to_string()),
            ..TaskProviderConfig::default()
        }
        .with_api_key("sk-test")
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("model"), "{err}");

        let blank_model = TaskProviderConfig {
            model: Some("  ".to_string()),
            ..TaskProviderConfig::default()
        }
        .with_api_key("sk-test");
        assert!(blank_model.validate_for_model(Some("custom/model")).is_ok());
        assert!(blank_model.validate_for_model(Some(" ")).is_err());

        assert!(SyncProviderConfig::default()
            .with_api_key("sk-test")
            .validate()
            .is_ok());
    }

    #[test]
    fn non_positive_numbers_fall_back_to_defaults() {
        assert_eq!(seconds_or(Some(0.0), 3.0), Duration::from_secs(3));
        assert_eq!(seconds_or(Some(-5.0), 3.0), Duration::from_secs(3));
        assert_eq!(seconds_or(Some(f64::NAN), 3.0), Duration::from_secs(3));
        assert_eq!(seconds_or(Some(0.5), 3.0), Duration::from_millis(500));

        let config = TaskProviderConfig {
            max_prompt_chars: Some(0),
            ..TaskProviderConfig::default()
        };
        assert_eq!(config.max_prompt_chars(), 1900);
    }

    #[test]
    fn config_loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api_key":"ms-key","model":"custom/model","poll_interval_seconds":1.5,"max_wait_seconds":30}}"#
        )
        .unwrap();
        let raw = std::fs::read_to_string(file.path()).unwrap();
        let config = TaskProviderConfig::from_json_str(&raw).unwrap();
        assert_eq!(config.model(), "custom/model");
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
        assert_eq!(config.max_wait(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
        assert!(!format!("{config:?}").contains("ms-key"));
    }

    #[test]
    fn invalid_json_is_a_configuration_error() {
        let err = SyncProviderConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }
}
