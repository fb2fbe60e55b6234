use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use secrecy::ExposeSecret;
use serde_json::{json, Value};
use t2i_contracts::endpoint::join_url;
use t2i_contracts::task::task_id_from;
use t2i_contracts::{normalize_prompt, value_snippet, GenerationRequest, ImageReference};

use crate::clock::{Clock, SystemClock};
use crate::config::{TaskProviderConfig, DEFAULT_TASK_SIZE};
use crate::error::{GenerationError, Result};
use crate::poller::{PollSettings, TaskPoller};
use crate::resolver::ImageResolver;
use crate::transport::{ensure_success, parse_json, send, HttpRequest, HttpTransport, ReqwestTransport};
use crate::ImageGenerator;

pub const ASYNC_MODE_HEADER: &str = "X-ModelScope-Async-Mode";

const ERROR_SNIPPET_CHARS: usize = 800;

/// Submits a task, polls it to completion, then downloads the first output image.
pub struct TaskGenerator {
    config: TaskProviderConfig,
    create_url: String,
    task_base: String,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    resolver: ImageResolver,
    cancel: Option<Arc<AtomicBool>>,
}

impl TaskGenerator {
    pub fn new(config: TaskProviderConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()), Arc::new(SystemClock))
    }

    pub fn with_transport(
        config: TaskProviderConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let base_url = config.base_url();
        let create_url = join_url(&base_url, &config.endpoint_path());
        let task_base = join_url(&base_url, &config.task_endpoint_path());
        let resolver = ImageResolver::new(transport.clone(), clock.clone(), config.fetch_options());
        tracing::info!(
            base_url = %base_url,
            model = %config.model(),
            endpoint = %config.endpoint_path(),
            "task image generator ready"
        );
        Self {
            config,
            create_url,
            task_base,
            transport,
            clock,
            resolver,
            cancel: None,
        }
    }

    /// Raising the flag stops the poll loop at its next iteration.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &TaskProviderConfig {
        &self.config
    }

    pub fn create_url(&self) -> &str {
        &self.create_url
    }

    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}/{}", self.task_base, task_id)
    }

    pub fn request_payload(&self, request: &GenerationRequest) -> Value {
        let model = request
            .model()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.model());
        let size = request
            .size()
            .map(str::to_string)
            .or_else(|| self.config.size())
            .unwrap_or_else(|| DEFAULT_TASK_SIZE.to_string());
        json!({
            "model": model,
            "prompt": normalize_prompt(&request.prompt, self.config.max_prompt_chars()),
            "n": 1,
            "size": size,
        })
    }

    fn submit(&self, authorization: &str, payload: &Value) -> Result<String> {
        let request =
            HttpRequest::post_json(self.create_url.as_str(), payload, self.config.request_timeout())
                .header("Authorization", authorization)
                .header(ASYNC_MODE_HEADER, "true");
        let response = send(self.transport.as_ref(), &request)?;
        let response = ensure_success(response, &self.create_url, ERROR_SNIPPET_CHARS)?;
        let document = parse_json(&response, &self.create_url)?;
        task_id_from(&document).ok_or_else(|| GenerationError::MissingTaskId {
            snippet: value_snippet(&document, ERROR_SNIPPET_CHARS),
        })
    }

    fn poller(&self, api_key: &str) -> TaskPoller {
        TaskPoller::new(
            self.transport.clone(),
            self.clock.clone(),
            self.task_base.as_str(),
            api_key,
            PollSettings {
                interval: self.config.poll_interval(),
                max_wait: self.config.max_wait(),
                request_timeout: self.config.request_timeout(),
            },
        )
        .with_cancel_flag(self.cancel.clone())
    }
}

impl ImageGenerator for TaskGenerator {
    fn name(&self) -> &str {
        "task-generation"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.config.validate_for_model(request.model())?;
        let api_key = self
            .config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().trim().to_string())
            .unwrap_or_default();
        if request.has_blank_prompt() {
            tracing::warn!("generating with an empty prompt");
        }

        let payload = self.request_payload(request);
        tracing::info!(
            model = payload["model"].as_str().unwrap_or_default(),
            url = %self.create_url,
            "submitting image generation task"
        );
        let task_id = self.submit(&format!("Bearer {api_key}"), &payload)?;
        tracing::info!(task_id = %task_id, "image generation task accepted");

        let snapshot = self.poller(&api_key).wait(&task_id)?;
        let Some(image_url) = snapshot.first_output_image() else {
            let detail = if snapshot.has_output_images() {
                "task succeeded with an invalid output image entry"
            } else {
                "task succeeded without output images"
            };
            return Err(GenerationError::Extraction {
                snippet: format!(
                    "{detail}: {}",
                    value_snippet(&snapshot.payload, ERROR_SNIPPET_CHARS)
                ),
            });
        };
        tracing::info!(task_id = %task_id, url = %image_url, "task succeeded; downloading image");
        self.resolver.resolve(&ImageReference::from_url(image_url))
    }
}
