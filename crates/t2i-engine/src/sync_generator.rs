use std::sync::Arc;

use secrecy::ExposeSecret;
use serde_json::{json, Value};
use t2i_contracts::endpoint::{join_url, MULTIMODAL_GENERATION_PATH};
use t2i_contracts::extract::extract_with_strategy;
use t2i_contracts::{normalize_prompt, normalize_size, value_snippet, GenerationRequest};

use crate::clock::{Clock, SystemClock};
use crate::config::SyncProviderConfig;
use crate::error::{GenerationError, Result};
use crate::resolver::ImageResolver;
use crate::transport::{ensure_success, parse_json, send, HttpRequest, HttpTransport, ReqwestTransport};
use crate::ImageGenerator;

const ERROR_SNIPPET_CHARS: usize = 500;

/// One POST answers with the image (URL or inline payload) directly.
pub struct SyncGenerator {
    config: SyncProviderConfig,
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
    resolver: ImageResolver,
}

impl SyncGenerator {
    pub fn new(config: SyncProviderConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()), Arc::new(SystemClock))
    }

    pub fn with_transport(
        config: SyncProviderConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let endpoint = join_url(&config.base_url(), MULTIMODAL_GENERATION_PATH);
        let resolver = ImageResolver::new(transport.clone(), clock, config.fetch_options());
        tracing::info!(
            endpoint = %endpoint,
            model = %config.model(),
            "synchronous image generator ready"
        );
        Self {
            config,
            endpoint,
            transport,
            resolver,
        }
    }

    pub fn config(&self) -> &SyncProviderConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for `request`, with every default applied.
    pub fn request_payload(&self, request: &GenerationRequest) -> Value {
        let model = request
            .model()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.model());
        let aspect_ratio = request
            .aspect_ratio()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_aspect_ratio());
        let size = normalize_size(request.size(), &aspect_ratio);
        let prompt = match self.config.max_prompt_chars() {
            Some(max_chars) => normalize_prompt(&request.prompt, max_chars),
            None => request.prompt.trim().to_string(),
        };
        json!({
            "model": model,
            "input": {
                "messages": [{
                    "role": "user",
                    "content": [{"text": prompt}],
                }]
            },
            "parameters": {
                "negative_prompt": request.negative_prompt.as_deref().unwrap_or_default(),
                "prompt_extend": request.prompt_extend.unwrap_or_else(|| self.config.prompt_extend()),
                "watermark": request.watermark.unwrap_or_else(|| self.config.watermark()),
                "n": 1,
                "size": size,
            },
        })
    }
}

impl ImageGenerator for SyncGenerator {
    fn name(&self) -> &str {
        "multimodal-generation"
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
            size = payload["parameters"]["size"].as_str().unwrap_or_default(),
            "submitting synchronous image generation"
        );
        let http_request = HttpRequest::post_json(
            self.endpoint.as_str(),
            &payload,
            self.config.request_timeout(),
        )
        .header("Authorization", format!("Bearer {api_key}"));
        let response = send(self.transport.as_ref(), &http_request)?;
        let response = ensure_success(response, &self.endpoint, ERROR_SNIPPET_CHARS)?;
        let document = parse_json(&response, &self.endpoint)?;

        let Some((strategy, reference)) = extract_with_strategy(&document) else {
            return Err(GenerationError::Extraction {
                snippet: value_snippet(&document, ERROR_SNIPPET_CHARS),
            });
        };
        tracing::debug!(
            strategy,
            has_url = reference.url().is_some(),
            "image reference extracted"
        );
        self.resolver.resolve(&reference)
    }
}
