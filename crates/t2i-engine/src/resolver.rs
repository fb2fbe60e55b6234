use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use t2i_contracts::ImageReference;

use crate::clock::Clock;
use crate::error::{GenerationError, Result};
use crate::transport::{ensure_success, send, HttpRequest, HttpTransport};

const DOWNLOAD_ERROR_SNIPPET_CHARS: usize = 200;

/// Image download behavior. Retries cover the download only, never the
/// generation request that produced the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retries: 0,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Turns an [`ImageReference`] into raw bytes.
#[derive(Clone)]
pub struct ImageResolver {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    options: FetchOptions,
}

impl ImageResolver {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: FetchOptions,
    ) -> Self {
        Self {
            transport,
            clock,
            options,
        }
    }

    pub fn options(&self) -> FetchOptions {
        self.options
    }

    /// A URL wins over an inline payload when both are present.
    pub fn resolve(&self, reference: &ImageReference) -> Result<Vec<u8>> {
        if let Some(url) = reference.url() {
            return self.download(url);
        }
        if let Some(inline) = reference.inline_data() {
            return decode_inline_image(inline);
        }
        Err(GenerationError::Extraction {
            snippet: "image reference has neither url nor inline data".to_string(),
        })
    }

    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt: u32 = 0;
        let mut backoff = self.options.retry_backoff;
        loop {
            match self.download_once(url) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if attempt < self.options.retries && err.is_retryable() => {
                    attempt += 1;
                    tracing::warn!(
                        url = %url,
                        attempt,
                        retries = self.options.retries,
                        error = %err,
                        "image download failed; retrying"
                    );
                    self.clock.sleep(backoff);
                    backoff = backoff.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn download_once(&self, url: &str) -> Result<Vec<u8>> {
        let request = HttpRequest::get(url, self.options.timeout);
        let response = send(self.transport.as_ref(), &request)?;
        let response = ensure_success(response, url, DOWNLOAD_ERROR_SNIPPET_CHARS)?;
        tracing::debug!(url = %url, bytes = response.body.len(), "image downloaded");
        Ok(response.body)
    }
}

/// Decodes a base64 payload, dropping a `data:...;base64,` prefix first.
pub fn decode_inline_image(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.trim();
    let payload = if trimmed.starts_with("data:") {
        trimmed
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| GenerationError::Decode("data URL has no payload".to_string()))?
    } else {
        trimmed
    };
    let compact: Vec<u8> = payload
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    BASE64
        .decode(&compact)
        .map_err(|err| GenerationError::Decode(err.to_string()))
}
