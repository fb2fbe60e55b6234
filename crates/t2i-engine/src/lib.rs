//! Text-to-image generation over HTTP, returning raw image bytes.
//!
//! Two provider styles share one contract ([`ImageGenerator`]):
//! - [`SyncGenerator`]: one POST whose response carries the image reference;
//! - [`TaskGenerator`]: submit a task, poll it to a terminal status, fetch.
//!
//! Transport and time are injected through [`HttpTransport`] and [`Clock`] so
//! both pipelines run unchanged against scripted providers in tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod poller;
pub mod resolver;
pub mod sync_generator;
pub mod task_generator;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SyncProviderConfig, TaskProviderConfig};
pub use error::{GenerationError, Result};
pub use poller::{PollSettings, TaskPoller};
pub use resolver::{decode_inline_image, FetchOptions, ImageResolver};
pub use sync_generator::SyncGenerator;
pub use t2i_contracts::{GenerationRequest, ImageReference, TaskStatus};
pub use task_generator::TaskGenerator;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError,
};

/// Generate one image from a prompt: bytes or a descriptive error.
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>>;
}
