pub mod endpoint;
pub mod extract;
pub mod prompt;
pub mod reference;
pub mod request;
pub mod size;
pub mod task;
pub mod text;

pub use extract::extract_image_reference;
pub use prompt::{normalize_prompt, MIN_PROMPT_CHARS};
pub use reference::ImageReference;
pub use request::GenerationRequest;
pub use size::{aspect_ratio_to_size, normalize_size, DEFAULT_SIZE};
pub use task::{TaskSnapshot, TaskStatus};
pub use text::{truncate_text, value_snippet};
