//! Base-URL handling for the two provider URL conventions.
//!
//! Both conventions are sensitive to duplicated or missing path segments, so
//! the rules here are applied verbatim rather than through a URL parser.

pub const MULTIMODAL_GENERATION_PATH: &str = "/services/aigc/multimodal-generation/generation";

/// Ensures a leading `/`; blank input takes `default`.
pub fn normalize_endpoint_path(path: &str, default: &str) -> String {
    let trimmed = path.trim();
    let path = if trimmed.is_empty() {
        default.trim()
    } else {
        trimmed
    };
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Task-style base URL: drops a trailing `/vN` from the base when the
/// endpoint path already starts with the same `/vN` segment.
pub fn normalize_task_base_url(base_url: &str, endpoint_path: &str) -> String {
    let mut base = base_url.trim().trim_end_matches('/').to_string();
    if let Some(version) = leading_version_segment(endpoint_path) {
        if let Some(stripped) = base.strip_suffix(version) {
            base = stripped.trim_end_matches('/').to_string();
        }
    }
    base
}

/// Multimodal-generation base URL: cuts an accidentally included generation
/// path and completes the `/api/v1` prefix.
pub fn normalize_multimodal_base_url(base_url: &str) -> String {
    let mut base = base_url.trim().trim_end_matches('/').to_string();
    if let Some((head, _)) = base.split_once(MULTIMODAL_GENERATION_PATH) {
        base = head.trim_end_matches('/').to_string();
    }
    if base.ends_with("/api") {
        base.push_str("/v1");
    } else if !base.contains("/api/") && base.contains("dashscope") {
        base.push_str("/api/v1");
    }
    base
}

pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{base_url}{path}")
}

/// `/v1` for `/v1/images/generations`, `/v2` for `/v2beta/...`.
fn leading_version_segment(endpoint_path: &str) -> Option<&str> {
    let rest = endpoint_path.strip_prefix("/v")?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some(&endpoint_path[..2 + digits])
}
