use serde_json::Value;

/// Truncates on a `char` boundary and marks the cut with `…`.
pub fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

pub fn value_snippet(value: &Value, max_chars: usize) -> String {
    truncate_text(&value.to_string(), max_chars)
}
