/// Floor applied to any configured prompt limit.
pub const MIN_PROMPT_CHARS: usize = 100;

/// Trims the prompt and caps it at `max(max_chars, MIN_PROMPT_CHARS)` chars.
///
/// The cut is made on a `char` boundary and the result is right-trimmed, so a
/// truncated prompt never ends in whitespace.
pub fn normalize_prompt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let limit = max_chars.max(MIN_PROMPT_CHARS);
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(limit).collect();
    cut.trim_end().to_string()
}
