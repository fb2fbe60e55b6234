pub const DEFAULT_SIZE: &str = "1280*1280";

const ASPECT_RATIO_SIZES: &[(&str, &str)] = &[
    ("1:1", "1280*1280"),
    ("2:3", "800*1200"),
    ("3:2", "1200*800"),
    ("3:4", "960*1280"),
    ("4:3", "1280*960"),
    ("9:16", "720*1280"),
    ("16:9", "1280*720"),
    ("21:9", "1344*576"),
];

pub fn aspect_ratio_to_size(aspect_ratio: &str) -> &'static str {
    let ratio = aspect_ratio.trim();
    ASPECT_RATIO_SIZES
        .iter()
        .find(|(key, _)| *key == ratio)
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_SIZE)
}

/// Renders an explicit `WxH` size as `W*H`, falling back to the aspect-ratio
/// table when the size is missing or malformed.
pub fn normalize_size(size: Option<&str>, aspect_ratio: &str) -> String {
    size.and_then(parse_dims)
        .map(|(width, height)| format!("{width}*{height}"))
        .unwrap_or_else(|| aspect_ratio_to_size(aspect_ratio).to_string())
}

fn parse_dims(raw: &str) -> Option<(u64, u64)> {
    let normalized = raw
        .trim()
        .to_ascii_lowercase()
        .replace(['x', '×'], "*");
    let parts = normalized
        .split('*')
        .filter(|part| !part.is_empty())
        .collect::<Vec<&str>>();
    let [width, height] = parts.as_slice() else {
        return None;
    };
    if !is_ascii_digits(width) || !is_ascii_digits(height) {
        return None;
    }
    Some((width.parse().ok()?, height.parse().ok()?))
}

fn is_ascii_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}
