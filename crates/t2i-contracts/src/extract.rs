//! Image reference extraction over provider-shaped JSON.
//!
//! Providers wrap the same answer (a URL or an inline base64 payload) in
//! different envelopes. Each strategy below probes one envelope and is total:
//! it never panics and returns `None` when its shape is absent or empty. The
//! first strategy that yields a non-empty reference wins.

use serde_json::{Map, Value};

use crate::reference::ImageReference;

type Strategy = fn(&Value) -> Option<ImageReference>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("output.results", from_output_results),
    ("output.choices", from_output_choices),
];

const URL_KEYS: &[&str] = &["image", "image_url", "url"];
const INLINE_KEYS: &[&str] = &["b64_json", "b64", "base64"];

/// Runs every strategy in order; an empty reference means "not found".
pub fn extract_image_reference(payload: &Value) -> ImageReference {
    extract_with_strategy(payload)
        .map(|(_, reference)| reference)
        .unwrap_or_default()
}

/// Same as [`extract_image_reference`] but also names the matching envelope.
pub fn extract_with_strategy(payload: &Value) -> Option<(&'static str, ImageReference)> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(payload)
            .filter(|reference| !reference.is_empty())
            .map(|reference| (*name, reference))
    })
}

fn from_output_results(payload: &Value) -> Option<ImageReference> {
    let first = payload
        .get("output")?
        .get("results")?
        .as_array()?
        .first()?
        .as_object()?;
    let url = first
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty());
    non_empty(ImageReference::new(url, inline_field(first)))
}

fn from_output_choices(payload: &Value) -> Option<ImageReference> {
    let choices = payload.get("output")?.get("choices")?.as_array()?;
    choices
        .iter()
        .filter_map(|choice| choice.get("message").and_then(Value::as_object))
        .filter_map(|message| message.get("content"))
        .find_map(|content| match content {
            Value::Array(parts) => parts
                .iter()
                .filter_map(Value::as_object)
                .find_map(probe_part),
            Value::Object(part) => probe_part(part),
            _ => None,
        })
}

fn probe_part(part: &Map<String, Value>) -> Option<ImageReference> {
    let url = URL_KEYS
        .iter()
        .filter_map(|key| part.get(*key))
        .find_map(url_value);
    non_empty(ImageReference::new(url, inline_field(part)))
}

fn url_value(value: &Value) -> Option<&str> {
    let raw = match value {
        Value::String(url) => url.as_str(),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str)?,
        _ => return None,
    };
    Some(raw.trim()).filter(|url| !url.is_empty())
}

fn inline_field(obj: &Map<String, Value>) -> Option<&str> {
    INLINE_KEYS
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

fn non_empty(reference: ImageReference) -> Option<ImageReference> {
    Some(reference).filter(|reference| !reference.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_image_reference, extract_with_strategy};
    use crate::reference::ImageReference;

    #[test]
    fn results_branch_reads_url_and_inline_precedence() {
        let payload = json!({
            "output": {"results": [{"url": "https://x/a.png", "b64": "", "base64": "QQ=="}]}
        });
        let reference = extract_image_reference(&payload);
        assert_eq!(reference.url(), Some("https://x/a.png"));
        assert_eq!(reference.inline_data(), Some("QQ=="));

        let payload = json!({
            "output": {"results": [{"b64_json": "aGVsbG8=", "b64": "ignored"}]}
        });
        assert_eq!(
            extract_image_reference(&payload),
            ImageReference::from_inline("aGVsbG8=")
        );
    }

    #[test]
    fn choices_branch_scans_content_sequences() {
        let payload = json!({
            "output": {
                "choices": [
                    {"message": "not-an-object"},
                    {"message": {"content": [{"text": "caption"}, {"image": "https://x/wan.png"}]}}
                ]
            }
        });
        let (strategy, reference) = extract_with_strategy(&payload).unwrap();
        assert_eq!(strategy, "output.choices");
        assert_eq!(reference.url(), Some("https://x/wan.png"));
    }

    #[test]
    fn choices_branch_handles_single_object_content() {
        let payload = json!({
            "output": {
                "choices": [{"message": {"content": {"image_url": {"url": "https://x/obj.png"}}}}]
            }
        });
        assert_eq!(
            extract_image_reference(&payload).url(),
            Some("https://x/obj.png")
        );

        let payload = json!({
            "output": {"choices": [{"message": {"content": {"b64": "data:image/png;base64,QQ=="}}}]}
        });
        assert_eq!(
            extract_image_reference(&payload).inline_data(),
            Some("data:image/png;base64,QQ==")
        );
    }

    #[test]
    fn url_key_precedence_is_image_then_image_url_then_url() {
        let payload = json!({
            "output": {"choices": [{"message": {"content": [
                {"url": "https://x/3.png", "image_url": "https://x/2.png", "image": "https://x/1.png"}
            ]}}]}
        });
        assert_eq!(extract_image_reference(&payload).url(), Some("https://x/1.png"));
    }

    #[test]
    fn empty_results_fall_through_to_choices() {
        let payload = json!({
            "output": {
                "results": [{"url": ""}],
                "choices": [{"message": {"content": [{"url": "https://x/c.png"}]}}]
            }
        });
        assert_eq!(extract_image_reference(&payload).url(), Some("https://x/c.png"));
    }

    #[test]
    fn unknown_shapes_yield_empty_reference() {
        for payload in [
            json!(null),
            json!("string"),
            json!([1, 2, 3]),
            json!({}),
            json!({"output": null}),
            json!({"output": {"results": []}}),
            json!({"output": {"results": ["not-an-object"]}}),
            json!({"output": {"choices": [{"message": {"content": "plain text"}}]}}),
            json!({"data": [{"url": "https://x/openai-shape.png"}]}),
        ] {
            assert!(extract_image_reference(&payload).is_empty(), "{payload}");
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let payload = json!({
            "output": {"choices": [{"message": {"content": [{"image": "https://x/i.png"}]}}]}
        });
        let first = extract_image_reference(&payload);
        let second = extract_image_reference(&payload);
        assert_eq!(first, second);
    }
}
