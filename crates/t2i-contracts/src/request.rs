use serde::{Deserialize, Serialize};

/// One text-to-image call. Unset fields fall back to the provider config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_extend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<bool>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(aspect_ratio.into());
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn with_prompt_extend(mut self, prompt_extend: bool) -> Self {
        self.prompt_extend = Some(prompt_extend);
        self
    }

    pub fn with_watermark(mut self, watermark: bool) -> Self {
        self.watermark = Some(watermark);
        self
    }

    /// Explicit model, ignoring blank values.
    pub fn model(&self) -> Option<&str> {
        non_blank(self.model.as_deref())
    }

    pub fn size(&self) -> Option<&str> {
        non_blank(self.size.as_deref())
    }

    pub fn aspect_ratio(&self) -> Option<&str> {
        non_blank(self.aspect_ratio.as_deref())
    }

    pub fn has_blank_prompt(&self) -> bool {
        self.prompt.trim().is_empty()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::GenerationRequest;

    #[test]
    fn blank_overrides_are_ignored() {
        let request = GenerationRequest::new("a lighthouse")
            .with_model("  ")
            .with_size("")
            .with_aspect_ratio(" 16:9 ");
        assert_eq!(request.model(), None);
        assert_eq!(request.size(), None);
        assert_eq!(request.aspect_ratio(), Some("16:9"));
        assert!(!request.has_blank_prompt());
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"a cat","watermark":true}"#).unwrap();
        assert_eq!(request.prompt, "a cat");
        assert_eq!(request.watermark, Some(true));
        assert_eq!(request.prompt_extend, None);
        assert!(GenerationRequest::new(" \t").has_blank_prompt());
    }
}
