/// Either a remote URL or an inline (optionally `data:`-prefixed) base64 payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReference {
    pub url: Option<String>,
    pub inline_data: Option<String>,
}

impl ImageReference {
    pub fn new(url: Option<&str>, inline_data: Option<&str>) -> Self {
        Self {
            url: non_blank(url),
            inline_data: non_blank(inline_data),
        }
    }

    pub fn from_url(url: &str) -> Self {
        Self::new(Some(url), None)
    }

    pub fn from_inline(inline_data: &str) -> Self {
        Self::new(None, Some(inline_data))
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.inline_data.is_none()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn inline_data(&self) -> Option<&str> {
        self.inline_data.as_deref()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
