use std::fmt::{Debug, Formatter};

/// Credential for the Gemini API. Never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    api_key: String,
}

impl ApiKey {
    pub fn new(api_key: String) -> ApiKey {
        ApiKey { api_key }
    }

    /// Blank values count as not configured.
    pub fn from_optional(api_key: Option<String>) -> Option<ApiKey> {
        api_key
            .map(|api_key| api_key.trim().to_string())
            .filter(|api_key| !api_key.is_empty())
            .map(ApiKey::new)
    }

    pub(super) fn expose(&self) -> &str {
        &self.api_key
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(***)")
    }
}
