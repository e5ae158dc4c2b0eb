use serde_json::Value;
use thiserror::Error;

/// Failures of the relay hop in front of the classifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Relay is not configured: {0}")]
    Configuration(String),
    #[error("Classifier request failed with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Classifier response could not be parsed: {0}")]
    UpstreamFormat(String),
}

impl RelayError {
    pub fn status(&self) -> u16 {
        match self {
            RelayError::Validation(_) => 400,
            RelayError::Configuration(_) => 500,
            RelayError::Upstream { status, .. } => *status,
            RelayError::UpstreamFormat(_) => 502,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RelayError::Validation(message)
            | RelayError::Configuration(message)
            | RelayError::Upstream { message, .. }
            | RelayError::UpstreamFormat(message) => message,
        }
    }

    /// Reconstructs the error from a non-success relay response. The relay's own errors carry
    /// a string `error`; anything else was passed through from the classifier service.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = error_message(body);
        match (status, is_relay_error_body(body)) {
            (400, true) => RelayError::Validation(message),
            (500, true) => RelayError::Configuration(message),
            (status, _) => RelayError::Upstream { status, message },
        }
    }
}

fn is_relay_error_body(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .is_ok_and(|value| matches!(value.get("error"), Some(Value::String(_))))
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("The classifier returned an empty response")]
    EmptyResponse,
    #[error("The classifier response is not in the expected shape: {0}")]
    MalformedPayload(String),
}

/// Finds a human readable message in an error body. Understands the relay's
/// `{"error": "..."}` and Gemini's `{"error": {"message": "..."}}`, else returns the body.
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|value| match value.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(Value::Object(error)) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    });
    message.unwrap_or_else(|| body.trim().to_string())
}
