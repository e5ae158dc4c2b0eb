use serde::Deserialize;

use crate::classifier::ExtractError;

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Pulls the model's text out of a `generateContent` response body by concatenating
/// the text parts of the first candidate.
pub fn model_text(body: &str) -> Result<String, ExtractError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|err| {
        ExtractError::MalformedPayload(format!("response envelope is not valid: {err}"))
    })?;
    let text: String = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ExtractError::EmptyResponse);
    }
    Ok(text)
}
