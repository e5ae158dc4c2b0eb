//! What a classifier is asked to produce and how its answer is turned into typed fields.

mod amount;
pub mod cues;
mod date;
mod envelope;
mod prompt;
mod rules;
mod validate;

use chrono::NaiveDate;

use crate::classifier::ExtractError;

pub use amount::extract_amount;
pub use date::resolve_date;
pub use envelope::model_text;
pub use prompt::system_prompt;
pub use rules::extract as extract_with_rules;
pub use validate::{parse_candidates, ExtractedTransaction, FieldIssue};

/// Decodes a raw `generateContent` response body into validated candidates.
pub fn decode_response(
    body: &str,
    today: NaiveDate,
) -> Result<Vec<ExtractedTransaction>, ExtractError> {
    let text = model_text(body)?;
    parse_candidates(&text, today)
}
