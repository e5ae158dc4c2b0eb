//! Turns a sentence into candidate transactions, through the relay, Gemini or local rules.

mod api_key;
mod error;
mod gemini;
mod offline;
mod relay;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::contract::ExtractedTransaction;

pub use api_key::ApiKey;
pub use error::{error_message, ExtractError, RelayError};
pub use gemini::{
    GeminiClassifier, GeminiClient, GeminiRelay, GenerateContentRequest, Upstream,
    UpstreamResponse,
};
pub use offline::OfflineClassifier;
pub use relay::RelayClassifier;

#[cfg(test)]
pub(crate) use gemini::testutils;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Candidates in the order the events appear in the text. `today` anchors relative dates.
    async fn classify(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<Vec<ExtractedTransaction>, ExtractError>;
}
