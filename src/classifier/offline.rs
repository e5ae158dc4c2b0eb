use async_trait::async_trait;
use chrono::NaiveDate;

use super::{Classifier, ExtractError};
use crate::contract::{self, ExtractedTransaction};

/// Applies the contract's cue rules locally. Needs no credential and no network.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClassifier;

#[async_trait]
impl Classifier for OfflineClassifier {
    async fn classify(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<Vec<ExtractedTransaction>, ExtractError> {
        Ok(contract::extract_with_rules(text, today)
            .into_iter()
            .map(ExtractedTransaction::clean)
            .collect())
    }
}
