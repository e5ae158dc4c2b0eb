use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::classifier::{Classifier, ExtractError, RelayError};
use crate::db::{KvStore, LedgerError, LedgerStore, TransactionRecord};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Classifies a sentence and appends one record per extracted transaction.
///
/// All records of one sentence are appended together or not at all. If classification
/// fails the ledger is left untouched.
pub async fn capture<S: KvStore>(
    text: &str,
    classifier: &dyn Classifier,
    store: &mut LedgerStore<S>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<TransactionRecord>, CaptureError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::from(RelayError::Validation(
            "Nothing to analyze, the text is empty".to_string(),
        ))
        .into());
    }

    let candidates = classifier.classify(text, today).await?;
    let records: Vec<TransactionRecord> = candidates
        .into_iter()
        .map(|candidate| {
            for issue in &candidate.issues {
                log::warn!("Corrected classifier output: {issue}");
            }
            TransactionRecord::new(text.to_string(), now, candidate.fields)
        })
        .collect();

    if records.is_empty() {
        log::info!("No transactions found in the text");
        return Ok(records);
    }
    store.append_all(records.clone()).await?;
    Ok(records)
}
