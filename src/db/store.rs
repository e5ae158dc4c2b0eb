use thiserror::Error;

use super::{
    file::{KvStore, PersistenceError},
    ledger::Ledger,
    record::{RecordId, TransactionFields, TransactionRecord},
};

pub const STORAGE_KEY: &str = "talk-ledger-entries-v1";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No record with id {0}")]
    NotFound(RecordId),
    #[error("The change was applied but could not be saved: {0}")]
    Persistence(#[from] PersistenceError),
}

/// The ledger together with the store it is persisted to. Every mutation writes the
/// whole collection back under one key.
pub struct LedgerStore<S: KvStore> {
    store: S,
    key: String,
    ledger: Ledger,
}

impl<S: KvStore> LedgerStore<S> {
    pub async fn open(store: S) -> Self {
        Self::open_with_key(store, STORAGE_KEY).await
    }

    /// Unreadable or malformed stored data yields an empty ledger instead of an error.
    pub async fn open_with_key(store: S, key: &str) -> Self {
        log::info!("Loading ledger...");
        let ledger = match load(&store, key).await {
            Ok(ledger) => ledger,
            Err(err) => {
                log::warn!("Could not load stored ledger, starting with an empty one: {err}");
                Ledger::new_empty()
            }
        };
        log::info!("Loading ledger...done ({} records)", ledger.len());
        Self {
            store,
            key: key.to_string(),
            ledger,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn kv_store(&self) -> &S {
        &self.store
    }

    pub async fn append(&mut self, record: TransactionRecord) -> Result<(), LedgerError> {
        self.append_all(vec![record]).await
    }

    /// Appends several records with a single write. The last one ends up newest.
    pub async fn append_all(&mut self, records: Vec<TransactionRecord>) -> Result<(), LedgerError> {
        for record in records {
            log::debug!("Appending record {}", record.id);
            self.ledger.push_front(record);
        }
        self.save().await
    }

    /// Replaces all content fields of the record. Its id, capture time and source text stay.
    pub async fn update(
        &mut self,
        id: &RecordId,
        fields: TransactionFields,
    ) -> Result<(), LedgerError> {
        let record = self
            .ledger
            .get_mut(id)
            .ok_or(LedgerError::NotFound(*id))?;
        record.fields = fields;
        self.save().await
    }

    pub async fn save(&self) -> Result<(), LedgerError> {
        let serialized = serde_json::to_string(&self.ledger).map_err(PersistenceError::from)?;
        self.store.put(&self.key, serialized).await?;
        Ok(())
    }
}

async fn load(store: &impl KvStore, key: &str) -> Result<Ledger, PersistenceError> {
    match store.get(key).await? {
        Some(serialized) => Ok(serde_json::from_str(&serialized)?),
        None => Ok(Ledger::new_empty()),
    }
}
