mod file;
mod ledger;
mod record;
mod store;

pub use file::{InMemoryKvStore, JsonFileKvStore, KvStore, PersistenceError};
pub use ledger::{month_key, CategoryTotal, Ledger, Totals};
pub use record::{
    amount_is_storable, Currency, Factors, RecordId, TransactionFields, TransactionRecord,
    TransactionType,
};
pub use store::{LedgerError, LedgerStore, STORAGE_KEY};

#[cfg(test)]
pub(crate) use ledger::testutils;
