use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::record::{RecordId, TransactionRecord, TransactionType};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

/// All records, newest first. Aggregates are computed from the live records on every call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Ledger {
    records: Vec<TransactionRecord>,
}

impl Ledger {
    pub fn new_empty() -> Self {
        Self { records: vec![] }
    }

    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &RecordId) -> Option<&TransactionRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    pub(super) fn get_mut(&mut self, id: &RecordId) -> Option<&mut TransactionRecord> {
        self.records.iter_mut().find(|record| &record.id == id)
    }

    /// Records whose id starts with the given prefix, for picking a record by a short id.
    pub fn find_by_prefix<'a>(
        &'a self,
        prefix: &str,
    ) -> impl Iterator<Item = &'a TransactionRecord> + 'a {
        let prefix = prefix.trim().to_lowercase().replace('-', "");
        self.records
            .iter()
            .filter(move |record| record.id.0.simple().to_string().starts_with(&prefix))
    }

    pub(super) fn push_front(&mut self, record: TransactionRecord) {
        self.records.insert(0, record);
    }

    pub fn totals(&self) -> Totals {
        let income = self.sum_of(TransactionType::Income);
        let expense = self.sum_of(TransactionType::Expense);
        Totals {
            income,
            expense,
            balance: capped_sum(income, -expense),
        }
    }

    fn sum_of(&self, ty: TransactionType) -> Decimal {
        self.records
            .iter()
            .filter_map(|record| record.amount_if(ty))
            .fold(Decimal::ZERO, capped_sum)
    }

    /// Expense sums per category, largest first. Ties keep the order in which
    /// the categories were first seen in the ledger.
    pub fn category_breakdown(&self, limit: usize) -> Vec<CategoryTotal> {
        let mut totals: Vec<CategoryTotal> = vec![];
        for record in &self.records {
            let Some(amount) = record.amount_if(TransactionType::Expense) else {
                continue;
            };
            match totals
                .iter_mut()
                .find(|total| total.category == record.fields.category)
            {
                Some(total) => total.amount = capped_sum(total.amount, amount),
                None => totals.push(CategoryTotal {
                    category: record.fields.category.clone(),
                    amount,
                }),
            }
        }
        // sort_by is stable, so equal sums stay in first-seen order
        totals.sort_by(|lhs, rhs| rhs.amount.cmp(&lhs.amount));
        totals.truncate(limit);
        totals
    }
}

/// Sums beyond the `Decimal` range stick to its bound instead of overflowing.
fn capped_sum(lhs: Decimal, rhs: Decimal) -> Decimal {
    lhs.checked_add(rhs).unwrap_or_else(|| {
        log::warn!("Sum of amounts is out of range, capping it");
        if rhs.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// `YYYY-MM` of the transaction date, falling back to the capture date. Every record has a
/// capture date, so there is always a month.
pub fn month_key(record: &TransactionRecord) -> String {
    match record.fields.date {
        Some(date) => date.format("%Y-%m").to_string(),
        None => record.created_at.date_naive().format("%Y-%m").to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testutils {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::db::{Currency, Factors, TransactionFields, TransactionRecord, TransactionType};

    pub fn record(ty: TransactionType, amount: Option<i64>, category: &str) -> TransactionRecord {
        TransactionRecord::new(
            format!("{category} {amount:?}"),
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
            TransactionFields {
                ty,
                amount: amount.map(|amount| Decimal::new(amount, 0)),
                currency: Currency::Krw,
                category: category.to_string(),
                merchant: String::new(),
                date: None,
                memo: String::new(),
                confidence: Some(0.9),
                factors: Factors::default(),
            },
        )
    }

    pub fn dated(mut record: TransactionRecord, y: i32, m: u32, d: u32) -> TransactionRecord {
        record.fields.date = NaiveDate::from_ymd_opt(y, m, d);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::testutils::{dated, record};
    use super::*;
    use crate::db::TransactionType::{Expense, Income, Unknown};

    fn some_ledger() -> Ledger {
        let mut ledger = Ledger::new_empty();
        for record in [
            record(Income, Some(3_000_000), "월급"),
            record(Expense, Some(10_000), "식비"),
            record(Expense, Some(5_000), "카페"),
            record(Expense, None, "식비"),
            record(Unknown, Some(70_000), "기타"),
            record(Expense, Some(8_000), "식비"),
            record(Income, Some(50_000), "용돈"),
        ] {
            ledger.push_front(record);
        }
        ledger
    }

    #[test]
    fn huge_amounts_do_not_overflow_aggregates() {
        let mut huge = record(Expense, None, "식비");
        huge.fields.amount = Some(Decimal::MAX);
        let mut ledger = Ledger::new_empty();
        ledger.push_front(huge.clone());
        ledger.push_front(huge);
        ledger.push_front(record(Income, Some(1_000), "월급"));

        let totals = ledger.totals();
        assert_eq!(Decimal::MAX, totals.expense);
        assert_eq!(Decimal::new(1_000, 0) - Decimal::MAX, totals.balance);
        assert_eq!(Decimal::MAX, ledger.category_breakdown(1)[0].amount);
    }

    #[test]
    fn totals_only_count_typed_records_with_amounts() {
        let totals = some_ledger().totals();
        assert_eq!(Decimal::new(3_050_000, 0), totals.income);
        assert_eq!(Decimal::new(23_000, 0), totals.expense);
        assert_eq!(totals.income - totals.expense, totals.balance);
    }

    #[test]
    fn totals_are_independent_of_order() {
        let ledger = some_ledger();
        let mut reversed = ledger.records().to_vec();
        reversed.reverse();
        assert_eq!(ledger.totals(), Ledger::from_records(reversed).totals());
    }

    #[test]
    fn totals_of_empty_ledger() {
        assert_eq!(Totals::default(), Ledger::new_empty().totals());
    }

    #[test]
    fn push_front_keeps_newest_first() {
        let mut ledger = Ledger::new_empty();
        let first = record(Expense, Some(1), "a");
        let second = record(Expense, Some(2), "b");
        ledger.push_front(first.clone());
        ledger.push_front(second.clone());
        assert_eq!(vec![second, first], ledger.records().to_vec());
    }

    #[test]
    fn category_breakdown_sorted_descending() {
        let breakdown = some_ledger().category_breakdown(10);
        assert_eq!(
            vec![
                CategoryTotal {
                    category: "식비".to_string(),
                    amount: Decimal::new(18_000, 0),
                },
                CategoryTotal {
                    category: "카페".to_string(),
                    amount: Decimal::new(5_000, 0),
                },
            ],
            breakdown
        );
    }

    #[test]
    fn category_breakdown_respects_limit() {
        assert_eq!(1, some_ledger().category_breakdown(1).len());
        assert!(some_ledger().category_breakdown(0).is_empty());
    }

    #[test]
    fn category_breakdown_ties_keep_first_seen_order() {
        let ledger = Ledger::from_records(vec![
            record(Expense, Some(100), "교통"),
            record(Expense, Some(100), "쇼핑"),
            record(Expense, Some(50), "식비"),
            record(Expense, Some(50), "식비"),
        ]);
        let categories: Vec<String> = ledger
            .category_breakdown(3)
            .into_iter()
            .map(|total| total.category)
            .collect();
        assert_eq!(vec!["교통", "쇼핑", "식비"], categories);
    }

    #[test]
    fn month_key_prefers_transaction_date() {
        let with_date = dated(record(Expense, Some(1), "a"), 2023, 12, 31);
        assert_eq!("2023-12", month_key(&with_date));
        let without_date = record(Expense, Some(1), "a");
        assert_eq!("2024-05", month_key(&without_date));
    }

    #[test]
    fn find_by_prefix() {
        let ledger = some_ledger();
        let target = &ledger.records()[2];
        let prefix = target.id.short();
        let found: Vec<_> = ledger.find_by_prefix(&prefix).collect();
        assert_eq!(vec![target], found);
        assert_eq!(ledger.len(), ledger.find_by_prefix("").count());
    }
}
