//! User corrections of a record's fields.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::contract::cues::UNSPECIFIED_PAYMENT;
use crate::db::{
    amount_is_storable, Currency, Factors, TransactionFields, TransactionRecord, TransactionType,
};

const LIST_SEPARATOR: &str = ", ";

/// Every editable field as the user typed it. Saving replaces all fields of the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordEdit {
    pub ty: String,
    pub amount: String,
    pub currency: String,
    pub category: String,
    pub merchant: String,
    pub date: String,
    pub memo: String,
    pub confidence: String,
    pub keywords: String,
    pub payment_method: String,
    pub participants: String,
}

impl RecordEdit {
    /// Pre-fills the form with the current values.
    pub fn from_record(record: &TransactionRecord) -> Self {
        Self::from_fields(&record.fields)
    }

    pub fn from_fields(fields: &TransactionFields) -> Self {
        Self {
            ty: fields.ty.as_str().to_string(),
            amount: fields
                .amount
                .map(|amount| amount.normalize().to_string())
                .unwrap_or_default(),
            currency: fields.currency.as_str().to_string(),
            category: fields.category.clone(),
            merchant: fields.merchant.clone(),
            date: fields
                .date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            memo: fields.memo.clone(),
            confidence: fields
                .confidence
                .map(|confidence| confidence.to_string())
                .unwrap_or_default(),
            keywords: fields.factors.keywords.join(LIST_SEPARATOR),
            payment_method: fields.factors.payment_method.clone(),
            participants: fields.factors.participants.join(LIST_SEPARATOR),
        }
    }

    /// Unparseable numbers and dates become `None`, never an error and never the old value.
    pub fn into_fields(self) -> TransactionFields {
        let payment_method = self.payment_method.trim();
        TransactionFields {
            ty: TransactionType::parse_lenient(&self.ty),
            amount: parse_amount(&self.amount),
            currency: Currency::parse_lenient(&self.currency),
            category: self.category.trim().to_string(),
            merchant: self.merchant.trim().to_string(),
            date: parse_date(&self.date),
            memo: self.memo.trim().to_string(),
            confidence: parse_confidence(&self.confidence),
            factors: Factors {
                keywords: split_list(&self.keywords),
                payment_method: if payment_method.is_empty() {
                    UNSPECIFIED_PAYMENT.to_string()
                } else {
                    payment_method.to_string()
                },
                participants: split_list(&self.participants),
            },
        }
    }
}

/// A plain non-negative number that storage keeps exactly. Thousands separators are allowed.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let cleaned = input.trim().replace(',', "");
    let amount = Decimal::from_str(&cleaned).ok()?;
    if amount.is_sign_negative() && !amount.is_zero() {
        None
    } else if !amount_is_storable(amount) {
        None
    } else {
        Some(amount)
    }
}

pub fn parse_confidence(input: &str) -> Option<f64> {
    let confidence: f64 = input.trim().parse().ok()?;
    (confidence.is_finite() && (0.0..=1.0).contains(&confidence)).then_some(confidence)
}

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Comma separated, trimmed, empty entries dropped, order kept.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::db::testutils::{dated, record};

    #[rstest]
    #[case("5000", Some(Decimal::new(5000, 0)))]
    #[case(" 1,500 ", Some(Decimal::new(1500, 0)))]
    #[case("12.5", Some(Decimal::new(125, 1)))]
    #[case("0", Some(Decimal::ZERO))]
    #[case("", None)]
    #[case("abc", None)]
    #[case("만원", None)]
    #[case("-3000", None)]
    #[case("12345678901234567", None)]
    #[case("100000000000000000000", Some(Decimal::from_str("100000000000000000000").unwrap()))]
    fn amounts(#[case] input: &str, #[case] expected: Option<Decimal>) {
        assert_eq!(expected, parse_amount(input));
    }

    #[rstest]
    #[case("0.8", Some(0.8))]
    #[case("1", Some(1.0))]
    #[case("0", Some(0.0))]
    #[case("1.5", None)]
    #[case("-0.1", None)]
    #[case("NaN", None)]
    #[case("high", None)]
    #[case("", None)]
    fn confidences(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(expected, parse_confidence(input));
    }

    #[test]
    fn lists_are_split_trimmed_and_compacted() {
        assert_eq!(
            vec!["점심", "김치찌개", "회사"],
            split_list(" 점심 ,김치찌개,, ,회사 ")
        );
        assert!(split_list("").is_empty());
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn unchanged_form_reproduces_fields() {
        let mut original = dated(record(TransactionType::Expense, Some(9500), "식비"), 2024, 5, 10);
        original.fields.merchant = "김밥천국".to_string();
        original.fields.memo = "점심".to_string();
        original.fields.factors = Factors {
            keywords: vec!["점심".to_string(), "김밥".to_string()],
            payment_method: "카드".to_string(),
            participants: vec!["민수".to_string()],
        };

        let edit = RecordEdit::from_record(&original);
        assert_eq!("점심, 김밥", edit.keywords);
        assert_eq!("9500", edit.amount);
        assert_eq!(original.fields, edit.into_fields());
    }

    #[test]
    fn every_field_is_replaced() {
        let original = record(TransactionType::Expense, Some(9500), "식비");
        let edit = RecordEdit {
            ty: "수입".to_string(),
            amount: "oops".to_string(),
            currency: "달러".to_string(),
            category: " 환불 ".to_string(),
            merchant: String::new(),
            date: "2024-05-01".to_string(),
            memo: "환불".to_string(),
            confidence: "2".to_string(),
            keywords: "환불".to_string(),
            payment_method: String::new(),
            participants: String::new(),
        };
        let fields = edit.into_fields();
        assert_ne!(original.fields, fields);
        assert_eq!(TransactionType::Income, fields.ty);
        assert_eq!(None, fields.amount);
        assert_eq!(Currency::Usd, fields.currency);
        assert_eq!("환불", fields.category);
        assert_eq!(NaiveDate::from_ymd_opt(2024, 5, 1), fields.date);
        assert_eq!(None, fields.confidence);
        assert_eq!("미상", fields.factors.payment_method);
    }

    #[test]
    fn invalid_date_becomes_none() {
        let edit = RecordEdit {
            date: "어제".to_string(),
            ..RecordEdit::default()
        };
        assert_eq!(None, edit.into_fields().date);
    }
}
