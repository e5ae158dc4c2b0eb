use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Debug for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    #[default]
    Unknown,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Unknown => "unknown",
        }
    }

    /// Lenient parse used for user-entered text. Anything unrecognized is `Unknown`.
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "income" | "수입" => TransactionType::Income,
            "expense" | "지출" => TransactionType::Expense,
            _ => TransactionType::Unknown,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Currency {
    #[serde(rename = "KRW")]
    Krw,
    #[serde(rename = "USD")]
    Usd,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Krw => "KRW",
            Currency::Usd => "USD",
            Currency::Unknown => "UNKNOWN",
        }
    }

    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_uppercase().as_str() {
            "KRW" | "원" | "₩" => Currency::Krw,
            "USD" | "달러" | "$" => Currency::Usd,
            _ => Currency::Unknown,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Factors {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// The content fields of a record. Everything a classifier produces or a user can edit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TransactionFields {
    #[serde(rename = "type", default)]
    pub ty: TransactionType,
    #[serde(default, with = "amount_as_number")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub merchant: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub factors: Factors,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub original_text: String,
    #[serde(flatten)]
    pub fields: TransactionFields,
}

impl TransactionRecord {
    pub fn new(original_text: String, created_at: DateTime<Utc>, fields: TransactionFields) -> Self {
        Self {
            id: RecordId::new_random(),
            created_at,
            original_text,
            fields,
        }
    }

    /// A record entered by hand, so there is no source sentence.
    pub fn manual(created_at: DateTime<Utc>, fields: TransactionFields) -> Self {
        Self::new(String::new(), created_at, fields)
    }

    /// The amount, but only if it counts towards totals of the given type.
    pub fn amount_if(&self, ty: TransactionType) -> Option<Decimal> {
        if self.fields.ty == ty {
            self.fields.amount
        } else {
            None
        }
    }
}

/// Whether the amount survives storage unchanged. Stored amounts are JSON numbers, so
/// more than about 15 significant digits would be rounded.
pub fn amount_is_storable(amount: Decimal) -> bool {
    amount.to_f64().and_then(Decimal::from_f64) == Some(amount)
}

/// Amounts travel as plain JSON numbers, the way the classifier produces them.
mod amount_as_number {
    use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
    use rust_decimal::Decimal;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Option<Decimal>, s: S) -> Result<S::Ok, S::Error> {
        match amount.and_then(|amount| amount.to_f64()) {
            Some(value) => s.serialize_f64(value),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(|value| {
                Decimal::from_f64(value)
                    .ok_or_else(|| D::Error::custom(format!("amount {value} is not representable")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn some_record() -> TransactionRecord {
        TransactionRecord::new(
            "점심 김치찌개 9,500원 카드 결제".to_string(),
            Utc.with_ymd_and_hms(2024, 5, 10, 3, 0, 0).unwrap(),
            TransactionFields {
                ty: TransactionType::Expense,
                amount: Some(Decimal::new(9500, 0)),
                currency: Currency::Krw,
                category: "식비".to_string(),
                merchant: "".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 5, 10),
                memo: "점심 김치찌개".to_string(),
                confidence: Some(0.95),
                factors: Factors {
                    keywords: vec!["점심".to_string(), "김치찌개".to_string()],
                    payment_method: "카드".to_string(),
                    participants: vec![],
                },
            },
        )
    }

    #[test]
    fn serializes_with_wire_names() {
        let record = some_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!("expense", json["type"]);
        assert_eq!("KRW", json["currency"]);
        assert_eq!("2024-05-10", json["date"]);
        assert_eq!(9500.0, json["amount"].as_f64().unwrap());
        assert_eq!("카드", json["factors"]["payment_method"]);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("originalText").is_some());
    }

    #[test]
    fn deserializes_record_with_null_fields() {
        let json = r#"{
            "id": "6f1c0c5e-94a4-4c49-9f4e-0a4c3b1de0a1",
            "createdAt": "2024-05-10T03:00:00Z",
            "originalText": "뭔가 샀어",
            "type": "unknown",
            "amount": null,
            "currency": "UNKNOWN",
            "category": "기타",
            "merchant": "",
            "date": null,
            "memo": "",
            "confidence": 0.2,
            "factors": {"keywords": [], "payment_method": "미상", "participants": []}
        }"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(None, record.fields.amount);
        assert_eq!(None, record.fields.date);
        assert_eq!(TransactionType::Unknown, record.fields.ty);
        assert_eq!(Some(0.2), record.fields.confidence);
    }

    #[test]
    fn storable_amounts() {
        assert!(amount_is_storable(Decimal::new(9500, 0)));
        assert!(amount_is_storable(Decimal::new(1250, 2)));
        assert!(amount_is_storable(Decimal::from_str("100000000000000000000").unwrap()));
        assert!(!amount_is_storable(Decimal::from(12_345_678_901_234_567i64)));
    }

    #[test]
    fn lenient_parsers() {
        assert_eq!(TransactionType::Income, TransactionType::parse_lenient(" 수입 "));
        assert_eq!(TransactionType::Expense, TransactionType::parse_lenient("EXPENSE"));
        assert_eq!(TransactionType::Unknown, TransactionType::parse_lenient("transfer"));
        assert_eq!(Currency::Usd, Currency::parse_lenient("usd"));
        assert_eq!(Currency::Krw, Currency::parse_lenient("원"));
        assert_eq!(Currency::Unknown, Currency::parse_lenient("EUR"));
    }

    #[test]
    fn amount_if_filters_by_type() {
        let record = some_record();
        assert_eq!(
            Some(Decimal::new(9500, 0)),
            record.amount_if(TransactionType::Expense)
        );
        assert_eq!(None, record.amount_if(TransactionType::Income));
    }
}
