use chrono::NaiveDate;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

use super::{amount::extract_amount, cues, date::resolve_date};
use crate::classifier::ExtractError;
use crate::db::{amount_is_storable, Currency, Factors, TransactionFields, TransactionType};

/// One candidate transaction as the classifier described it, after schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTransaction {
    pub fields: TransactionFields,
    /// Everything that had to be corrected or dropped to make the candidate fit the schema.
    pub issues: Vec<FieldIssue>,
}

impl ExtractedTransaction {
    pub fn clean(fields: TransactionFields) -> Self {
        Self {
            fields,
            issues: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: String,
}

impl Display for FieldIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// Parses the model's text into typed candidates.
///
/// The text must be a JSON array of objects or a single object. Field values are untrusted:
/// out-of-range or ill-typed values are replaced and reported as [FieldIssue]s, but a
/// candidate that isn't an object fails the whole payload.
pub fn parse_candidates(
    model_text: &str,
    today: NaiveDate,
) -> Result<Vec<ExtractedTransaction>, ExtractError> {
    let payload: Value = serde_json::from_str(strip_code_fence(model_text)).map_err(|err| {
        ExtractError::MalformedPayload(format!("classifier output is not JSON: {err}"))
    })?;
    let candidates = match payload {
        Value::Array(candidates) => candidates,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(ExtractError::MalformedPayload(format!(
                "expected an array of transactions, got {}",
                kind(&other)
            )))
        }
    };
    candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| match candidate {
            Value::Object(object) => Ok(validate_candidate(&object, today)),
            other => Err(ExtractError::MalformedPayload(format!(
                "transaction {index} is {}, not an object",
                kind(&other)
            ))),
        })
        .collect()
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn validate_candidate(object: &Map<String, Value>, today: NaiveDate) -> ExtractedTransaction {
    let mut validator = Validator {
        issues: vec![],
        today,
    };
    let factors = match object.get("factors") {
        Some(Value::Object(factors)) => validator.factors(factors),
        None | Some(Value::Null) => Factors {
            payment_method: cues::UNSPECIFIED_PAYMENT.to_string(),
            ..Factors::default()
        },
        Some(other) => {
            validator.issue("factors", format!("expected an object, got {}", kind(other)));
            Factors {
                payment_method: cues::UNSPECIFIED_PAYMENT.to_string(),
                ..Factors::default()
            }
        }
    };
    let fields = TransactionFields {
        ty: validator.transaction_type(object.get("type")),
        amount: validator.amount(object.get("amount")),
        currency: validator.currency(object.get("currency")),
        category: validator.category(object.get("category")),
        merchant: validator.text("merchant", object.get("merchant")),
        date: validator.date(object.get("date")),
        memo: validator.text("memo", object.get("memo")),
        confidence: validator.confidence(object.get("confidence")),
        factors,
    };
    ExtractedTransaction {
        fields,
        issues: validator.issues,
    }
}

struct Validator {
    issues: Vec<FieldIssue>,
    today: NaiveDate,
}

impl Validator {
    fn issue(&mut self, field: &'static str, problem: impl Into<String>) {
        self.issues.push(FieldIssue {
            field,
            problem: problem.into(),
        });
    }

    fn transaction_type(&mut self, value: Option<&Value>) -> TransactionType {
        match value {
            None | Some(Value::Null) => TransactionType::Unknown,
            Some(Value::String(ty)) => match ty.trim().to_lowercase().as_str() {
                "income" => TransactionType::Income,
                "expense" => TransactionType::Expense,
                "unknown" => TransactionType::Unknown,
                other => {
                    self.issue("type", format!("unknown type {other:?}"));
                    TransactionType::Unknown
                }
            },
            Some(other) => {
                self.issue("type", format!("expected a string, got {}", kind(other)));
                TransactionType::Unknown
            }
        }
    }

    fn amount(&mut self, value: Option<&Value>) -> Option<Decimal> {
        let amount = match value {
            None | Some(Value::Null) => return None,
            Some(Value::Number(number)) => {
                match number.as_f64().and_then(Decimal::from_f64) {
                    Some(amount) => amount,
                    None => {
                        self.issue("amount", format!("{number} is not a usable number"));
                        return None;
                    }
                }
            }
            Some(Value::String(text)) => match extract_amount(text) {
                Some(amount) => {
                    self.issue("amount", format!("normalized {text:?} to {amount}"));
                    amount
                }
                None => {
                    self.issue("amount", format!("{text:?} is not an amount"));
                    return None;
                }
            },
            Some(other) => {
                self.issue("amount", format!("expected a number, got {}", kind(other)));
                return None;
            }
        };
        if amount.is_sign_negative() && !amount.is_zero() {
            self.issue("amount", format!("negative amount {amount} dropped"));
            return None;
        }
        if !amount_is_storable(amount) {
            self.issue("amount", format!("{amount} has too many digits, dropped"));
            return None;
        }
        Some(amount)
    }

    fn currency(&mut self, value: Option<&Value>) -> Currency {
        match value {
            None | Some(Value::Null) => Currency::Unknown,
            Some(Value::String(currency)) => {
                let parsed = Currency::parse_lenient(currency);
                if parsed == Currency::Unknown && !currency.trim().eq_ignore_ascii_case("unknown") {
                    self.issue("currency", format!("unknown currency {currency:?}"));
                }
                parsed
            }
            Some(other) => {
                self.issue("currency", format!("expected a string, got {}", kind(other)));
                Currency::Unknown
            }
        }
    }

    fn category(&mut self, value: Option<&Value>) -> String {
        let category = self.text("category", value);
        if category.is_empty() {
            return cues::FALLBACK_CATEGORY.to_string();
        }
        if !cues::is_known_category(&category) {
            log::debug!("Classifier used a category outside the known labels: {category}");
        }
        category
    }

    fn text(&mut self, field: &'static str, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.trim().to_string(),
            Some(Value::Number(number)) => number.to_string(),
            Some(other) => {
                self.issue(field, format!("expected a string, got {}", kind(other)));
                String::new()
            }
        }
    }

    fn date(&mut self, value: Option<&Value>) -> Option<NaiveDate> {
        let text = match value {
            None | Some(Value::Null) => return None,
            Some(Value::String(text)) => text.trim(),
            Some(other) => {
                self.issue("date", format!("expected a string, got {}", kind(other)));
                return None;
            }
        };
        if text.is_empty() {
            return None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(date);
        }
        match resolve_date(text, self.today) {
            Some(date) => {
                self.issue("date", format!("resolved {text:?} to {date}"));
                Some(date)
            }
            None => {
                self.issue("date", format!("{text:?} is not a date"));
                None
            }
        }
    }

    fn confidence(&mut self, value: Option<&Value>) -> Option<f64> {
        let confidence = match value {
            None | Some(Value::Null) => return None,
            Some(Value::Number(number)) => number.as_f64()?,
            Some(other) => {
                self.issue(
                    "confidence",
                    format!("expected a number, got {}", kind(other)),
                );
                return None;
            }
        };
        if !confidence.is_finite() {
            self.issue("confidence", "not a finite number");
            return None;
        }
        if !(0.0..=1.0).contains(&confidence) {
            self.issue("confidence", format!("{confidence} clamped to [0, 1]"));
        }
        Some(confidence.clamp(0.0, 1.0))
    }

    fn factors(&mut self, factors: &Map<String, Value>) -> Factors {
        let payment_method = self.text("factors.payment_method", factors.get("payment_method"));
        Factors {
            keywords: self.string_list("factors.keywords", factors.get("keywords")),
            payment_method: if payment_method.is_empty() {
                cues::UNSPECIFIED_PAYMENT.to_string()
            } else {
                payment_method
            },
            participants: self.string_list("factors.participants", factors.get("participants")),
        }
    }

    fn string_list(&mut self, field: &'static str, value: Option<&Value>) -> Vec<String> {
        let items = match value {
            None | Some(Value::Null) => return vec![],
            Some(Value::Array(items)) => items,
            Some(Value::String(text)) => {
                return text
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            Some(other) => {
                self.issue(field, format!("expected a list, got {}", kind(other)));
                return vec![];
            }
        };
        let mut list = vec![];
        for item in items {
            match item {
                Value::String(text) if !text.trim().is_empty() => {
                    list.push(text.trim().to_string())
                }
                Value::String(_) => {}
                other => self.issue(field, format!("dropped {} entry", kind(other))),
            }
        }
        list
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn parse_one(json: &str) -> ExtractedTransaction {
        let mut candidates = parse_candidates(json, today()).unwrap();
        assert_eq!(1, candidates.len());
        candidates.remove(0)
    }

    #[test]
    fn well_formed_array() {
        let candidates = parse_candidates(
            r#"[
                {"type": "expense", "amount": 10000, "currency": "KRW", "category": "식비",
                 "merchant": "", "date": "2024-05-10", "memo": "점심 김치찌개", "confidence": 0.95,
                 "factors": {"keywords": ["점심", "김치찌개"], "payment_method": "미상", "participants": []}},
                {"type": "expense", "amount": 5000, "currency": "KRW", "category": "카페",
                 "merchant": "", "date": "2024-05-10", "memo": "카페 커피", "confidence": 0.9,
                 "factors": {"keywords": ["커피"], "payment_method": "카드", "participants": ["민수"]}}
            ]"#,
            today(),
        )
        .unwrap();
        assert_eq!(2, candidates.len());
        assert!(candidates.iter().all(|candidate| candidate.issues.is_empty()));

        let first = &candidates[0].fields;
        assert_eq!(TransactionType::Expense, first.ty);
        assert_eq!(Some(Decimal::new(10000, 0)), first.amount);
        assert_eq!(Currency::Krw, first.currency);
        assert_eq!(NaiveDate::from_ymd_opt(2024, 5, 10), first.date);
        assert_eq!(vec!["점심", "김치찌개"], first.factors.keywords);

        let second = &candidates[1].fields;
        assert_eq!("카페", second.category);
        assert_eq!("카드", second.factors.payment_method);
        assert_eq!(vec!["민수"], second.factors.participants);
    }

    #[test]
    fn single_object_is_one_candidate() {
        let candidate = parse_one(r#"{"type": "income", "amount": 3000000, "category": "월급"}"#);
        assert_eq!(TransactionType::Income, candidate.fields.ty);
        assert_eq!(Some(Decimal::new(3_000_000, 0)), candidate.fields.amount);
        assert_eq!("미상", candidate.fields.factors.payment_method);
    }

    #[test]
    fn empty_array_is_no_candidates() {
        assert!(parse_candidates("[]", today()).unwrap().is_empty());
    }

    #[test]
    fn nulls_stay_null() {
        let candidate = parse_one(
            r#"{"type": "unknown", "amount": null, "currency": "UNKNOWN", "date": null, "confidence": null}"#,
        );
        assert!(candidate.issues.is_empty());
        assert_eq!(None, candidate.fields.amount);
        assert_eq!(None, candidate.fields.date);
        assert_eq!(None, candidate.fields.confidence);
        assert_eq!(Currency::Unknown, candidate.fields.currency);
        assert_eq!("기타", candidate.fields.category);
    }

    #[test]
    fn confidence_outside_range_is_clamped_and_flagged() {
        let high = parse_one(r#"{"confidence": 1.7}"#);
        assert_eq!(Some(1.0), high.fields.confidence);
        assert_eq!("confidence", high.issues[0].field);

        let low = parse_one(r#"{"confidence": -0.2}"#);
        assert_eq!(Some(0.0), low.fields.confidence);
        assert_eq!(1, low.issues.len());
    }

    #[test]
    fn negative_amount_is_dropped() {
        let candidate = parse_one(r#"{"type": "expense", "amount": -5000}"#);
        assert_eq!(None, candidate.fields.amount);
        assert_eq!("amount", candidate.issues[0].field);
    }

    #[test]
    fn amount_strings_are_normalized() {
        let candidate = parse_one(r#"{"amount": "2만5천원"}"#);
        assert_eq!(Some(Decimal::new(25_000, 0)), candidate.fields.amount);
        assert_eq!(1, candidate.issues.len());

        let candidate = parse_one(r#"{"amount": "많이"}"#);
        assert_eq!(None, candidate.fields.amount);
    }

    #[test]
    fn oversized_amounts_are_dropped() {
        for json in [
            r#"{"amount": "9999999999999999999999999999k"}"#,
            r#"{"amount": "9999999999999999999999999999억원"}"#,
            r#"{"amount": "12345678901234567"}"#,
        ] {
            let candidate = parse_one(json);
            assert_eq!(None, candidate.fields.amount, "{json}");
            assert_eq!("amount", candidate.issues[0].field, "{json}");
        }
    }

    #[test]
    fn unknown_enum_values_become_unknown() {
        let candidate = parse_one(r#"{"type": "transfer", "currency": "EUR"}"#);
        assert_eq!(TransactionType::Unknown, candidate.fields.ty);
        assert_eq!(Currency::Unknown, candidate.fields.currency);
        assert_eq!(2, candidate.issues.len());
    }

    #[test]
    fn relative_dates_are_resolved() {
        let candidate = parse_one(r#"{"date": "어제"}"#);
        assert_eq!(NaiveDate::from_ymd_opt(2024, 5, 9), candidate.fields.date);

        let candidate = parse_one(r#"{"date": "언젠가"}"#);
        assert_eq!(None, candidate.fields.date);
        assert_eq!("date", candidate.issues[0].field);
    }

    #[test]
    fn non_string_list_entries_are_dropped() {
        let candidate = parse_one(
            r#"{"factors": {"keywords": ["커피", 3, null, " ", "라떼"], "participants": "민수, 지영"}}"#,
        );
        assert_eq!(vec!["커피", "라떼"], candidate.fields.factors.keywords);
        assert_eq!(vec!["민수", "지영"], candidate.fields.factors.participants);
        assert_eq!(2, candidate.issues.len());
    }

    #[test]
    fn fenced_json_is_accepted() {
        let candidates = parse_candidates("```json\n[{\"type\": \"expense\"}]\n```", today()).unwrap();
        assert_eq!(1, candidates.len());
    }

    #[test]
    fn malformed_payloads() {
        for payload in ["not json", "42", r#""text""#, r#"[{"type": "expense"}, 3]"#] {
            assert!(
                matches!(
                    parse_candidates(payload, today()),
                    Err(ExtractError::MalformedPayload(_))
                ),
                "{payload}"
            );
        }
    }
}
