use chrono::NaiveDate;

use super::{amount::extract_amount, cues, date::resolve_date};
use crate::db::{Factors, TransactionFields, TransactionType};

const MEMO_MAX_CHARS: usize = 15;

const CONJUNCTIONS: &[&str] = &["그리고 ", "그 다음 ", "그다음 "];

/// Extracts transactions from a sentence using the contract's cue vocabularies only.
///
/// The text is split into clauses. Every clause with an amount starts a new event; clauses
/// without one are folded into the previous event, or into the next one if no event started
/// yet. An event without a date cue takes the date of the event before it.
pub fn extract(text: &str, today: NaiveDate) -> Vec<TransactionFields> {
    let mut events: Vec<String> = vec![];
    let mut pending = String::new();
    for clause in clauses(text) {
        if extract_amount(&clause).is_some() {
            events.push(join(&pending, &clause));
            pending.clear();
        } else if let (Some(last), true) = (events.last_mut(), pending.is_empty()) {
            last.push(' ');
            last.push_str(&clause);
        } else {
            pending = join(&pending, &clause);
        }
    }
    if !pending.is_empty() && cues::transaction_type(&pending) != TransactionType::Unknown {
        events.push(pending);
    }

    let mut previous_date = None;
    events
        .iter()
        .map(|event| {
            let fields = fields_of(event, today, previous_date);
            previous_date = fields.date;
            fields
        })
        .collect()
}

fn fields_of(event: &str, today: NaiveDate, inherited_date: Option<NaiveDate>) -> TransactionFields {
    let ty = cues::transaction_type(event);
    let amount = extract_amount(event);
    let category = cues::category(event);
    let keywords = cues::keywords(event);
    TransactionFields {
        ty,
        amount,
        currency: cues::currency(event, amount.is_some()),
        category: category.to_string(),
        merchant: cues::merchant(event),
        date: resolve_date(event, today).or(inherited_date),
        memo: memo(&keywords, category),
        confidence: Some(confidence(ty, amount.is_some())),
        factors: Factors {
            keywords,
            payment_method: cues::payment_method(event).to_string(),
            participants: cues::participants(event),
        },
    }
}

fn confidence(ty: TransactionType, has_amount: bool) -> f64 {
    match (ty != TransactionType::Unknown, has_amount) {
        (true, true) => 0.95,
        (true, false) | (false, true) => 0.6,
        (false, false) => 0.3,
    }
}

fn memo(keywords: &[String], category: &str) -> String {
    let memo = if keywords.is_empty() {
        category.to_string()
    } else {
        keywords.join(" ")
    };
    memo.chars().take(MEMO_MAX_CHARS).collect()
}

fn join(lhs: &str, rhs: &str) -> String {
    if lhs.is_empty() {
        rhs.to_string()
    } else {
        format!("{lhs} {rhs}")
    }
}

/// Splits on sentence punctuation, conjunctions, and past-tense verbs joined with `고`
/// (`먹었고 카페에서 ...`). Commas and points between digits belong to a number.
fn clauses(text: &str) -> Vec<String> {
    let mut marked = text.to_string();
    for conjunction in CONJUNCTIONS {
        marked = marked.replace(conjunction, "\n");
    }

    let chars: Vec<char> = marked.chars().collect();
    let mut clauses = vec![];
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let previous = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let between_digits = previous.is_some_and(|p| p.is_ascii_digit())
            && next.is_some_and(|n| n.is_ascii_digit());
        let separator = matches!(c, '\n' | ';' | '!' | '?')
            || (matches!(c, ',' | '.') && !between_digits);
        if separator {
            push_clause(&mut clauses, &current);
            current.clear();
            continue;
        }
        current.push(c);
        let ends_past_tense_clause = c == '고'
            && previous.is_some_and(has_past_tense_final)
            && next.map_or(true, char::is_whitespace);
        if ends_past_tense_clause {
            push_clause(&mut clauses, &current);
            current.clear();
        }
    }
    push_clause(&mut clauses, &current);
    clauses
}

/// Whether a Hangul syllable ends in ㅆ, as in 었, 았, 했, 냈, 샀.
fn has_past_tense_final(c: char) -> bool {
    const FIRST_SYLLABLE: u32 = 0xAC00;
    const LAST_SYLLABLE: u32 = 0xD7A3;
    const FINAL_CONSONANTS: u32 = 28;
    const SSANG_SIOT: u32 = 20;
    let code = c as u32;
    (FIRST_SYLLABLE..=LAST_SYLLABLE).contains(&code)
        && (code - FIRST_SYLLABLE) % FINAL_CONSONANTS == SSANG_SIOT
}

fn push_clause(clauses: &mut Vec<String>, clause: &str) {
    let clause = clause.trim();
    if !clause.is_empty() {
        clauses.push(clause.to_string());
    }
}
