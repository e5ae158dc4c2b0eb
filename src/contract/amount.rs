use rust_decimal::Decimal;
use std::str::FromStr;

const HANGUL_DIGITS: [(char, i64); 9] = [
    ('일', 1),
    ('이', 2),
    ('삼', 3),
    ('사', 4),
    ('오', 5),
    ('육', 6),
    ('칠', 7),
    ('팔', 8),
    ('구', 9),
];
const SMALL_UNITS: [(char, i64); 3] = [('십', 10), ('백', 100), ('천', 1_000)];
const BIG_UNITS: [(char, i64); 2] = [('만', 10_000), ('억', 100_000_000)];

/// A number directly followed by one of these counts days, people, items, ... but not money.
const COUNTER_SUFFIXES: &[char] = &[
    '월', '일', '시', '분', '초', '년', '명', '개', '살', '번', '층', '호', '인', '주', '차', '박',
    '%', '-', '/', ':',
];
/// A number directly preceded by one of these is part of a date, time or identifier.
const NON_AMOUNT_PREFIXES: &[char] = &['-', '/', ':'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Value(Decimal),
    SmallUnit(Decimal),
    BigUnit(Decimal),
}

#[derive(Debug)]
struct Term {
    tokens: Vec<Token>,
    start: usize,
    end: usize,
}

/// Finds the money amount mentioned in a free-form sentence.
///
/// Understands Korean numeral words (`만오천`), digits mixed with units (`2만5천`, `3만원`),
/// thousands separators (`1,500`), `k` shorthand (`3.5k`, `15K`) and sums joined with `+`
/// (`20,000+5,000`). Returns `None` if the text has no amount, never a guessed default.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    while pos < chars.len() {
        if !starts_numeral(chars[pos]) {
            pos += 1;
            continue;
        }
        match scan_term(&chars, pos) {
            // An amount too large for a Decimal is no amount, not a smaller one found later
            Some(term) if is_amount(&chars, &term) => return sum_following_terms(&chars, term),
            Some(term) => pos = term.end.max(pos + 1),
            None => pos += 1,
        }
    }
    None
}

fn starts_numeral(c: char) -> bool {
    c.is_ascii_digit()
        || hangul_digit(c).is_some()
        || small_unit(c).is_some()
        || big_unit(c).is_some()
}

fn hangul_digit(c: char) -> Option<Decimal> {
    lookup(&HANGUL_DIGITS, c)
}

fn small_unit(c: char) -> Option<Decimal> {
    lookup(&SMALL_UNITS, c)
}

fn big_unit(c: char) -> Option<Decimal> {
    lookup(&BIG_UNITS, c)
}

fn lookup(table: &[(char, i64)], c: char) -> Option<Decimal> {
    table
        .iter()
        .find(|(key, _)| *key == c)
        .map(|(_, value)| Decimal::from(*value))
}

/// Evaluates the first term and adds every further term joined with `+`. `None` on overflow.
fn sum_following_terms(chars: &[char], first: Term) -> Option<Decimal> {
    let mut sum = evaluate(&first.tokens)?;
    let mut end = first.end;
    loop {
        let mut pos = end;
        if chars.get(pos) == Some(&'원') {
            pos += 1;
        }
        pos = skip_spaces(chars, pos);
        if chars.get(pos) != Some(&'+') {
            return Some(sum);
        }
        pos = skip_spaces(chars, pos + 1);
        if pos >= chars.len() || !starts_numeral(chars[pos]) {
            return Some(sum);
        }
        match scan_term(chars, pos) {
            Some(term) if is_amount(chars, &term) => {
                sum = sum.checked_add(evaluate(&term.tokens)?)?;
                end = term.end;
            }
            _ => return Some(sum),
        }
    }
}

fn skip_spaces(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn scan_term(chars: &[char], start: usize) -> Option<Term> {
    let mut tokens = vec![];
    let mut pos = start;

    // Hangul digits are only numerals at the start of a run or right after a unit,
    // otherwise `3일` would read as "three one".
    let mut digit_allowed = true;
    if chars[start].is_ascii_digit() {
        let (value, next) = scan_digits(chars, start)?;
        tokens.push(Token::Value(value));
        pos = next;
        digit_allowed = false;
        if matches!(chars.get(pos), Some('k' | 'K'))
            && !chars.get(pos + 1).is_some_and(|c| c.is_ascii_alphabetic())
        {
            tokens.push(Token::SmallUnit(Decimal::from(1_000)));
            return Some(Term {
                tokens,
                start,
                end: pos + 1,
            });
        }
    }

    while let Some(&c) = chars.get(pos) {
        if let Some(unit) = small_unit(c) {
            tokens.push(Token::SmallUnit(unit));
            digit_allowed = true;
        } else if let Some(unit) = big_unit(c) {
            tokens.push(Token::BigUnit(unit));
            digit_allowed = true;
        } else if digit_allowed && hangul_digit(c).is_some() {
            tokens.push(Token::Value(hangul_digit(c)?));
            digit_allowed = false;
        } else if digit_allowed && c.is_ascii_digit() {
            let (value, next) = scan_digits(chars, pos)?;
            tokens.push(Token::Value(value));
            digit_allowed = false;
            pos = next;
            continue;
        } else {
            break;
        }
        pos += 1;
    }

    Some(Term {
        tokens,
        start,
        end: pos,
    })
}

/// Digits with optional thousands separators and one decimal point.
fn scan_digits(chars: &[char], start: usize) -> Option<(Decimal, usize)> {
    let mut digits = String::new();
    let mut seen_point = false;
    let mut pos = start;
    while let Some(&c) = chars.get(pos) {
        let next_is_digit = chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit());
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c == ',' && next_is_digit {
            // separator, dropped
        } else if c == '.' && next_is_digit && !seen_point {
            seen_point = true;
            digits.push(c);
        } else {
            break;
        }
        pos += 1;
    }
    let value = Decimal::from_str(&digits).ok()?;
    Some((value, pos))
}

fn is_amount(chars: &[char], term: &Term) -> bool {
    if term.tokens.is_empty() {
        return false;
    }
    let next = chars.get(term.end).copied();
    let previous = term.start.checked_sub(1).map(|pos| chars[pos]);
    let starts_with_digit = chars[term.start].is_ascii_digit();

    if starts_with_digit {
        let ends_with_unit = matches!(
            term.tokens.last(),
            Some(Token::SmallUnit(_) | Token::BigUnit(_))
        );
        let bad_previous = previous
            .is_some_and(|c| NON_AMOUNT_PREFIXES.contains(&c) || c.is_ascii_alphanumeric());
        let bad_next = next.is_some_and(|c| {
            (!ends_with_unit && COUNTER_SUFFIXES.contains(&c)) || c.is_ascii_alphabetic()
        });
        !bad_previous && !bad_next
    } else {
        // Hangul-only runs show up inside ordinary words (오늘, 백화점, 커피만), so they
        // need a 원 right after them or a big unit plus at least one more numeral.
        let followed_by_won = next == Some('원');
        let has_big_unit = term
            .tokens
            .iter()
            .any(|token| matches!(token, Token::BigUnit(_)));
        followed_by_won || (has_big_unit && term.tokens.len() >= 2)
    }
}

/// `None` if two values follow each other or the result does not fit a `Decimal`.
fn evaluate(tokens: &[Token]) -> Option<Decimal> {
    let mut total = Decimal::ZERO;
    let mut section = Decimal::ZERO;
    let mut current: Option<Decimal> = None;
    for token in tokens {
        match *token {
            Token::Value(value) => {
                if current.is_some() {
                    return None;
                }
                current = Some(value);
            }
            Token::SmallUnit(unit) => {
                let value = current.take().unwrap_or(Decimal::ONE).checked_mul(unit)?;
                section = section.checked_add(value)?;
            }
            Token::BigUnit(unit) => {
                let multiplier = section.checked_add(current.take().unwrap_or(Decimal::ZERO))?;
                let multiplier = if multiplier.is_zero() {
                    Decimal::ONE
                } else {
                    multiplier
                };
                total = total.checked_add(multiplier.checked_mul(unit)?)?;
                section = Decimal::ZERO;
            }
        }
    }
    let total = total
        .checked_add(section)?
        .checked_add(current.unwrap_or(Decimal::ZERO))?;
    Some(total.normalize())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("만오천", 15_000)]
    #[case("2만5천", 25_000)]
    #[case("1,500", 1_500)]
    #[case("3.5k", 3_500)]
    #[case("15K", 15_000)]
    #[case("3만원", 30_000)]
    #[case("20,000+5,000", 25_000)]
    #[case("2만 + 5천원", 25_000)]
    #[case("만원", 10_000)]
    #[case("오만원", 50_000)]
    #[case("삼천원", 3_000)]
    #[case("1.5만", 15_000)]
    #[case("5000", 5_000)]
    #[case("1억2천만", 120_000_000)]
    #[case("3만오천원", 35_000)]
    fn standalone_amounts(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(Some(Decimal::from(expected)), extract_amount(input));
    }

    #[rstest]
    #[case("점심 김치찌개 9,500원 카드 결제", 9_500)]
    #[case("오늘 점심으로 만원짜리 김치찌개 먹었고", 10_000)]
    #[case("카페에 가서 커피 5000원짜리 마셨어", 5_000)]
    #[case("엄마한테 용돈 이만원 받았어", 20_000)]
    #[case("5월 3일에 택시비 12,300원", 12_300)]
    #[case("2024-05-10 책 15K", 15_000)]
    #[case("커피만 마셨는데 4천원 나왔어", 4_000)]
    #[case("백화점에서 3만원 썼어", 30_000)]
    fn amounts_in_sentences(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(Some(Decimal::from(expected)), extract_amount(input));
    }

    #[rstest]
    #[case("")]
    #[case("점심 먹었어")]
    #[case("오늘 백화점 갔다")]
    #[case("커피만 마셨어")]
    #[case("5월 3일")]
    #[case("3일 전에 밥 먹음")]
    #[case("2024-05-10")]
    #[case("천천히 걸었다")]
    #[case("10km 달리기")]
    #[case("9999999999999999999999999999억원 송금")]
    #[case("9999999999999999999999999999k")]
    #[case("79228162514264337593543950335+1")]
    #[case("9999999999999999999999999999천만원")]
    fn no_amount(#[case] input: &str) {
        assert_eq!(None, extract_amount(input));
    }

    #[test]
    fn decimal_amounts() {
        assert_eq!(Some(Decimal::new(1250, 2)), extract_amount("12.50 달러"));
    }
}
