use chrono::{Datelike, Days, NaiveDate};

const DAY_WORDS: [(&str, i64); 7] = [
    ("엊그제", -2),
    ("그저께", -2),
    ("그제", -2),
    ("어제", -1),
    ("오늘", 0),
    ("내일", 1),
    ("모레", 2),
];

const COUNTED_DAYS_AGO: [(&str, u64); 4] = [("하루", 1), ("이틀", 2), ("사흘", 3), ("나흘", 4)];

const WEEKDAYS: [(&str, u64); 7] = [
    ("월요일", 0),
    ("화요일", 1),
    ("수요일", 2),
    ("목요일", 3),
    ("금요일", 4),
    ("토요일", 5),
    ("일요일", 6),
];

/// Resolves the date a sentence talks about, relative to `today`.
///
/// Absolute dates win over relative ones. Returns `None` if the text has no date cue.
pub fn resolve_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let chars: Vec<char> = text.chars().collect();
    iso_date(&chars)
        .or_else(|| month_day(&chars, today))
        .or_else(|| days_ago(&chars, today))
        .or_else(|| counted_days_ago(text, today))
        .or_else(|| weekday(text, today))
        .or_else(|| day_word(text, today))
}

fn iso_date(chars: &[char]) -> Option<NaiveDate> {
    chars.windows(10).find_map(|window| {
        let looks_like_date = window.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == '-',
            _ => c.is_ascii_digit(),
        });
        if !looks_like_date {
            return None;
        }
        let candidate: String = window.iter().collect();
        NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").ok()
    })
}

/// `5월 3일` in the year of `today`.
fn month_day(chars: &[char], today: NaiveDate) -> Option<NaiveDate> {
    positions(chars, '월').find_map(|month_end| {
        let month = number_before(chars, month_end)?;
        let day_start = skip_spaces(chars, month_end + 1);
        let (day, day_end) = number_at(chars, day_start)?;
        if chars.get(day_end) != Some(&'일') {
            return None;
        }
        NaiveDate::from_ymd_opt(today.year(), month, day)
    })
}

/// `3일 전`, `3일전`
fn days_ago(chars: &[char], today: NaiveDate) -> Option<NaiveDate> {
    positions(chars, '일').find_map(|day_end| {
        let days = number_before(chars, day_end)?;
        let after = skip_spaces(chars, day_end + 1);
        if chars.get(after) != Some(&'전') {
            return None;
        }
        today.checked_sub_days(Days::new(days.into()))
    })
}

fn counted_days_ago(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    COUNTED_DAYS_AGO.iter().find_map(|(word, days)| {
        let pos = text.find(word)?;
        let rest = text[pos + word.len()..].trim_start();
        if rest.starts_with('전') {
            today.checked_sub_days(Days::new(*days))
        } else {
            None
        }
    })
}

/// A bare weekday means the one in the current week (Monday to Sunday).
fn weekday(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    WEEKDAYS.iter().find_map(|(word, offset)| {
        let pos = text.find(word)?;
        let before = text[..pos].trim_end();
        let monday = today.checked_sub_days(Days::new(
            today.weekday().num_days_from_monday().into(),
        ))?;
        let day = monday.checked_add_days(Days::new(*offset))?;
        if before.ends_with("지난주") || before.ends_with("저번주") || before.ends_with("지난")
        {
            day.checked_sub_days(Days::new(7))
        } else if before.ends_with("다음주") || before.ends_with("다음") {
            day.checked_add_days(Days::new(7))
        } else {
            Some(day)
        }
    })
}

fn day_word(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    DAY_WORDS.iter().find_map(|(word, offset)| {
        if !text.contains(word) {
            return None;
        }
        if *offset < 0 {
            today.checked_sub_days(Days::new(offset.unsigned_abs()))
        } else {
            today.checked_add_days(Days::new(offset.unsigned_abs()))
        }
    })
}

fn positions(chars: &[char], needle: char) -> impl Iterator<Item = usize> + '_ {
    chars
        .iter()
        .enumerate()
        .filter(move |(_, c)| **c == needle)
        .map(|(i, _)| i)
}

fn number_before(chars: &[char], end: usize) -> Option<u32> {
    let start = (0..end)
        .rev()
        .take_while(|&i| chars[i].is_ascii_digit())
        .last()?;
    chars[start..end].iter().collect::<String>().parse().ok()
}

fn number_at(chars: &[char], start: usize) -> Option<(u32, usize)> {
    let end = (start..chars.len())
        .take_while(|&i| chars[i].is_ascii_digit())
        .last()?
        + 1;
    let number = chars[start..end].iter().collect::<String>().parse().ok()?;
    Some((number, end))
}

fn skip_spaces(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2024-05-10 is a Friday
    fn anchor() -> NaiveDate {
        ymd(2024, 5, 10)
    }

    #[rstest]
    #[case("오늘 점심", ymd(2024, 5, 10))]
    #[case("어제 택시 탔어", ymd(2024, 5, 9))]
    #[case("그제 저녁", ymd(2024, 5, 8))]
    #[case("그저께 영화", ymd(2024, 5, 8))]
    #[case("엊그제 병원", ymd(2024, 5, 8))]
    #[case("내일 낼 돈", ymd(2024, 5, 11))]
    #[case("모레", ymd(2024, 5, 12))]
    #[case("3일 전에 밥", ymd(2024, 5, 7))]
    #[case("10일전", ymd(2024, 4, 30))]
    #[case("이틀 전 커피", ymd(2024, 5, 8))]
    #[case("사흘전", ymd(2024, 5, 7))]
    #[case("5월 3일에 택시", ymd(2024, 5, 3))]
    #[case("1월1일", ymd(2024, 1, 1))]
    #[case("2023-12-24 선물", ymd(2023, 12, 24))]
    #[case("월요일에 점심", ymd(2024, 5, 6))]
    #[case("이번주 일요일", ymd(2024, 5, 12))]
    #[case("지난주 금요일", ymd(2024, 5, 3))]
    #[case("다음주 화요일", ymd(2024, 5, 14))]
    fn resolves(#[case] text: &str, #[case] expected: NaiveDate) {
        assert_eq!(Some(expected), resolve_date(text, anchor()));
    }

    #[rstest]
    #[case("")]
    #[case("커피 5000원")]
    #[case("13월 40일")]
    #[case("월급 들어왔어")]
    fn no_date(#[case] text: &str) {
        assert_eq!(None, resolve_date(text, anchor()));
    }

    #[test]
    fn absolute_date_wins_over_relative() {
        assert_eq!(
            Some(ymd(2024, 4, 1)),
            resolve_date("어제 말고 4월 1일", anchor())
        );
    }
}
