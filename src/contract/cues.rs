//! Vocabularies shared by the classifier instructions and the offline rule classifier.

use crate::db::{Currency, TransactionType};

pub const EXPENSE_CUES: &[&str] = &[
    "샀", "사다", "구매", "구입", "결제", "계산", "지출", "썼", "쓴", "먹었", "마셨", "탔", "빌렸",
    "냈", "충전",
];

pub const INCOME_CUES: &[&str] = &[
    "받았", "입금", "벌었", "월급", "급여", "용돈", "환불", "팔았", "수입", "들어왔",
];

pub const CATEGORIES: &[&str] = &[
    "식비",
    "카페",
    "교통",
    "쇼핑",
    "의료",
    "문화/여가",
    "통신",
    "구독",
    "월급",
    "용돈",
    "환불",
    "기타",
];
pub const FALLBACK_CATEGORY: &str = "기타";

/// Checked in order, so more specific categories come first.
const CATEGORY_CUES: &[(&str, &[&str])] = &[
    ("환불", &["환불"]),
    ("월급", &["월급", "급여", "보너스", "상여금"]),
    ("용돈", &["용돈"]),
    (
        "카페",
        &[
            "카페", "커피", "라떼", "아메리카노", "스타벅스", "이디야", "투썸", "메가커피",
            "빽다방", "디저트", "케이크",
        ],
    ),
    (
        "식비",
        &[
            "점심", "저녁", "아침", "식사", "밥", "김치찌개", "치킨", "피자", "배달", "라면",
            "떡볶이", "고기", "식당", "편의점", "맥도날드", "버거킹", "배민",
        ],
    ),
    (
        "교통",
        &["택시", "버스", "지하철", "기차", "KTX", "주유", "기름값", "교통비", "택시비"],
    ),
    ("구독", &["구독", "넷플릭스", "유튜브 프리미엄", "멜론", "스포티파이"]),
    ("통신", &["통신비", "핸드폰", "휴대폰", "요금제", "인터넷"]),
    ("의료", &["병원", "약국", "진료", "치과", "한의원"]),
    (
        "문화/여가",
        &["영화", "공연", "콘서트", "책", "게임", "여행", "노래방", "전시", "헬스"],
    ),
    (
        "쇼핑",
        &["옷", "신발", "쿠팡", "다이소", "올리브영", "이마트", "마트", "쇼핑", "무신사"],
    ),
];

pub const UNSPECIFIED_PAYMENT: &str = "미상";

pub const PAYMENT_METHODS: &[&str] = &[
    "카드",
    "현금",
    "계좌이체",
    "카카오페이",
    "네이버페이",
    "토스페이",
    "삼성페이",
    UNSPECIFIED_PAYMENT,
];

/// E-wallets before the generic `카드`, so `삼성페이 카드` reads as the wallet.
const PAYMENT_CUES: &[(&str, &[&str])] = &[
    ("카카오페이", &["카카오페이", "카카오 페이"]),
    ("네이버페이", &["네이버페이", "네이버 페이", "N페이"]),
    ("토스페이", &["토스페이", "토스로"]),
    ("삼성페이", &["삼성페이"]),
    ("계좌이체", &["계좌이체", "이체", "송금"]),
    ("카드", &["카드"]),
    ("현금", &["현금"]),
];

const MERCHANTS: &[&str] = &[
    "스타벅스",
    "이디야",
    "투썸플레이스",
    "투썸",
    "메가커피",
    "빽다방",
    "맥도날드",
    "버거킹",
    "쿠팡",
    "배달의민족",
    "배민",
    "요기요",
    "올리브영",
    "다이소",
    "이마트",
    "홈플러스",
    "GS25",
    "세븐일레븐",
    "넷플릭스",
    "카카오택시",
    "무신사",
];

const PARTICIPANT_SUFFIXES: &[&str] = &["이랑", "랑"];

pub fn transaction_type(text: &str) -> TransactionType {
    let expense = contains_any(text, EXPENSE_CUES);
    let income = contains_any(text, INCOME_CUES);
    match (expense, income) {
        (true, false) => TransactionType::Expense,
        (false, true) => TransactionType::Income,
        _ => TransactionType::Unknown,
    }
}

pub fn category(text: &str) -> &'static str {
    CATEGORY_CUES
        .iter()
        .find(|(_, cues)| contains_any(text, cues))
        .map(|(category, _)| *category)
        .unwrap_or(FALLBACK_CATEGORY)
}

pub fn is_known_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

/// Category cues mentioned in the text, in the order they appear.
pub fn keywords(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = CATEGORY_CUES
        .iter()
        .flat_map(|(_, cues)| cues.iter())
        .filter_map(|cue| text.find(cue).map(|pos| (pos, *cue)))
        .collect();
    // Longer cues first at the same position, then drop cues contained in an earlier one
    found.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0).then(rhs.1.len().cmp(&lhs.1.len())));
    let mut keywords: Vec<String> = vec![];
    let mut covered_until = 0;
    for (pos, cue) in found {
        if pos < covered_until {
            continue;
        }
        covered_until = pos + cue.len();
        if !keywords.iter().any(|keyword| keyword == cue) {
            keywords.push(cue.to_string());
        }
    }
    keywords
}

pub fn payment_method(text: &str) -> &'static str {
    PAYMENT_CUES
        .iter()
        .find(|(_, cues)| contains_any(text, cues))
        .map(|(method, _)| *method)
        .unwrap_or(UNSPECIFIED_PAYMENT)
}

/// The brand mentioned first. Unnamed vendors yield an empty string.
pub fn merchant(text: &str) -> String {
    MERCHANTS
        .iter()
        .filter_map(|name| text.find(name).map(|pos| (pos, *name)))
        .min_by(|lhs, rhs| lhs.0.cmp(&rhs.0).then(rhs.1.len().cmp(&lhs.1.len())))
        .map(|(_, name)| name.to_string())
        .unwrap_or_default()
}

/// People named with a companion particle, e.g. `민수랑`, `지영이랑`.
pub fn participants(text: &str) -> Vec<String> {
    let mut participants: Vec<String> = vec![];
    for word in text.split_whitespace() {
        let Some(name) = PARTICIPANT_SUFFIXES
            .iter()
            .find_map(|suffix| word.strip_suffix(suffix))
        else {
            continue;
        };
        if !name.is_empty() && !participants.iter().any(|known| known == name) {
            participants.push(name.to_string());
        }
    }
    participants
}

pub fn currency(text: &str, has_amount: bool) -> Currency {
    if contains_any(text, &["달러", "$", "USD", "usd"]) {
        Currency::Usd
    } else if has_amount || contains_any(text, &["원", "₩", "KRW"]) {
        Currency::Krw
    } else {
        Currency::Unknown
    }
}

fn contains_any(text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| text.contains(cue))
}
