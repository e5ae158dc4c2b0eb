use chrono::NaiveDate;

use super::cues::{CATEGORIES, EXPENSE_CUES, INCOME_CUES, PAYMENT_METHODS, UNSPECIFIED_PAYMENT};

const SCHEMA: &str = r#"[
  {
    "type": "income" | "expense" | "unknown",
    "amount": number | null,
    "currency": "KRW" | "USD" | "UNKNOWN",
    "category": string,
    "merchant": string,
    "date": "YYYY-MM-DD" | null,
    "memo": string,
    "confidence": number,
    "factors": {
      "keywords": string[],
      "payment_method": string,
      "participants": string[]
    }
  }
]"#;

/// Instructions sent along with every sentence. `today` anchors relative date words.
pub fn system_prompt(today: NaiveDate) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "너는 한국어 가계부 분류기다. 사용자의 자유문장을 분석해서 반드시 JSON 배열만 출력해라.\n",
    );
    prompt.push_str(&format!("오늘 날짜: {}\n", today.format("%Y-%m-%d")));
    prompt.push_str("스키마:\n");
    prompt.push_str(SCHEMA);
    prompt.push_str("\n규칙:\n");
    for rule in rules() {
        prompt.push_str("- ");
        prompt.push_str(&rule);
        prompt.push('\n');
    }
    prompt
}

fn rules() -> Vec<String> {
    vec![
        "JSON 외 텍스트 금지".to_string(),
        "거래가 여러 개면 거래마다 객체 하나씩, 순서대로 배열에 넣는다. 거래가 없으면 빈 배열".to_string(),
        "확실하지 않으면 unknown/null 사용".to_string(),
        format!(
            "type: 지출 표현({})이면 expense, 수입 표현({})이면 income, 애매하면 unknown",
            EXPENSE_CUES.join(", "),
            INCOME_CUES.join(", ")
        ),
        "amount: 한글 숫자와 단위를 정수로 바꾼다 (만오천 → 15000, 2만5천 → 25000, 3만원 → 30000, 1,500 → 1500, 3.5k → 3500, 15K → 15000, 20,000+5,000 → 25000). 금액이 없으면 null, 추측 금지".to_string(),
        "date: 오늘/어제/그제/이번주 월요일 같은 상대 날짜는 오늘 날짜 기준 YYYY-MM-DD로 바꾼다. 날짜 언급이 없으면 null. 뒤 거래에 날짜가 없으면 앞 거래 날짜를 따른다".to_string(),
        format!("category: 다음 중 하나 ({})", CATEGORIES.join(", ")),
        "merchant: 상호명이 명시된 경우에만, 없으면 빈 문자열. 지어내지 말 것".to_string(),
        "memo: 핵심 내용을 15자 이내로 요약 (원문 그대로 복사 금지)".to_string(),
        "confidence는 0~1. type과 amount가 모두 확실하면 0.9 이상".to_string(),
        format!(
            "factors.payment_method: 다음 중 하나 ({}), 언급이 없으면 {}",
            PAYMENT_METHODS.join(", "),
            UNSPECIFIED_PAYMENT
        ),
    ]
}
