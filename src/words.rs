//! Written-form grades for report cards: integers 0..=100 in Arabic words.

const UNITS: [&str; 10] = [
    "واحد", "اثنان", "ثلاثة", "اربعة", "خمسة", "ستة", "سبعة", "ثمانية", "تسعة", "عشرة",
];

const TEENS: [&str; 9] = [
    "احد عشر",
    "اثنا عشر",
    "ثلاثة عشر",
    "اربعة عشر",
    "خمسة عشر",
    "ستة عشر",
    "سبعة عشر",
    "ثمانية عشر",
    "تسعة عشر",
];

const TENS: [&str; 8] = [
    "عشرون", "ثلاثون", "اربعون", "خمسون", "ستون", "سبعون", "ثمانون", "تسعون",
];

/// Empty string for null or anything outside 0..=100.
pub fn to_arabic_words(n: Option<i64>) -> String {
    let Some(n) = n else {
        return String::new();
    };
    match n {
        0 => "صفر".to_string(),
        1..=10 => UNITS[(n - 1) as usize].to_string(),
        11..=19 => TEENS[(n - 11) as usize].to_string(),
        20..=99 => {
            let tens = TENS[(n / 10 - 2) as usize];
            match n % 10 {
                0 => tens.to_string(),
                unit => format!("{} و {}", UNITS[(unit - 1) as usize], tens),
            }
        }
        100 => "مئة".to_string(),
        _ => String::new(),
    }
}

pub fn words_for_grade(grade: Option<i32>) -> String {
    to_arabic_words(grade.map(i64::from))
}

/// Same rules over a JSON value; numbers with a fractional part are rejected.
pub fn words_for_value(v: &serde_json::Value) -> String {
    let n = match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= 1000.0)
                .map(|f| f as i64)
        }),
        _ => None,
    };
    to_arabic_words(n)
}
