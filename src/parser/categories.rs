//! Licence category codes (field 9).

const EU_CODES: &[&str] = &[
    "AM", "A1", "A2", "A", "B1", "B", "BE", "C1", "C1E", "C", "CE", "D1", "D1E", "D", "DE", "G",
    "H", "M",
];

/// National extension codes, stored lowercase.
const NATIONAL_CODES: &[&str] = &["f", "k", "l", "n", "p", "q"];

/// Parse categories from a label range. When several lines are present and
/// some contain `/`, only those lines are read.
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let slashed: Vec<&str> = lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| l.contains('/'))
        .collect();
    let source: Vec<&str> = if lines.len() > 1 && !slashed.is_empty() {
        slashed
    } else {
        lines.iter().map(|l| l.as_ref()).collect()
    };
    parse(&source.join("/"))
}

/// Parse categories from free text, deduplicated in first-seen order.
pub fn parse(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '/')
        .collect();

    let mut categories: Vec<String> = Vec::new();
    for token in cleaned.split('/').filter(|t| !t.is_empty()) {
        for code in expand_token(token) {
            if let Some(code) = recognize(code) {
                if !categories.contains(&code) {
                    categories.push(code);
                }
            }
        }
    }
    categories
}

/// OCR misreads seen on the category strip.
fn expand_token(token: &str) -> Vec<&str> {
    match token {
        t if t.eq_ignore_ascii_case("AMA") => vec!["AM", "A"],
        "E" => vec!["B"],
        "1" | "I" => vec!["l"],
        t => vec![t],
    }
}

fn recognize(token: &str) -> Option<String> {
    let upper = token.to_ascii_uppercase();
    if EU_CODES.contains(&upper.as_str()) {
        return Some(upper);
    }
    let lower = token.to_ascii_lowercase();
    NATIONAL_CODES.contains(&lower.as_str()).then_some(lower)
}
