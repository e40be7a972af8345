//! Rebuilds a single address line and a postcode from the label-8 range.

use once_cell::sync::Lazy;
use regex::Regex;

static POSTCODE_COMPACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}\d[A-Z\d]?\d[A-Z]{2}$").expect("static regex")
});

/// Date stamps such as "NOV31" bleeding in from the expiry field.
static MONTH_STAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)\s?\d{2}$")
        .expect("static regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").expect("static regex"));
static PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([A-Za-z0-9])").expect("static regex"));
static DIGIT_LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)([A-Za-z])").expect("static regex"));
static LETTER_DIGIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z])(\d)").expect("static regex"));

const STREET_SUFFIXES: &[&str] = &[
    "AVENUE", "CLOSE", "COURT", "CRESCENT", "DRIVE", "GARDENS", "GROVE", "LANE", "PLACE",
    "ROAD", "SQUARE", "STREET", "TERRACE",
];

/// Letters that must precede a suffix before it is split off ("BROAD" stays whole).
const MIN_SUFFIX_PREFIX: usize = 3;

/// Real words and place names that end in a street suffix.
const WHOLE_WORDS: &[&str] = &["ALDERGROVE", "HARCOURT", "HAZELGROVE"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub line: Option<String>,
    pub postcode: Option<String>,
}

/// Assemble the address from the label-8 range.
pub fn assemble<S: AsRef<str>>(lines: &[S]) -> Address {
    let mut postcode = None;
    let mut parts = Vec::new();

    for raw in lines {
        let line = collapse_whitespace(raw.as_ref());
        if line.is_empty() || is_noise_line(&line) {
            continue;
        }
        let body = if postcode.is_none() {
            match take_postcode(&line) {
                Some((found, rest)) => {
                    postcode = Some(found);
                    rest
                }
                None => line,
            }
        } else {
            line
        };
        let cleaned = clean_segment(&body);
        if !cleaned.is_empty() {
            parts.push(cleaned);
        }
    }

    let joined = parts.join(", ");
    Address {
        line: (!joined.is_empty()).then_some(joined),
        postcode,
    }
}

/// Format a compact postcode as `OUTWARD INWARD`.
pub fn format_postcode(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if compact.len() <= 3 {
        return compact;
    }
    let (outward, inward) = compact.split_at(compact.len() - 3);
    format!("{} {}", outward, inward)
}

fn is_noise_line(line: &str) -> bool {
    let mut chars = line.chars();
    let single_letter = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic());
    single_letter || MONTH_STAMP_RE.is_match(line)
}

/// Pull a postcode out of `line`: the whole line compacted, a single word, or
/// two adjacent words ("BT51 3TB"). Returns the formatted postcode and the
/// remaining text.
fn take_postcode(line: &str) -> Option<(String, String)> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if is_compact_postcode(&compact) {
        return Some((format_postcode(&compact), String::new()));
    }

    let words: Vec<&str> = line.split(' ').collect();
    let trimmed: Vec<&str> = words
        .iter()
        .map(|w| w.trim_matches(|c: char| c == ',' || c == '.'))
        .collect();
    for i in 0..words.len() {
        let span = if is_compact_postcode(trimmed[i]) {
            Some((i, i + 1, trimmed[i].to_string()))
        } else if i + 1 < words.len() {
            let pair = format!("{}{}", trimmed[i], trimmed[i + 1]);
            is_compact_postcode(&pair).then(|| (i, i + 2, pair))
        } else {
            None
        };
        if let Some((start, end, found)) = span {
            let rest = words[..start]
                .iter()
                .chain(words[end..].iter())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            let rest = rest.trim().trim_end_matches(',').trim().to_string();
            return Some((format_postcode(&found), rest));
        }
    }
    None
}

fn is_compact_postcode(token: &str) -> bool {
    POSTCODE_COMPACT_RE.is_match(token)
}

fn clean_segment(text: &str) -> String {
    let text = COMMA_RE.replace_all(text, ", ");
    let text = PERIOD_RE.replace_all(&text, ". $1");
    let text = DIGIT_LETTER_RE.replace_all(&text, "$1 $2");
    let text = LETTER_DIGIT_RE.replace_all(&text, "$1 $2");
    let words: Vec<String> = collapse_whitespace(&text)
        .split(' ')
        .map(split_street_suffix)
        .collect();
    words
        .join(" ")
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

/// "CASTLEROCKROAD" -> "CASTLEROCK ROAD"; punctuation after the word is kept.
fn split_street_suffix(word: &str) -> String {
    let core_len = word.trim_end_matches(|c: char| !c.is_alphanumeric()).len();
    let (core, tail) = word.split_at(core_len);
    if !core.chars().all(|c| c.is_ascii_alphabetic()) {
        return word.to_string();
    }
    let upper = core.to_ascii_uppercase();
    if WHOLE_WORDS.contains(&upper.as_str()) {
        return word.to_string();
    }
    for suffix in STREET_SUFFIXES {
        if upper.len() >= suffix.len() + MIN_SUFFIX_PREFIX && upper.ends_with(suffix) {
            let split = core.len() - suffix.len();
            return format!("{} {}{}", &core[..split], &core[split..], tail);
        }
    }
    word.to_string()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}
