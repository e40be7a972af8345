//! Licence field extraction from line-by-line OCR output.
//!
//! [`parse`] is total: missing or unreadable data yields absent fields, never an error.

pub mod address;
pub mod categories;
pub mod dates;
pub mod labels;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::ocr::OcrLine;
use crate::schema::LicenseFields;
use dates::DateKind;
use labels::{is_label_line, Label, LabelIndex};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Extract structured licence fields from OCR lines.
pub fn parse(lines: &[OcrLine]) -> LicenseFields {
    let normalized: Vec<String> = lines
        .iter()
        .map(|line| normalize(&line.text))
        .filter(|line| !line.is_empty())
        .collect();

    if normalized.is_empty() {
        return LicenseFields::default();
    }

    let index = LabelIndex::build(&normalized);

    let last_name = join_words(&index.range(Label::Surname)).or_else(|| fallback_surname(&index));
    let first_name = given_names(&index.range(Label::GivenNames));
    let date_of_birth = dates::find_first_date(&index.range(Label::BirthDate), DateKind::Birth)
        .or_else(|| infer_birth_date(&index));
    let expiry_date = dates::find_first_date(&index.range(Label::ExpiryDate), DateKind::Expiry);
    let licence_number = licence_number(&index);
    let address = address::assemble(&index.range(Label::Address));
    let categories = categories::parse_lines(&index.range(Label::Categories));

    let fields = LicenseFields {
        first_name: sanitize(first_name),
        last_name: sanitize(last_name),
        date_of_birth: sanitize(date_of_birth),
        address_line: sanitize(address.line),
        postcode: sanitize(address.postcode),
        licence_number: sanitize(licence_number),
        expiry_date: sanitize(expiry_date),
        categories,
    };

    debug!(
        "Parsed {} lines: {} required fields missing, {} categories",
        normalized.len(),
        fields.missing_required().len(),
        fields.categories.len()
    );
    fields
}

fn normalize(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

fn join_words(parts: &[&str]) -> Option<String> {
    let joined = normalize(&parts.join(" "));
    (!joined.is_empty()).then_some(joined)
}

fn is_bare_numeric(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    !compact.is_empty() && compact.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
}

fn is_name_noise(line: &str) -> bool {
    line.chars().count() == 1 || is_bare_numeric(line)
}

/// OCR often drops the "1" marker; the surname is then the nearest usable
/// line above the label-2 marker.
fn fallback_surname(index: &LabelIndex<'_>) -> Option<String> {
    let given = index.get(Label::GivenNames)?;
    index.lines()[..given.index]
        .iter()
        .rev()
        .map(String::as_str)
        .find(|line| {
            !line.is_empty()
                && !is_label_line(line)
                && !dates::contains_date(line)
                && !is_bare_numeric(line)
        })
        .map(str::to_string)
}

/// Given names stop at the first date (the birth date often follows on the
/// same or next line); single characters and bare numbers are dropped.
fn given_names(range: &[&str]) -> Option<String> {
    let mut parts = Vec::new();
    for &line in range {
        match dates::first_date_start(line) {
            Some(start) => {
                let head = line[..start].trim();
                if !head.is_empty() && !is_name_noise(head) {
                    parts.push(head);
                }
                break;
            }
            None if is_name_noise(line) => continue,
            None => parts.push(line),
        }
    }
    join_words(&parts)
}

/// With no label 3 at all, look between label 2 and the nearer of 4a/4b. Only
/// an unambiguous single date counts.
fn infer_birth_date(index: &LabelIndex<'_>) -> Option<String> {
    if index.get(Label::BirthDate).is_some() {
        return None;
    }
    let start = index.get(Label::GivenNames)?.index;
    let end = [Label::IssueDate, Label::ExpiryDate]
        .into_iter()
        .filter_map(|label| index.get(label))
        .map(|m| m.index)
        .filter(|&i| i > start)
        .min()
        .unwrap_or_else(|| index.next_label_index_after(start));

    let window = &index.lines()[start..end];
    let found = dates::all_dates(window, DateKind::Birth);
    match found.as_slice() {
        [single] => Some(single.clone()),
        _ => {
            debug!("Birth date inference skipped: {} candidate dates", found.len());
            None
        }
    }
}

/// Label 5's inline value wins; otherwise the longest token in its range.
fn licence_number(index: &LabelIndex<'_>) -> Option<String> {
    let inline: String = index
        .get(Label::LicenceNumber)
        .map(|m| {
            m.value
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_uppercase()
        })
        .unwrap_or_default();
    if !inline.is_empty() {
        return Some(inline);
    }

    let mut longest: Option<&str> = None;
    for line in index.range(Label::LicenceNumber) {
        for token in line.split(|c: char| !c.is_alphanumeric()) {
            if token.len() > longest.map_or(0, str::len) {
                longest = Some(token);
            }
        }
    }
    longest.map(str::to_uppercase)
}

/// Keep letters, digits, comma, period and space; blank results become absent.
fn sanitize(value: Option<String>) -> Option<String> {
    let value = value?;
    let kept: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ',' | '.' | ' '))
        .collect();
    let kept = normalize(&kept);
    (!kept.is_empty()).then_some(kept)
}
