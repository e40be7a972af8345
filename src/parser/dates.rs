//! `DD.MM.YY[YY]` date extraction with century resolution.

use chrono::{Datelike, Local};
use once_cell::sync::Lazy;
use regex::Regex;

/// Digit boundaries are checked by hand; the regex crate has no lookaround.
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2})[./-](\d{2})[./-](\d{2,4})").expect("static regex")
});

/// Which century rule applies to two-digit years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    /// Two-digit years pivot on the current year.
    Birth,
    /// Two-digit years are always 20YY.
    Expiry,
}

/// Current two-digit year, used as the birth-date pivot.
pub fn current_pivot() -> u32 {
    (Local::now().year().rem_euclid(100)) as u32
}

/// First date in `text`, formatted `DD.MM.YYYY`.
pub fn parse_date(text: &str, kind: DateKind) -> Option<String> {
    parse_date_with_pivot(text, kind, current_pivot())
}

pub fn parse_date_with_pivot(text: &str, kind: DateKind, pivot: u32) -> Option<String> {
    date_candidates(text)
        .next()
        .and_then(|(day, month, year)| format_date(day, month, year, kind, pivot))
}

/// First line in `lines` that yields a date.
pub fn find_first_date<S: AsRef<str>>(lines: &[S], kind: DateKind) -> Option<String> {
    lines.iter().find_map(|line| parse_date(line.as_ref(), kind))
}

/// Every parseable date across `lines`, in order.
pub fn all_dates<S: AsRef<str>>(lines: &[S], kind: DateKind) -> Vec<String> {
    let pivot = current_pivot();
    lines
        .iter()
        .flat_map(|line| date_candidates(line.as_ref()))
        .filter_map(|(day, month, year)| format_date(day, month, year, kind, pivot))
        .collect()
}

/// True if `text` contains anything date-shaped.
pub fn contains_date(text: &str) -> bool {
    date_candidates(text).next().is_some()
}

/// Byte offset where the first date-shaped token starts.
pub fn first_date_start(text: &str) -> Option<usize> {
    date_span(text, 0).map(|(start, _, _)| start)
}

fn date_candidates(text: &str) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let (_, end, caps) = date_span(text, pos)?;
        pos = end;
        Some(caps)
    })
}

/// Next match at or after `from` that is not glued to further digits.
fn date_span(text: &str, mut from: usize) -> Option<(usize, usize, (&str, &str, &str))> {
    let bytes = text.as_bytes();
    while from <= text.len() {
        let caps = DATE_RE.captures_at(text, from)?;
        let whole = caps.get(0)?;
        let before_ok = whole.start() == 0 || !bytes[whole.start() - 1].is_ascii_digit();
        let after_ok = whole.end() == text.len() || !bytes[whole.end()].is_ascii_digit();
        if before_ok && after_ok {
            return Some((
                whole.start(),
                whole.end(),
                (caps.get(1)?.as_str(), caps.get(2)?.as_str(), caps.get(3)?.as_str()),
            ));
        }
        // Matches start on an ASCII digit, so +1 stays on a char boundary.
        from = whole.start() + 1;
    }
    None
}

fn format_date(day: &str, month: &str, year: &str, kind: DateKind, pivot: u32) -> Option<String> {
    let year = match year.len() {
        4 => year.to_string(),
        2 => {
            let two: u32 = year.parse().ok()?;
            let century = match kind {
                DateKind::Expiry => 2000,
                DateKind::Birth if two <= pivot => 2000,
                DateKind::Birth => 1900,
            };
            (century + two).to_string()
        }
        _ => return None,
    };
    Some(format!("{}.{}.{}", day, month, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_digit_year_and_separators() {
        assert_eq!(parse_date("3. 05.07.1964 BELFAST", DateKind::Birth), Some("05.07.1964".to_string()));
        assert_eq!(parse_date("30/11/2031", DateKind::Expiry), Some("30.11.2031".to_string()));
        assert_eq!(parse_date("30-11-2031", DateKind::Expiry), Some("30.11.2031".to_string()));
        assert_eq!(parse_date("05.07.1964BELFAST", DateKind::Birth), Some("05.07.1964".to_string()));
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(parse_date_with_pivot("30.11.31", DateKind::Expiry, 26), Some("30.11.2031".to_string()));
        assert_eq!(parse_date_with_pivot("30.11.99", DateKind::Expiry, 26), Some("30.11.2099".to_string()));
        assert_eq!(parse_date_with_pivot("05.07.64", DateKind::Birth, 26), Some("05.07.1964".to_string()));
        assert_eq!(parse_date_with_pivot("05.07.26", DateKind::Birth, 26), Some("05.07.2026".to_string()));
        assert_eq!(parse_date_with_pivot("05.07.03", DateKind::Birth, 26), Some("05.07.2003".to_string()));
    }

    #[test]
    fn test_digit_glued_candidates_are_skipped() {
        assert_eq!(parse_date("123.04.2020", DateKind::Expiry), None);
        assert_eq!(parse_date("01.02.20201", DateKind::Expiry), None);
        assert_eq!(parse_date("123.04.2020 and 01.02.2003", DateKind::Expiry), Some("01.02.2003".to_string()));
        assert_eq!(parse_date("99999999", DateKind::Expiry), None);
    }

    #[test]
    fn test_find_first_date_scans_in_order() {
        let lines = ["ANDREA", "NO DATE", "12.12.2012", "01.01.2001"];
        assert_eq!(find_first_date(&lines, DateKind::Birth), Some("12.12.2012".to_string()));
        assert_eq!(find_first_date(&["x"], DateKind::Birth), None);
    }

    #[test]
    fn test_all_dates_counts_adjacent_dates() {
        let lines = ["01.01.2000 02.02.2000", "x 03.03.2003"];
        assert_eq!(all_dates(&lines, DateKind::Birth).len(), 3);
    }

    #[test]
    fn test_first_date_start() {
        assert_eq!(first_date_start("JOAN 05.07.1964"), Some(5));
        assert_eq!(first_date_start("JOAN"), None);
    }
}
