//! Label segmentation of normalized OCR lines.
//!
//! A licence prints a small fixed set of field markers ("1.", "2.", "4b." ...)
//! before each value. This module finds them and exposes the line range that
//! belongs to each one.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<label>` at line start, then `.`/`)`/whitespace/end, then the inline value.
static LEADING_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(4a|4b|1|2|3|5|8|9)(?:\s*[.)]\s*|\s+|$)(.*)$").expect("static regex")
});

/// `<label>` anywhere in a line, not glued to other alphanumerics.
static INLINE_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Z0-9])(4a|4b|1|2|3|5|8|9)(?:[\s.)]|$)").expect("static regex")
});

/// Field markers printed on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Surname,
    GivenNames,
    BirthDate,
    IssueDate,
    ExpiryDate,
    LicenceNumber,
    Address,
    Categories,
}

impl Label {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "1" => Some(Self::Surname),
            "2" => Some(Self::GivenNames),
            "3" => Some(Self::BirthDate),
            "4a" => Some(Self::IssueDate),
            "4b" => Some(Self::ExpiryDate),
            "5" => Some(Self::LicenceNumber),
            "8" => Some(Self::Address),
            "9" => Some(Self::Categories),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Surname => "1",
            Self::GivenNames => "2",
            Self::BirthDate => "3",
            Self::IssueDate => "4a",
            Self::ExpiryDate => "4b",
            Self::LicenceNumber => "5",
            Self::Address => "8",
            Self::Categories => "9",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatch {
    pub label: Label,
    pub value: String,
    pub index: usize,
}

/// First occurrence of each label over one set of lines, in input order.
#[derive(Debug, Clone)]
pub struct LabelIndex<'a> {
    lines: &'a [String],
    matches: Vec<LabelMatch>,
}

impl<'a> LabelIndex<'a> {
    /// Index `lines`, which must already be normalized and non-blank.
    ///
    /// Leading labels are tried first. Only when no line starts with a label is
    /// the inline form used, so a stray digit inside an address cannot
    /// displace a real field marker.
    pub fn build(lines: &'a [String]) -> Self {
        let mut matches = collect_matches(lines, leading_match);
        if matches.is_empty() {
            matches = collect_matches(lines, inline_match);
        }
        tracing::debug!(
            "LabelIndex: {} labels over {} lines: {:?}",
            matches.len(),
            lines.len(),
            matches.iter().map(|m| m.label.token()).collect::<Vec<_>>()
        );
        Self { lines, matches }
    }

    pub fn lines(&self) -> &'a [String] {
        self.lines
    }

    pub fn get(&self, label: Label) -> Option<&LabelMatch> {
        self.matches.iter().find(|m| m.label == label)
    }

    /// Smallest recorded label index strictly after `index`, or the line count.
    pub fn next_label_index_after(&self, index: usize) -> usize {
        self.matches
            .iter()
            .map(|m| m.index)
            .filter(|&i| i > index)
            .min()
            .unwrap_or(self.lines.len())
    }

    /// Lines attributed to `label`: its inline value followed by every
    /// non-label line up to the next recorded label.
    pub fn range(&self, label: Label) -> Vec<&'a str> {
        self.indexed_range(label)
            .into_iter()
            .map(|(_, text)| text)
            .collect()
    }

    /// Like [`range`](Self::range), with the source line index of each entry.
    pub fn indexed_range(&self, label: Label) -> Vec<(usize, &'a str)> {
        let Some(found) = self.get(label) else {
            return Vec::new();
        };
        let end = self.next_label_index_after(found.index);
        let mut range = Vec::new();
        if !found.value.trim().is_empty() {
            // The inline value is always a suffix of the label line.
            let line = self.lines[found.index].as_str();
            let start = line.len() - found.value.len();
            range.push((found.index, line[start..].trim()));
        }
        for i in found.index + 1..end {
            let line = self.lines[i].as_str();
            if !line.trim().is_empty() && !is_label_line(line) {
                range.push((i, line));
            }
        }
        range
    }
}

/// True when the whole line parses as a leading label (with or without value).
pub fn is_label_line(line: &str) -> bool {
    LEADING_LABEL_RE.is_match(line)
}

fn collect_matches(
    lines: &[String],
    matcher: fn(&str) -> Option<(Label, String)>,
) -> Vec<LabelMatch> {
    let mut matches: Vec<LabelMatch> = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if let Some((label, value)) = matcher(line) {
            if matches.iter().all(|m| m.label != label) {
                matches.push(LabelMatch { label, value, index });
            }
        }
    }
    matches
}

fn leading_match(line: &str) -> Option<(Label, String)> {
    let caps = LEADING_LABEL_RE.captures(line)?;
    let label = Label::from_token(caps.get(1)?.as_str())?;
    let value = caps.get(2).map_or("", |m| m.as_str());
    Some((label, value.to_string()))
}

fn inline_match(line: &str) -> Option<(Label, String)> {
    let caps = INLINE_LABEL_RE.captures(line)?;
    let token = caps.get(1)?;
    let label = Label::from_token(token.as_str())?;
    let value = line[token.end()..].trim_start_matches(|c: char| c == '.' || c == ')' || c.is_whitespace());
    Some((label, value.to_string()))
}
