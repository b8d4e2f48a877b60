//! EF token scanning and numeric normalization.
//!
//! Pattern set follows the forms seen in real echo reports: a label
//! ("EF", "LVEF", "Ejection Fraction") followed within a small token
//! window ("is", "of", ":", "=") by a percentage-shaped literal, or the
//! reversed "55% EF" form. Matches are taken in document order, not
//! pattern order.

use std::sync::LazyLock;

use regex::Regex;

use super::regions::segment;
use super::types::{EfLocation, ExtractedValue};
use super::ExtractionError;

/// Label-first and value-first EF patterns. Group 1 is the matched
/// literal verbatim, percent sign included when the document has one.
static EF_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)ejection\s+fraction[^\d\n.;]{0,24}?(\d{1,3}(?:\.\d+)?%?)").unwrap(),
        Regex::new(r"(?i)\blvef\b[^\d\n.;]{0,24}?(\d{1,3}(?:\.\d+)?%?)").unwrap(),
        Regex::new(r"(?i)\bef\b[^\d\n.;]{0,24}?(\d{1,3}(?:\.\d+)?%?)").unwrap(),
        Regex::new(r"(?i)(\d{1,3}(?:\.\d+)?\s*%)\s*(?:lvef\b|ef\b|ejection)").unwrap(),
    ]
});

/// Row label for the calculations-table scan (same synonym set).
static TABLE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:lv)?ef\b|ejection\s+fraction").unwrap());

/// Numeric cell adjacent to a table label.
static TABLE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?%?)").unwrap());

/// EF sanity window: numerals outside it are not EF readings and are
/// skipped in favor of the next candidate.
const EF_MIN: u32 = 10;
const EF_MAX: u32 = 90;

/// Produce exactly three extracted values from report plain text.
pub fn extract_values(text: &str) -> Result<[ExtractedValue; 3], ExtractionError> {
    let regions = segment(text)?;

    let conclusion = scan_region(EfLocation::Conclusion, regions.conclusion);
    let body = scan_region(EfLocation::Body, Some(regions.body));
    let calcs = match regions.calcs {
        Some(table) => scan_table(table),
        None => ExtractedValue::missing(EfLocation::CalculationsTable),
    };

    tracing::debug!(
        conclusion = ?conclusion.percent,
        body = ?body.percent,
        calcs = ?calcs.percent,
        "EF extraction complete"
    );

    Ok([conclusion, body, calcs])
}

fn scan_region(location: EfLocation, region: Option<&str>) -> ExtractedValue {
    match region.and_then(first_ef) {
        Some((raw, percent)) => ExtractedValue::found(location, raw, percent),
        None => ExtractedValue::missing(location),
    }
}

/// First EF mention in document order across all patterns.
/// Returns the matched literal as written plus its normalized value.
fn first_ef(text: &str) -> Option<(String, u32)> {
    let mut best: Option<(usize, &str, u32)> = None;
    for pattern in EF_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(literal) = caps.get(1) else {
                continue;
            };
            let Some(percent) = parse_percent(literal.as_str()) else {
                continue;
            };
            let start = caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX);
            if best.map_or(true, |(s, _, _)| start < s) {
                best = Some((start, literal.as_str(), percent));
            }
        }
    }
    best.map(|(_, literal, percent)| (literal.to_string(), percent))
}

/// Locate a labeled EF row and extract the adjacent numeric cell.
///
/// If multiple rows match, the first is taken and the ambiguity flag set.
/// Handles both value-on-same-line and value-on-next-line table layouts.
fn scan_table(table: &str) -> ExtractedValue {
    let lines: Vec<&str> = table.lines().collect();
    let mut matches: Vec<(String, u32)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(label) = TABLE_LABEL.find(line) else {
            continue;
        };
        // Same line: first numeric cell after the label.
        let after_label = &line[label.end()..];
        let same_line = cell_value(after_label);
        // Next line: common two-column table layout.
        let value = same_line.or_else(|| lines.get(idx + 1).and_then(|next| cell_value(next)));
        if let Some(found) = value {
            matches.push(found);
        }
    }

    match matches.as_slice() {
        [] => ExtractedValue::missing(EfLocation::CalculationsTable),
        [(raw, percent), rest @ ..] => {
            let mut value =
                ExtractedValue::found(EfLocation::CalculationsTable, raw.clone(), *percent);
            value.ambiguous = !rest.is_empty();
            value
        }
    }
}

/// Numeric cell literal and its normalized value, if parseable.
fn cell_value(text: &str) -> Option<(String, u32)> {
    let caps = TABLE_VALUE.captures(text)?;
    let literal = caps.get(1)?.as_str();
    parse_percent(literal).map(|percent| (literal.to_string(), percent))
}

/// Normalize a matched literal to a whole integer percent.
///
/// Fractional readings are not percentage-shaped for echo EF (reported in
/// whole percent), so anything with a nonzero fraction is rejected, as is
/// anything outside the sanity window.
fn parse_percent(literal: &str) -> Option<u32> {
    let number: f64 = literal.trim_end_matches('%').trim().parse().ok()?;
    if number.fract() != 0.0 {
        return None;
    }
    let percent = number as u32;
    (EF_MIN..=EF_MAX).contains(&percent).then_some(percent)
}
