//! Region segmentation: Conclusion / Body / CalculationsTable.
//!
//! Headings are located by case-insensitive, punctuation-tolerant keyword
//! matching on short lines. Keywords are tried in priority order, so a
//! report containing both `FINDINGS:` and `CONCLUSION:` segments on the
//! conclusion heading, not the findings one.

use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionError;

/// Conclusion-section heading keywords, highest priority first.
static CONCLUSION_HEADINGS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["conclusions?", "summary", "impressions?", "assessment", "diagnosis", "findings"]
        .iter()
        .map(|kw| heading_regex(kw))
        .collect()
});

/// Calculations-table heading keywords, highest priority first.
/// Accepts common synonyms: a heading containing "Calculations" or
/// "Measurements" both count.
static CALC_HEADINGS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["calculations?", "measurements?", "quantitative", "parameters"]
        .iter()
        .map(|kw| heading_regex(kw))
        .collect()
});

/// A heading is a short line containing the keyword as a whole word.
/// Short-line bound keeps prose mentions ("in conclusion, the...") from
/// being mistaken for section headings.
fn heading_regex(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?im)^[^\n]{{0,32}}?\b{keyword}\b[^\n]{{0,32}}$"))
        .expect("valid heading pattern")
}

/// The three scan regions of one report.
#[derive(Debug)]
pub struct Regions<'a> {
    /// From the conclusion heading to the next heading (or end of text).
    pub conclusion: Option<&'a str>,
    /// Everything before the conclusion heading.
    pub body: &'a str,
    /// From the table heading to the next heading (or end of text).
    pub calcs: Option<&'a str>,
}

/// Segment report text into the three canonical regions.
///
/// Only a structurally impossible input (blank document) is an error;
/// absent headings yield `None` regions, which downstream encodes as
/// Missing values.
pub fn segment(text: &str) -> Result<Regions<'_>, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }

    let conclusion_start = first_heading(text, &CONCLUSION_HEADINGS);
    let calc_start = first_heading(text, &CALC_HEADINGS);

    let conclusion = conclusion_start.map(|start| {
        let end = match calc_start {
            Some(c) if c > start => c,
            _ => text.len(),
        };
        &text[start..end]
    });

    let calcs = calc_start.map(|start| {
        let end = match conclusion_start {
            Some(c) if c > start => c,
            _ => text.len(),
        };
        &text[start..end]
    });

    let body = &text[..conclusion_start.unwrap_or(text.len())];

    Ok(Regions {
        conclusion,
        body,
        calcs,
    })
}

/// First match position, by keyword priority then earliest occurrence.
fn first_heading(text: &str, patterns: &[Regex]) -> Option<usize> {
    patterns
        .iter()
        .find_map(|re| re.find(text).map(|m| m.start()))
}
