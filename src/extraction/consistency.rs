//! Consistency evaluator: pure, total function from three extracted
//! values to one `ConsistencyResult`.
//!
//! Equality is exact. The same clinical number is expected to be
//! transcribed identically in all three locations of one document; a
//! 1-point difference is a transcription inconsistency worth flagging.

use super::types::{ConsistencyResult, ConsistencyStatus, ExtractedValue};

/// Classify three extracted values.
///
/// Priority order: any Missing ⇒ Incomplete (naming the missing
/// locations); all equal ⇒ Good; otherwise Discordant with a message
/// listing each location's value and the outlier when two agree.
pub fn evaluate(values: [ExtractedValue; 3]) -> ConsistencyResult {
    let missing: Vec<&str> = values
        .iter()
        .filter(|v| v.is_missing())
        .map(|v| v.location.as_str())
        .collect();

    if !missing.is_empty() {
        let message = format!("No EF value found in: {}", missing.join(", "));
        return ConsistencyResult {
            status: ConsistencyStatus::Incomplete,
            values,
            message,
        };
    }

    let percents: Vec<u32> = values.iter().filter_map(|v| v.percent).collect();
    let all_equal = percents.windows(2).all(|pair| pair[0] == pair[1]);

    if all_equal {
        return ConsistencyResult {
            status: ConsistencyStatus::Good,
            values,
            message: "All EF values are consistent".into(),
        };
    }

    let listing = values
        .iter()
        .map(|v| format!("{}={}%", v.location.as_str(), v.percent.unwrap_or(0)))
        .collect::<Vec<_>>()
        .join(", ");

    // When exactly two agree, name the outlier; otherwise all differ.
    let message = match outlier(&percents) {
        Some(idx) => format!(
            "EF values are inconsistent ({listing}); {} disagrees with the other two",
            values[idx].location.as_str()
        ),
        None => format!("EF values are inconsistent ({listing}); all three differ"),
    };

    ConsistencyResult {
        status: ConsistencyStatus::Discordant,
        values,
        message,
    }
}

/// Index of the single value differing from the agreeing pair, if any.
fn outlier(percents: &[u32]) -> Option<usize> {
    for idx in 0..percents.len() {
        let rest: Vec<u32> = percents
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, p)| *p)
            .collect();
        if rest.windows(2).all(|pair| pair[0] == pair[1]) && rest[0] != percents[idx] {
            return Some(idx);
        }
    }
    None
}
