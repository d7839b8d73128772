//! Header and row sanitization for survey exports.

use crate::utils::is_blank_cell;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// Phrases survey tools put in a second header row ("Please provide a value
// between 1 and 10").
static INSTRUCTION_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)provide|between|value").expect("Invalid regex: instruction vocabulary")
});

/// Flatten a header to a single line.
///
/// Carriage returns and newlines become spaces, whitespace runs collapse to one
/// space and the result is trimmed.
pub(crate) fn clean_header(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean every header and suffix collisions with `.1`, `.2`, ... in column order.
pub(crate) fn clean_headers(names: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut cleaned = Vec::with_capacity(names.len());

    for name in names {
        let base = clean_header(name);
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        cleaned.push(candidate);
    }

    cleaned
}

/// A row is blank when every cell is null, whitespace or `nan`.
pub(crate) fn is_blank_row(cells: &[Option<&str>]) -> bool {
    cells.iter().all(|c| is_blank_cell(*c))
}

/// Whether a cell looks like part of a header continuation.
///
/// Only present cells are judged. A null cell is a skipped answer, not a
/// continuation marker.
pub(crate) fn is_instruction_cell(cell: Option<&str>) -> bool {
    match cell {
        None => false,
        Some(s) => s.trim().is_empty() || INSTRUCTION_VOCABULARY.is_match(s),
    }
}

/// A row is an instruction row when more than `threshold` of its cells are
/// present and either whitespace or instruction phrasing.
pub(crate) fn is_instruction_row(cells: &[Option<&str>], threshold: f64) -> bool {
    if cells.is_empty() {
        return false;
    }
    let flagged = cells.iter().filter(|c| is_instruction_cell(**c)).count();
    flagged as f64 > threshold * cells.len() as f64
}
