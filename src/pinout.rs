//! Tolerant GPIO pinout table extraction.
//!
//! Scans a markdown body line by line for pipe tables whose header names
//! a pin column, and turns each data row into a [`Pinout`]. Columns are
//! positional:
//!
//! | # | Column | Notes |
//! |---|--------|-------|
//! | 1 | physical pin | integer, required |
//! | 2 | GPIO | integer, or `-` for none |
//! | 3 | name | `-` for empty |
//! | 4 | default pull | free text containing high / low / none |
//! | 5 | alt functions | comma separated, `-` for none |
//! | 6 | description | `-` for none |
//!
//! Rows that cannot be read (fewer than three cells, non-numeric pin) are
//! dropped without error.

use crate::models::{DefaultPull, Pinout};

const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Searching,
    HeaderFound,
    InTable,
}

/// Extract every pinout row from every pin table in `markdown`.
pub fn extract_pinouts(markdown: &str) -> Vec<Pinout> {
    let mut pinouts = Vec::new();
    let mut state = ScanState::Searching;

    for line in markdown.lines() {
        let trimmed = line.trim();
        let has_pipe = trimmed.contains('|');

        if state == ScanState::HeaderFound {
            if has_pipe && trimmed.contains('-') {
                state = ScanState::InTable;
                continue;
            }
            state = ScanState::Searching;
        }

        match state {
            ScanState::Searching => {
                if has_pipe && is_pin_header(trimmed) {
                    state = ScanState::HeaderFound;
                }
            }
            ScanState::InTable => {
                if trimmed.is_empty() || !has_pipe {
                    state = ScanState::Searching;
                } else if let Some(pin) = parse_pinout_row(trimmed) {
                    pinouts.push(pin);
                }
            }
            ScanState::HeaderFound => {}
        }
    }

    pinouts
}

/// A header row has a column named exactly `pin`, or mentions a physical pin.
fn is_pin_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    if lower.contains("physical") && lower.contains("pin") {
        return true;
    }
    lower.split('|').any(|cell| cell.trim() == "pin")
}

/// Parse one table row. Returns `None` for rows that should be skipped.
pub fn parse_pinout_row(row: &str) -> Option<Pinout> {
    let cells: Vec<&str> = row
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    if cells.len() < 3 {
        return None;
    }

    let physical_pin = cells[0].parse::<i64>().ok()?;

    let gpio_num = match cells[1] {
        PLACEHOLDER => None,
        gpio => gpio.parse::<i64>().ok(),
    };

    let name = match cells[2] {
        PLACEHOLDER => String::new(),
        name => name.to_string(),
    };

    let default_pull = cells.get(3).and_then(|c| DefaultPull::from_text(c));

    let alt_functions = match cells.get(4) {
        Some(&PLACEHOLDER) | None => Vec::new(),
        Some(funcs) => funcs
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
    };

    let description = cells
        .get(5)
        .filter(|d| **d != PLACEHOLDER)
        .map(|d| d.to_string());

    Some(Pinout {
        physical_pin,
        gpio_num,
        name,
        default_pull,
        alt_functions,
        description,
    })
}
