//! Domain classification and device identity.
//!
//! Both functions here are pure and total. The device ID depends only on
//! `(category, model)`, so reindexing the same tree never changes
//! identities.

use crate::models::Domain;

const SOFTWARE_PREFIXES: &[&str] = &["libraries/", "frameworks/", "applications/", "software/"];
const PROTOCOL_PREFIXES: &[&str] = &["protocols/", "protocol/"];

/// Derive `(domain, type)` from a slash-separated category path.
///
/// Unrecognized prefixes, including an empty category, fall back to
/// [`Domain::Hardware`]. The type is the last path segment, or
/// `"unknown"` when that segment is empty.
pub fn classify(category: &str) -> (Domain, String) {
    (domain_for(category), type_for(category))
}

pub fn domain_for(category: &str) -> Domain {
    let lower = category.to_lowercase();
    if SOFTWARE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        Domain::Software
    } else if PROTOCOL_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        Domain::Protocol
    } else {
        Domain::Hardware
    }
}

pub fn type_for(category: &str) -> String {
    match category.rsplit('/').next().map(str::trim) {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Build the stable `{category}-{model}` identifier.
///
/// The category has `/` mapped to `-`, is lowercased, and every run of
/// characters outside `[a-z0-9-]` becomes one `-`. The model is lowercased,
/// every run of non-alphanumerics becomes one `-`, and edge dashes are
/// trimmed.
pub fn generate_device_id(category: &str, model: &str) -> String {
    let category = category.replace('/', "-").to_lowercase();
    let category = collapse_runs(&category, |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
    });

    let model = model.to_lowercase();
    let model = collapse_runs(&model, |c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let model = model.trim_matches('-');

    format!("{}-{}", category, model)
}

/// Replace each maximal run of characters rejected by `keep` with one `-`.
fn collapse_runs(input: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if keep(c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}
