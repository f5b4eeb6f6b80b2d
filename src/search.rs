//! Full-text query construction and the `manuals search` command.
//!
//! FTS5 does not accept `raspberry-pi-4` as a bareword, and splitting it
//! into separate terms loses model-number precision, so queries are
//! rewritten before they reach `MATCH`:
//!
//! | Input | FTS5 expression |
//! |-------|-----------------|
//! | `raspberry-pi-4` | `"raspberry-pi-4"` (exact phrase) |
//! | `analog sensor` | `analog sensor` (implicit AND) |
//! | `analog ds18b20-like sensor` | `analog "ds18b20-like" sensor` |
//! | `sensor AND` | `sensor "AND"` |
//!
//! Ranking is FTS5's BM25 `rank`, where lower is better.

use anyhow::Result;

use crate::config::Config;
use crate::models::{Domain, SearchOptions, SearchResult};
use crate::store::{DeviceStore, SqliteStore};

/// Rewrite a raw user query into an FTS5 expression.
///
/// A single token made of two or more hyphen-separated segments is quoted
/// whole. Otherwise words are kept as implicit-AND terms, and any word FTS5
/// cannot take as a bareword (hyphens above all) is quoted on its own.
pub fn build_fts_query(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        return String::new();
    }

    if is_model_number(query) {
        return quote(query);
    }

    query
        .split_whitespace()
        .map(|word| {
            if needs_quoting(word) {
                quote(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_model_number(query: &str) -> bool {
    !query.contains(char::is_whitespace)
        && query.split('-').filter(|seg| !seg.is_empty()).count() > 1
}

/// Uppercase keywords FTS5 parses as operators rather than terms.
const FTS_OPERATORS: &[&str] = &["AND", "OR", "NOT", "NEAR"];

/// FTS5 barewords allow alphanumerics, `_`, and non-ASCII; a trailing `*`
/// is a prefix query and is left alone. Operator keywords are searched as
/// plain words.
fn needs_quoting(word: &str) -> bool {
    let stem = word.strip_suffix('*').unwrap_or(word);
    word.contains('-')
        || stem.is_empty()
        || FTS_OPERATORS.contains(&word)
        || stem
            .chars()
            .any(|c| c.is_ascii() && !(c.is_ascii_alphanumeric() || c == '_'))
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Run a search against any store.
pub async fn search_devices(
    store: &dyn DeviceStore,
    opts: &SearchOptions,
) -> crate::error::Result<Vec<SearchResult>> {
    store.search(opts).await
}

/// The `manuals search` command: query the index and print ranked results.
pub async fn run_search(
    config: &Config,
    query: &str,
    domain: Option<Domain>,
    device_type: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let store = SqliteStore::open(config).await?;
    let opts = SearchOptions {
        query: query.to_string(),
        domain,
        device_type,
        limit: config.effective_limit(limit),
        offset: offset.unwrap_or(0).max(0),
    };

    tracing::debug!(query = %query, fts = %build_fts_query(query), "searching");
    let results = search_devices(&store, &opts).await?;
    store.close().await;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} ({} / {})",
            opts.offset as usize + i + 1,
            result.relevance,
            result.name,
            result.domain,
            result.device_type
        );
        if let Some(manufacturer) = result.metadata.get("manufacturer") {
            println!("    manufacturer: {}", manufacturer);
        }
        if let Some(tags) = result.metadata.get("tags") {
            println!("    tags: {}", tags);
        }
        println!("    path: {}", result.path);
        println!("    id: {}", result.id);
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        assert_eq!(build_fts_query(""), "");
        assert_eq!(build_fts_query("   \t "), "");
    }

    #[test]
    fn test_model_number_quoted_whole() {
        assert_eq!(build_fts_query("raspberry-pi-4"), "\"raspberry-pi-4\"");
        assert_eq!(build_fts_query("  esp32-s3 "), "\"esp32-s3\"");
    }

    #[test]
    fn test_plain_words_implicit_and() {
        assert_eq!(build_fts_query("analog sensor"), "analog sensor");
        assert_eq!(build_fts_query("analog   sensor"), "analog sensor");
    }

    #[test]
    fn test_only_hyphenated_word_quoted() {
        assert_eq!(
            build_fts_query("analog ds18b20-like sensor"),
            "analog \"ds18b20-like\" sensor"
        );
    }

    #[test]
    fn test_embedded_quotes_escaped() {
        assert_eq!(build_fts_query("pi-\"4\""), "\"pi-\"\"4\"\"\"");
        assert_eq!(build_fts_query("say \"hi"), "say \"\"\"hi\"");
    }

    #[test]
    fn test_single_segment_hyphen_not_model() {
        // one non-empty segment: quoted as a word, not as a model number
        assert_eq!(build_fts_query("-gpio"), "\"-gpio\"");
    }

    #[test]
    fn test_operator_keywords_quoted() {
        assert_eq!(build_fts_query("sensor AND"), "sensor \"AND\"");
        assert_eq!(build_fts_query("NOT"), "\"NOT\"");
        assert_eq!(build_fts_query("OR NEAR"), "\"OR\" \"NEAR\"");
        assert_eq!(build_fts_query("and not"), "and not");
    }

    #[test]
    fn test_punctuation_quoted_prefix_kept() {
        assert_eq!(build_fts_query("i2c.h"), "\"i2c.h\"");
        assert_eq!(build_fts_query("rasp*"), "rasp*");
        assert_eq!(build_fts_query("température"), "température");
    }
}
