//! YAML frontmatter extraction and metadata normalization.
//!
//! A document may open with a block delimited by `---` lines:
//!
//! ```text
//! ---
//! manufacturer: Maxim
//! model: DS18B20
//! category: sensors/temperature
//! tags: [temperature, 1-wire]
//! ---
//! # DS18B20
//! ...
//! ```
//!
//! Delimiter problems never fail a parse: a missing opening line or a
//! block that is never closed leaves the whole text as body. Only a
//! closed block holding invalid YAML is reported as an error.

use serde_yaml::{Mapping, Value};

use crate::models::{yaml_scalar_to_string, Metadata, MetadataValue};

const DELIMITER: &str = "---";

/// Recognized frontmatter fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub category: Option<String>,
    pub version: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
    pub datasheets: Vec<String>,
    pub related_hardware: Vec<String>,
    pub specs: Option<MetadataValue>,
}

impl Frontmatter {
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("")
    }

    fn from_mapping(map: &Mapping) -> Self {
        Self {
            manufacturer: scalar_field(map, "manufacturer"),
            model: scalar_field(map, "model"),
            category: scalar_field(map, "category"),
            version: scalar_field(map, "version"),
            date: scalar_field(map, "date"),
            tags: list_field(map, "tags"),
            datasheets: list_field(map, "datasheets"),
            related_hardware: list_field(map, "related_hardware"),
            specs: map
                .get("specs")
                .filter(|v| v.is_mapping())
                .and_then(MetadataValue::from_yaml),
        }
    }
}

/// Split `content` into the raw frontmatter block and the body.
///
/// Returns `(None, content)` when the text does not open with a `---`
/// line or the block is never closed by a line starting with `---`.
/// Otherwise the body is everything after the closing delimiter, trimmed.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(first_end) = content.find('\n') else {
        return (None, content);
    };
    if content[..first_end].trim_end_matches('\r') != DELIMITER {
        return (None, content);
    }

    let block_start = first_end + 1;
    let mut line_start = block_start;
    loop {
        if content[line_start..].starts_with(DELIMITER) {
            let block = &content[block_start..line_start];
            let body = content[line_start + DELIMITER.len()..].trim();
            return (Some(block), body);
        }
        match content[line_start..].find('\n') {
            Some(offset) => line_start += offset + 1,
            None => return (None, content),
        }
    }
}

/// Parse a raw YAML block into [`Frontmatter`].
///
/// An empty block yields the default value. A block that is not valid
/// YAML, or whose root is not a mapping, is an error.
pub fn parse_block(block: &str) -> Result<Frontmatter, String> {
    let value: Value = serde_yaml::from_str(block).map_err(|e| e.to_string())?;
    match value {
        Value::Null => Ok(Frontmatter::default()),
        Value::Mapping(map) => Ok(Frontmatter::from_mapping(&map)),
        other => Err(format!(
            "frontmatter must be a mapping, found {}",
            yaml_kind(&other)
        )),
    }
}

/// Extract frontmatter and body in one step.
pub fn extract_frontmatter(content: &str) -> Result<(Frontmatter, &str), String> {
    match split_frontmatter(content) {
        (Some(block), body) => Ok((parse_block(block)?, body)),
        (None, body) => Ok((Frontmatter::default(), body)),
    }
}

/// Build the device metadata map, keeping only non-empty fields.
pub fn build_metadata(fm: &Frontmatter) -> Metadata {
    let mut metadata = Metadata::new();

    let strings = [
        ("manufacturer", &fm.manufacturer),
        ("model", &fm.model),
        ("category", &fm.category),
        ("version", &fm.version),
        ("date", &fm.date),
    ];
    for (key, value) in strings {
        if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
            metadata.insert(key.to_string(), MetadataValue::String(v.clone()));
        }
    }

    let lists = [
        ("tags", &fm.tags),
        ("datasheets", &fm.datasheets),
        ("related_hardware", &fm.related_hardware),
    ];
    for (key, value) in lists {
        if !value.is_empty() {
            metadata.insert(key.to_string(), MetadataValue::StringList(value.clone()));
        }
    }

    if let Some(specs) = &fm.specs {
        metadata.insert("specs".to_string(), specs.clone());
    }

    metadata
}

fn scalar_field(map: &Mapping, key: &str) -> Option<String> {
    map.get(key)
        .and_then(yaml_scalar_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A list field; a lone scalar is accepted as a one-element list.
fn list_field(map: &Mapping, key: &str) -> Vec<String> {
    let items: Vec<String> = match map.get(key) {
        Some(Value::Sequence(seq)) => seq.iter().filter_map(yaml_scalar_to_string).collect(),
        Some(other) => yaml_scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let text = "---\nmodel: X\n---\n\n# Title\n";
        let (block, body) = split_frontmatter(text);
        assert_eq!(block, Some("model: X\n"));
        assert_eq!(body, "# Title");
    }

    #[test]
    fn test_split_crlf() {
        let text = "---\r\nmodel: X\r\n---\r\nBody";
        let (block, body) = split_frontmatter(text);
        assert_eq!(block, Some("model: X\r\n"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_split_empty_block() {
        let (block, body) = split_frontmatter("---\n---\nBody");
        assert_eq!(block, Some(""));
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_no_opening_delimiter() {
        let text = "# Title\n---\nmodel: X\n---\n";
        let (block, body) = split_frontmatter(text);
        assert!(block.is_none());
        assert_eq!(body, text);
    }

    #[test]
    fn test_opening_line_must_be_exact() {
        let text = "--- \nmodel: X\n---\nBody";
        assert!(split_frontmatter(text).0.is_none());
    }

    #[test]
    fn test_unterminated_block_is_body() {
        let text = "---\nmodel: X\nno closing line";
        let (fm, body) = extract_frontmatter(text).unwrap();
        assert_eq!(fm, Frontmatter::default());
        assert_eq!(body, text);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let text = "---\nmodel: [unclosed\n---\nBody";
        assert!(extract_frontmatter(text).is_err());
    }

    #[test]
    fn test_non_mapping_root_is_error() {
        assert!(parse_block("- a\n- b\n").is_err());
    }

    #[test]
    fn test_scalars_coerced_to_strings() {
        let fm = parse_block("model: 4\nversion: 1.2\ntags: solo\n").unwrap();
        assert_eq!(fm.model.as_deref(), Some("4"));
        assert_eq!(fm.version.as_deref(), Some("1.2"));
        assert_eq!(fm.tags, vec!["solo".to_string()]);
    }

    #[test]
    fn test_build_metadata_omits_empty_fields() {
        let fm = parse_block(
            "manufacturer: Raspberry Pi\nmodel: \"4B\"\ncategory: sbc/raspberry-pi\ntags: []\nversion: \"\"\n",
        )
        .unwrap();
        let meta = build_metadata(&fm);
        assert_eq!(meta.len(), 3);
        assert_eq!(meta["model"].as_str(), Some("4B"));
        assert!(!meta.contains_key("tags"));
        assert!(!meta.contains_key("version"));
    }

    #[test]
    fn test_specs_nested_map_kept() {
        let fm = parse_block("specs:\n  voltage: 3.3\n  interface:\n    bus: i2c\n").unwrap();
        let meta = build_metadata(&fm);
        let Some(MetadataValue::Map(specs)) = meta.get("specs") else {
            panic!("specs missing");
        };
        assert_eq!(specs["voltage"], MetadataValue::Number(3.3));
        assert!(matches!(specs["interface"], MetadataValue::Map(_)));
    }
}
