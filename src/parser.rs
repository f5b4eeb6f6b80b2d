//! Markdown document parser.
//!
//! Composes frontmatter extraction, metadata normalization, classification,
//! ID generation, and pinout extraction into one [`ParsedDocument`] per
//! source file.

use std::collections::BTreeMap;
use std::path::Path;

use crate::classify::{classify, generate_device_id};
use crate::error::{IndexError, Result};
use crate::frontmatter::{build_metadata, extract_frontmatter};
use crate::models::{Domain, Metadata, MetadataValue, Pinout, Specification};
use crate::pinout::extract_pinouts;

/// Structured view of one markdown file.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub id: String,
    pub domain: Domain,
    pub device_type: String,
    pub metadata: Metadata,
    pub content: String,
    /// Always empty unless the domain is hardware.
    pub pinouts: Vec<Pinout>,
    pub specifications: Vec<Specification>,
}

/// Read and parse a markdown file. Invalid UTF-8 is replaced, not rejected.
pub fn parse_markdown_file(path: &Path) -> Result<ParsedDocument> {
    let bytes = std::fs::read(path).map_err(|source| IndexError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    parse_document(&text).map_err(|message| IndexError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse markdown text. Fails only on a closed frontmatter block that is
/// not a valid YAML mapping.
pub fn parse_document(text: &str) -> std::result::Result<ParsedDocument, String> {
    let (frontmatter, body) = extract_frontmatter(text)?;

    let metadata = build_metadata(&frontmatter);
    let (domain, device_type) = classify(frontmatter.category());
    let id = generate_device_id(frontmatter.category(), frontmatter.model());

    let pinouts = if domain == Domain::Hardware {
        extract_pinouts(body)
    } else {
        Vec::new()
    };

    let specifications = match &frontmatter.specs {
        Some(MetadataValue::Map(specs)) => flatten_specs(specs),
        _ => Vec::new(),
    };

    Ok(ParsedDocument {
        id,
        domain,
        device_type,
        metadata,
        content: body.to_string(),
        pinouts,
        specifications,
    })
}

/// Flatten a `specs` map into specification records.
///
/// Nested maps produce dotted keys. A map carrying a `value` key is one
/// record, with its `unit` key (if any) as the unit.
pub fn flatten_specs(specs: &BTreeMap<String, MetadataValue>) -> Vec<Specification> {
    let mut out = Vec::new();
    flatten_into(&mut out, "", specs);
    out
}

fn flatten_into(out: &mut Vec<Specification>, prefix: &str, map: &BTreeMap<String, MetadataValue>) {
    for (key, value) in map {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            MetadataValue::Map(inner) => match inner.get("value") {
                Some(v) => out.push(Specification {
                    key: full_key,
                    value: v.to_string(),
                    unit: inner.get("unit").map(|u| u.to_string()),
                }),
                None => flatten_into(out, &full_key, inner),
            },
            other => out.push(Specification {
                key: full_key,
                value: other.to_string(),
                unit: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DS18B20: &str = "\
---
manufacturer: Maxim Integrated
model: DS18B20
category: sensors/temperature
tags: [temperature, 1-wire, waterproof]
specs:
  voltage:
    value: 3.0-5.5
    unit: V
  accuracy: 0.5
  resolution:
    min: 9
    max: 12
---

# DS18B20 Digital Thermometer

| Pin | GPIO | Name | Default Pull | Alt Functions | Description |
|-----|------|------|--------------|---------------|-------------|
| 1 | - | GND | - | - | Ground |
| 2 | 4 | DQ | high | 1-Wire | Data line |
| 3 | - | VDD | - | - | Supply |
";

    #[test]
    fn test_parse_hardware_document() {
        let doc = parse_document(DS18B20).unwrap();
        assert_eq!(doc.id, "sensors-temperature-ds18b20");
        assert_eq!(doc.domain, Domain::Hardware);
        assert_eq!(doc.device_type, "temperature");
        assert_eq!(doc.pinouts.len(), 3);
        assert!(doc.content.starts_with("# DS18B20"));
        assert_eq!(
            doc.metadata["tags"],
            MetadataValue::StringList(vec![
                "temperature".into(),
                "1-wire".into(),
                "waterproof".into()
            ])
        );
    }

    #[test]
    fn test_specs_flattened() {
        let doc = parse_document(DS18B20).unwrap();
        let specs = &doc.specifications;
        assert_eq!(specs.len(), 4);

        let voltage = specs.iter().find(|s| s.key == "voltage").unwrap();
        assert_eq!(voltage.value, "3.0-5.5");
        assert_eq!(voltage.unit.as_deref(), Some("V"));

        let accuracy = specs.iter().find(|s| s.key == "accuracy").unwrap();
        assert_eq!(accuracy.value, "0.5");
        assert_eq!(accuracy.unit, None);

        assert!(specs.iter().any(|s| s.key == "resolution.min" && s.value == "9"));
    }

    #[test]
    fn test_non_hardware_skips_pinouts() {
        let text = "---\nmodel: Wire\ncategory: libraries/arduino\n---\n| Pin | GPIO | Name |\n|---|---|---|\n| 1 | 2 | SDA |\n";
        let doc = parse_document(text).unwrap();
        assert_eq!(doc.domain, Domain::Software);
        assert!(doc.pinouts.is_empty());
    }

    #[test]
    fn test_no_frontmatter_still_parses() {
        let doc = parse_document("# Loose notes\n\nNothing structured here.").unwrap();
        assert_eq!(doc.domain, Domain::Hardware);
        assert_eq!(doc.device_type, "unknown");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.id, "-");
    }

    #[test]
    fn test_bad_yaml_is_error() {
        assert!(parse_document("---\ntags: [a, b\n---\nbody").is_err());
    }

    #[test]
    fn test_invalid_utf8_file_still_parses() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("legacy.md");
        let mut bytes = b"---\ncategory: sensors/light\nmodel: LDR\n---\nResistance ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b" ohm\n");
        std::fs::write(&path, bytes).unwrap();

        let doc = parse_markdown_file(&path).unwrap();
        assert_eq!(doc.id, "sensors-light-ldr");
        assert!(doc.content.starts_with("Resistance"));
        assert!(doc.content.contains('\u{FFFD}'));
    }
}
