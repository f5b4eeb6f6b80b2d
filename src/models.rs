//! Core data models used throughout the manuals index.
//!
//! These types represent the device records, pinouts, and search results
//! that flow through the parsing, storage, and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Coarse classification of a documented subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Hardware,
    Software,
    Protocol,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Hardware, Domain::Software, Domain::Protocol];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Hardware => "hardware",
            Domain::Software => "software",
            Domain::Protocol => "protocol",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hardware" => Ok(Domain::Hardware),
            "software" => Ok(Domain::Software),
            "protocol" => Ok(Domain::Protocol),
            other => Err(format!(
                "unknown domain '{}': expected hardware, software, or protocol",
                other
            )),
        }
    }
}

/// A loosely typed frontmatter value.
///
/// Serialized untagged, so a metadata map round-trips through plain JSON
/// (`"x"`, `1.5`, `true`, `["a"]`, `{"k": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
    StringList(Vec<String>),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetadataValue::StringList(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used by the metadata schema report.
    pub fn kind(&self) -> &'static str {
        match self {
            MetadataValue::Bool(_) => "bool",
            MetadataValue::Number(_) => "number",
            MetadataValue::String(_) => "string",
            MetadataValue::StringList(_) => "list",
            MetadataValue::Map(_) => "map",
        }
    }

    /// Convert a YAML value. Nulls (and maps or lists left empty after
    /// dropping nulls) yield `None`; list elements are stringified.
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<MetadataValue> {
        use serde_yaml::Value;

        match value {
            Value::Null => None,
            Value::Bool(b) => Some(MetadataValue::Bool(*b)),
            // JSON has no representation for non-finite floats
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => Some(MetadataValue::Number(f)),
                _ => Some(MetadataValue::String(n.to_string())),
            },
            Value::String(s) => Some(MetadataValue::String(s.clone())),
            Value::Sequence(seq) => {
                let items: Vec<String> = seq.iter().filter_map(yaml_scalar_to_string).collect();
                if items.is_empty() {
                    None
                } else {
                    Some(MetadataValue::StringList(items))
                }
            }
            Value::Mapping(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    let Some(key) = yaml_scalar_to_string(k) else {
                        continue;
                    };
                    if let Some(converted) = MetadataValue::from_yaml(v) {
                        out.insert(key, converted);
                    }
                }
                if out.is_empty() {
                    None
                } else {
                    Some(MetadataValue::Map(out))
                }
            }
            Value::Tagged(tagged) => MetadataValue::from_yaml(&tagged.value),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Number(n) => write!(f, "{}", format_number(*n)),
            MetadataValue::String(s) => f.write_str(s),
            MetadataValue::StringList(items) => f.write_str(&items.join(", ")),
            MetadataValue::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Stringify a YAML scalar. Compound values yield `None`.
pub fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// Flexible per-device metadata keyed by frontmatter field name.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Normalized documentation entry for one hardware, software, or protocol subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub domain: Domain,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub path: String,
    pub metadata: Metadata,
    pub content: String,
    pub indexed_at: DateTime<Utc>,
}

/// List-view projection of a [`Device`] that leaves out the markdown body.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub id: String,
    pub domain: Domain,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub path: String,
    pub metadata: Metadata,
    pub indexed_at: DateTime<Utc>,
}

/// Default pull resistor state of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultPull {
    High,
    Low,
    None,
}

impl DefaultPull {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultPull::High => "high",
            DefaultPull::Low => "low",
            DefaultPull::None => "none",
        }
    }

    /// Map free text onto a pull state by substring, checked in the order
    /// high, low, none.
    pub fn from_text(text: &str) -> Option<DefaultPull> {
        let lower = text.to_lowercase();
        if lower.contains("high") {
            Some(DefaultPull::High)
        } else if lower.contains("low") {
            Some(DefaultPull::Low)
        } else if lower.contains("none") {
            Some(DefaultPull::None)
        } else {
            None
        }
    }
}

/// One physical pin of a hardware device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pinout {
    pub physical_pin: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpio_num: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_pull: Option<DefaultPull>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alt_functions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A flattened entry of the frontmatter `specs` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Search parameters accepted by the search executor.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: String,
    pub domain: Option<Domain>,
    pub device_type: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            domain: None,
            device_type: None,
            limit: 10,
            offset: 0,
        }
    }
}

/// A ranked search hit. Lower `relevance` is better (FTS5 rank).
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub domain: Domain,
    #[serde(rename = "type")]
    pub device_type: String,
    pub path: String,
    pub metadata: Metadata,
    pub relevance: f64,
}

/// Aggregate outcome of an indexing pass.
#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    pub total_files: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub by_domain: BTreeMap<Domain, usize>,
    pub duration: Duration,
    /// Set when the walk stopped early; the index then holds only the
    /// files processed before cancellation.
    pub cancelled: bool,
}

impl IndexResult {
    pub fn domain_count(&self, domain: Domain) -> usize {
        self.by_domain.get(&domain).copied().unwrap_or(0)
    }
}

/// Row counts across the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseStats {
    pub total_devices: i64,
    pub hardware_count: i64,
    pub software_count: i64,
    pub protocol_count: i64,
    pub total_pinouts: i64,
    pub total_specs: i64,
}
