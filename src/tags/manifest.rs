//! Tag manifest: which tags are recognised, their cardinality and formatter.
//!
//! The manifest is a plain value handed to the [`TagExtractor`](super::TagExtractor); two
//! passes with different manifests never share state.

use crate::collection::KeyValue;
use crate::example::ExampleSpec;
use serde_json::{Map, Value};

/// Result of a tag formatter
pub type FormatResult = Result<Value, serde_json::Error>;

/// Converts the raw text of one tag occurrence into its stored value.
pub type Formatter = fn(&str) -> FormatResult;

/// Parsing rule for one known tag.
#[derive(Debug, Clone)]
pub struct TagSpec {
    pub name: String,
    /// Keep only the first occurrence
    pub single: bool,
    pub formatter: Option<Formatter>,
}

impl TagSpec {
    pub fn single(name: &str) -> Self {
        Self {
            name: name.to_string(),
            single: true,
            formatter: None,
        }
    }

    pub fn multiple(name: &str) -> Self {
        Self {
            name: name.to_string(),
            single: false,
            formatter: None,
        }
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

/// The set of known tags.
#[derive(Debug, Clone)]
pub struct TagManifest {
    specs: Vec<TagSpec>,
}

impl TagManifest {
    /// An empty manifest: every tag is unknown and accumulates raw text.
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Add or replace the rule for a tag.
    pub fn with(mut self, spec: TagSpec) -> Self {
        self.specs.retain(|s| s.name != spec.name);
        self.specs.push(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TagSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for TagManifest {
    fn default() -> Self {
        Self::empty()
            .with(TagSpec::multiple("example").with_formatter(format_example))
            .with(TagSpec::single("headers").with_formatter(format_key_values))
            .with(TagSpec::single("body"))
            .with(TagSpec::single("json"))
            .with(TagSpec::single("urlencoded"))
            .with(TagSpec::single("formdata"))
            .with(TagSpec::single("bodyMode"))
            .with(TagSpec::single("test"))
            .with(TagSpec::single("params").with_formatter(format_key_values))
    }
}

/// `headers` / `params`: JSON object or list → ordered `{key, value}` list.
pub fn format_key_values(content: &str) -> FormatResult {
    let json: Value = serde_json::from_str(content)?;
    let list = key_values(json)?;
    serde_json::to_value(list)
}

/// `example`: JSON `{name?, request?, response?}` with normalized sub-objects.
pub fn format_example(content: &str) -> FormatResult {
    let spec = ExampleSpec::from_tag(content)?;
    serde_json::to_value(spec)
}

/// Arrays are kept as they are; objects become `{key, value}` entries in key order.
pub fn normalize_obj_array(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(fields) => Value::Array(
            fields
                .into_iter()
                .map(|(key, value)| {
                    let mut entry = Map::new();
                    entry.insert("key".to_string(), Value::String(key));
                    entry.insert("value".to_string(), value);
                    Value::Object(entry)
                })
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

/// Normalize and validate a key/value list.
pub fn key_values(value: Value) -> Result<Vec<KeyValue>, serde_json::Error> {
    serde_json::from_value(normalize_obj_array(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_manifest_cardinality() {
        let manifest = TagManifest::default();

        for name in ["body", "json", "urlencoded", "formdata", "bodyMode", "test", "params", "headers"] {
            assert!(manifest.get(name).unwrap().single, "{} should be single", name);
        }
        assert!(!manifest.get("example").unwrap().single);
        assert!(manifest.get("prerequest").is_none());
        assert_eq!(manifest.len(), 9);
    }

    #[test]
    fn test_key_values_from_object_keeps_order() {
        let value = format_key_values(r#"{"X-Zeta": "1", "Accept": "text/html"}"#).unwrap();
        assert_eq!(
            value,
            json!([
                {"key": "X-Zeta", "value": "1"},
                {"key": "Accept", "value": "text/html"}
            ])
        );
    }

    #[test]
    fn test_key_values_keeps_lists_with_descriptions() {
        let value = format_key_values(
            r#"[{"key": "force", "value": "true", "description": "Ignore the cache"}]"#,
        )
        .unwrap();
        assert_eq!(value[0]["description"], json!("Ignore the cache"));
    }

    #[test]
    fn test_key_values_rejects_invalid_json() {
        assert!(format_key_values("{ not json").is_err());
        assert!(format_key_values(r#"[{"value": "missing key"}]"#).is_err());
    }

    #[test]
    fn test_with_replaces_existing_rule() {
        let manifest = TagManifest::default().with(TagSpec::multiple("body"));
        assert!(!manifest.get("body").unwrap().single);
        assert_eq!(manifest.len(), 9);
    }
}
