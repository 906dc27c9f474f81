//! Serialization of collections and environments to JSON or YAML.
//!
//! JSON is the format Postman imports; YAML is offered for review and diffs.

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a document to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use postman_from_source::environment::Environment;
/// use postman_from_source::serializer::serialize_yaml;
/// use std::collections::HashMap;
///
/// let environment = Environment::from_variables("Shop", "development", &[], &HashMap::new());
/// let yaml = serialize_yaml(&environment).unwrap();
/// assert!(yaml.contains("name: '[DEVELOPMENT] Shop'"));
/// ```
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize document to YAML")
}

/// Serializes a document to pretty-printed JSON, keeping field order.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize document to JSON")
}

/// Writes string content to a file, creating parent directories as needed and overwriting
/// any existing file.
///
/// # Arguments
///
/// * `content` - The string content to write
/// * `path` - The file path to write to
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// File name of a downloaded document: `<title><extension>`, with path separators and other
/// characters unsafe in file names replaced by `_`.
///
/// ```
/// use postman_from_source::serializer::attachment_filename;
///
/// assert_eq!(
///     attachment_filename("Billing/API", ".postman_collection.json"),
///     "Billing_API.postman_collection.json"
/// );
/// ```
pub fn attachment_filename(title: &str, extension: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.is_empty() { "api".to_string() } else { stem };
    format!("{}{}", stem, extension)
}
