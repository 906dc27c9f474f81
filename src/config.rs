//! Generator configuration, read from a YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid configuration:
//!
//! ```yaml
//! app:
//!   title: Billing API
//!   prefix: /api/v1
//!   host: http://localhost:3000
//! repository:
//!   kind: github
//!   link: https://github.com/acme/billing/blob/main
//! postman:
//!   key: PMAK-...
//! add_excluded: false
//! excluded_iams: ["modules:devtools:*"]
//! cache_dir: .cache
//! ```

use crate::correlator::CommentAttachment;
use crate::error::{Error, Result};
use crate::links::{RepositoryKind, RepositoryLinker};
use crate::scanner::DEFAULT_SUFFIX;
use crate::sync::POSTMAN_API_URL;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocConfig {
    pub app: AppConfig,
    pub repository: RepositoryConfig,
    pub postman: PostmanConfig,
    /// Keep excluded requests in the collection, flagged `[EXCLUDED]`
    pub add_excluded: bool,
    /// IAM keys (exact, or prefix ending in `*`) treated as excluded
    pub excluded_iams: Vec<String>,
    /// Suffix of route-definition files
    pub iam_suffix: String,
    /// Directory of cached collections, relative to the project root
    pub cache_dir: PathBuf,
    /// JSON object of placeholder default values, relative to the project root
    pub variables_file: Option<PathBuf>,
    pub comment_attachment: CommentAttachment,
    /// Deployment name shown in exported environments (`[DEVELOPMENT] title`)
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub description: String,
    pub prefix: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Browse URL of the repository; links are disabled when empty (except for `local`)
    pub link: String,
    pub kind: Option<RepositoryKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostmanConfig {
    pub key: Option<String>,
    pub base_url: String,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            repository: RepositoryConfig::default(),
            postman: PostmanConfig::default(),
            add_excluded: false,
            excluded_iams: Vec::new(),
            iam_suffix: DEFAULT_SUFFIX.to_string(),
            cache_dir: PathBuf::from(".cache"),
            variables_file: None,
            comment_attachment: CommentAttachment::default(),
            environment: "development".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            description: String::new(),
            prefix: "/api/v1".to_string(),
            host: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for PostmanConfig {
    fn default() -> Self {
        Self {
            key: None,
            base_url: POSTMAN_API_URL.to_string(),
        }
    }
}

impl DocConfig {
    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML for this structure.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.iam_suffix.is_empty() {
            return Err(Error::Config("iam_suffix must not be empty".to_string()));
        }
        if !self.app.prefix.is_empty() && !self.app.prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "app.prefix must start with '/', got {:?}",
                self.app.prefix
            )));
        }
        Ok(())
    }

    /// Link builder for the configured repository, if links are enabled.
    pub fn linker(&self) -> Option<RepositoryLinker> {
        let kind = self.repository.kind?;
        if kind == RepositoryKind::Unsupported {
            return None;
        }
        if self.repository.link.is_empty() && kind != RepositoryKind::Local {
            return None;
        }
        Some(RepositoryLinker::new(kind, self.repository.link.clone()))
    }

    /// Placeholder defaults read from `variables_file` under `root`.
    ///
    /// Non-string values are stored as their JSON text.
    pub fn variable_presets(&self, root: &Path) -> Result<HashMap<String, String>> {
        let Some(file) = &self.variables_file else {
            return Ok(HashMap::new());
        };
        let content = fs::read_to_string(root.join(file))?;
        let values: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;

        Ok(values
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect())
    }

    /// Settings that change the generated document, hashed into the cache key.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{:?}\n{:?}\n{}\n{:?}\n{}\n{:?}",
            self.app.title,
            self.app.description,
            self.app.prefix,
            self.app.host,
            self.add_excluded,
            self.excluded_iams,
            self.comment_attachment,
            self.iam_suffix,
            self.repository.kind,
            self.repository.link,
            self.variables_file,
        )
    }
}
