//! Postman Collection v2.1 document types.
//!
//! Only the subset of the schema that the generator emits is modelled. Every type
//! deserializes as well, so a cached collection can be read back.

use crate::route::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema URL written into `info.schema`
pub const SCHEMA_URL: &str = "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Complete collection document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub info: Info,
    #[serde(default)]
    pub variable: Vec<Variable>,
    #[serde(default)]
    pub item: Vec<TypeFolder>,
}

/// Collection info block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(rename = "_postman_id")]
    pub id: String,
    pub name: String,
    pub schema: String,
    #[serde(default)]
    pub description: String,
}

/// A collection variable (`{{key}}` placeholder)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default = "default_variable_type")]
    pub kind: String,
}

fn default_variable_type() -> String {
    "string".to_string()
}

/// A named folder of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Folder<T> {
    pub name: String,
    #[serde(default)]
    pub item: Vec<T>,
}

impl<T> Folder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item: Vec::new(),
        }
    }
}

/// Leaf folder: one route file
pub type LeafFolder = Folder<RequestItem>;
/// Module folder: groups leaves of one module
pub type ModuleFolder = Folder<LeafFolder>;
/// Type folder: top level of the tree
pub type TypeFolder = Folder<ModuleFolder>;

/// One documented request (a single verb on a single path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    pub name: String,
    #[serde(default)]
    pub event: Vec<Event>,
    pub request: Request,
    #[serde(default)]
    pub response: Vec<ResponseExample>,
    /// Set by the exclusion policy, never serialized
    #[serde(skip)]
    pub excluded: bool,
}

/// Request definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: HttpMethod,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub header: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    pub url: Url,
}

/// Request body: `mode` plus the payload stored under the key named by the mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Structured payloads (`urlencoded`, `formdata`, `json`, ...)
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Body {
    pub fn raw(content: impl Into<String>) -> Self {
        Self {
            mode: "raw".to_string(),
            raw: Some(content.into()),
            payload: Map::new(),
        }
    }

    pub fn with_mode(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            raw: None,
            payload: Map::new(),
        }
    }
}

/// Structured URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Url {
    #[serde(default)]
    pub host: Vec<String>,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<KeyValue>,
}

/// Header or query entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
        }
    }

    /// The `Content-Type: application/json` header
    pub fn json_content_type() -> Self {
        Self::new("Content-Type", "application/json")
    }
}

/// Whether `headers` contains a `content-type` entry, compared case-insensitively.
pub fn has_content_type(headers: &[KeyValue]) -> bool {
    headers
        .iter()
        .any(|h| h.key.eq_ignore_ascii_case("content-type"))
}

/// Script event (`test` or `prerequest`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub listen: String,
    pub script: Script,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub exec: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Event {
    /// A JavaScript event with a freshly generated script id.
    pub fn script(listen: impl Into<String>, exec: Vec<String>) -> Self {
        Self {
            listen: listen.into(),
            script: Script {
                id: uuid::Uuid::new_v4().to_string(),
                exec,
                kind: "text/javascript".to_string(),
            },
        }
    }
}

/// Saved response example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseExample {
    pub name: String,
    #[serde(rename = "originalRequest")]
    pub original_request: OriginalRequest,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub header: Vec<KeyValue>,
    #[serde(rename = "_postman_previewlanguage", default)]
    pub preview_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Request snapshot attached to a response example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalRequest {
    pub name: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub header: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    pub url: Url,
}

impl Collection {
    /// Every request of the tree in hierarchy order.
    pub fn requests(&self) -> impl Iterator<Item = &RequestItem> {
        self.item
            .iter()
            .flat_map(|t| t.item.iter())
            .flat_map(|m| m.item.iter())
            .flat_map(|l| l.item.iter())
    }
}
