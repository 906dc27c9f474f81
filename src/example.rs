//! Example Synthesizer: expands `@example` tags into saved response examples.
//!
//! An example tag carries `{name?, request?, response?}` as JSON. [`ExampleSpec::from_tag`]
//! normalizes it once at extraction time; [`synthesize`] later combines it with the base
//! request of the method it documents.

use crate::collection::{has_content_type, Body, KeyValue, OriginalRequest, RequestItem, ResponseExample};
use crate::tags::manifest::key_values;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status used when an example omits `response.status`
pub const DEFAULT_STATUS: u16 = 200;

/// A normalized `@example` occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ExampleRequest>,
    #[serde(default)]
    pub response: ExampleResponse,
}

/// Request override of an example. Absent fields fall back to the base request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<KeyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<KeyValue>>,
}

/// Response half of an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Default for ExampleResponse {
    fn default() -> Self {
        Self {
            status: DEFAULT_STATUS,
            headers: vec![KeyValue::json_content_type()],
            body: None,
        }
    }
}

fn default_status() -> u16 {
    DEFAULT_STATUS
}

/// Example as written by the author, before normalization.
#[derive(Deserialize)]
struct RawExample {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    request: Option<RawMessage>,
    #[serde(default)]
    response: Option<RawMessage>,
}

#[derive(Deserialize, Default)]
struct RawMessage {
    #[serde(default, alias = "header")]
    headers: Option<Value>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
}

impl ExampleSpec {
    /// Parse and normalize the JSON content of one `@example` tag.
    ///
    /// - bodies become pretty-printed strings (a string holding JSON is re-printed, any other
    ///   string is kept verbatim)
    /// - header and param objects become `{key, value}` lists
    /// - response headers always carry a content-type, defaulting to `application/json`
    /// - the response status defaults to 200; it may be given as a number or a numeric string
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not JSON or a header/param list is malformed.
    pub fn from_tag(content: &str) -> Result<Self, serde_json::Error> {
        let raw: RawExample = serde_json::from_str(content)?;

        let request = match raw.request {
            Some(message) => Some(ExampleRequest {
                headers: message.headers.map(normalize_headers).transpose()?,
                body: message.body.and_then(stringify_body),
                params: message.params.map(key_values).transpose()?,
            }),
            None => None,
        };

        let response = match raw.response {
            Some(message) => ExampleResponse {
                status: message
                    .status
                    .as_ref()
                    .and_then(status_code)
                    .unwrap_or(DEFAULT_STATUS),
                headers: normalize_headers(message.headers.unwrap_or(Value::Null))?,
                body: message.body.and_then(stringify_body),
            },
            None => ExampleResponse::default(),
        };

        Ok(Self {
            name: raw.name,
            request,
            response,
        })
    }
}

/// Key/value list with a default `Content-Type: application/json` entry.
fn normalize_headers(value: Value) -> Result<Vec<KeyValue>, serde_json::Error> {
    let mut headers = key_values(value)?;
    if !has_content_type(&headers) {
        headers.push(KeyValue::json_content_type());
    }
    Ok(headers)
}

fn stringify_body(body: Value) -> Option<String> {
    match body {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(json @ (Value::Object(_) | Value::Array(_))) => {
                Some(serde_json::to_string_pretty(&json).unwrap_or(text))
            }
            _ => Some(text),
        },
        other => serde_json::to_string_pretty(&other).ok(),
    }
}

fn status_code(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reason phrase for a status code, `None` for codes outside the standard table.
pub fn status_label(code: u16) -> Option<String> {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(str::to_string)
}

/// Build one response example per spec, each with its own request snapshot.
pub fn synthesize(base: &RequestItem, examples: &[ExampleSpec]) -> Vec<ResponseExample> {
    examples
        .iter()
        .map(|example| {
            let request = example.request.clone().unwrap_or_default();

            let mut url = base.request.url.clone();
            if let Some(params) = request.params {
                url.query = params;
            }

            ResponseExample {
                name: example
                    .name
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                original_request: OriginalRequest {
                    name: base.name.clone(),
                    method: base.request.method,
                    header: request
                        .headers
                        .unwrap_or_else(|| base.request.header.clone()),
                    body: match request.body {
                        Some(raw) => Some(Body::raw(raw)),
                        None => base.request.body.clone(),
                    },
                    url,
                },
                code: example.response.status,
                status: status_label(example.response.status),
                header: example.response.headers.clone(),
                preview_language: "json".to_string(),
                body: example.response.body.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Request, Url};
    use crate::route::HttpMethod;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn base_request() -> RequestItem {
        RequestItem {
            name: "Create user".to_string(),
            event: vec![],
            request: Request {
                method: HttpMethod::Post,
                description: String::new(),
                header: vec![KeyValue::new("X-Base", "1")],
                body: Some(Body::raw("{}")),
                url: Url {
                    host: vec!["{{host}}{{prefix}}".to_string()],
                    path: vec!["users".to_string()],
                    query: vec![KeyValue::new("page", "1")],
                },
            },
            response: vec![],
            excluded: false,
        }
    }

    #[test]
    fn test_created_example_with_pretty_request_body() {
        let spec = ExampleSpec::from_tag(
            r#"{"request":{"body":"{\"a\":1}"},"response":{"status":201,"body":{"ok":true}}}"#,
        )
        .unwrap();

        let examples = synthesize(&base_request(), &[spec]);

        assert_eq!(examples.len(), 1);
        let example = &examples[0];
        assert_eq!(example.code, 201);
        assert_eq!(example.status.as_deref(), Some("Created"));
        assert_eq!(
            example.original_request.body,
            Some(Body::raw("{\n  \"a\": 1\n}"))
        );
        assert_eq!(example.body.as_deref(), Some("{\n  \"ok\": true\n}"));
        assert_eq!(example.preview_language, "json");
    }

    #[test]
    fn test_missing_status_defaults_to_ok() {
        let spec = ExampleSpec::from_tag(r#"{"response": {"body": "plain text"}}"#).unwrap();
        assert_eq!(spec.response.status, 200);
        assert_eq!(spec.response.body.as_deref(), Some("plain text"));
        assert_eq!(spec.response.headers, vec![KeyValue::json_content_type()]);

        let examples = synthesize(&base_request(), &[spec]);
        assert_eq!(examples[0].status.as_deref(), Some("OK"));
    }

    #[test]
    fn test_string_status_is_accepted() {
        let spec = ExampleSpec::from_tag(r#"{"response": {"status": "404"}}"#).unwrap();
        assert_eq!(spec.response.status, 404);
        assert_eq!(status_label(404).as_deref(), Some("Not Found"));
    }

    #[test]
    fn test_absent_request_override_uses_base_values() {
        let spec = ExampleSpec::from_tag(r#"{"name": "ok"}"#).unwrap();
        let base = base_request();

        let example = &synthesize(&base, &[spec])[0];

        assert_eq!(example.name, "ok");
        assert_eq!(example.original_request.name, "Create user");
        assert_eq!(example.original_request.header, base.request.header);
        assert_eq!(example.original_request.body, base.request.body);
        assert_eq!(example.original_request.url, base.request.url);
    }

    #[test]
    fn test_request_override_headers_and_params() {
        let spec = ExampleSpec::from_tag(
            r#"{"request": {"headers": {"Accept": "text/csv"}, "params": {"format": "csv"}}}"#,
        )
        .unwrap();

        let example = &synthesize(&base_request(), &[spec])[0];

        assert_eq!(
            example.original_request.header,
            vec![KeyValue::new("Accept", "text/csv"), KeyValue::json_content_type()]
        );
        assert_eq!(example.original_request.url.query, vec![KeyValue::new("format", "csv")]);
    }

    #[test]
    fn test_explicit_content_type_is_not_duplicated() {
        let spec = ExampleSpec::from_tag(
            r#"{"response": {"headers": [{"key": "content-type", "value": "text/html"}]}}"#,
        )
        .unwrap();
        assert_eq!(spec.response.headers.len(), 1);
        assert_eq!(spec.response.headers[0].value, json!("text/html"));
    }

    #[test]
    fn test_unnamed_examples_get_distinct_ids() {
        let spec = ExampleSpec::from_tag("{}").unwrap();
        let examples = synthesize(&base_request(), &[spec.clone(), spec]);
        assert_ne!(examples[0].name, examples[1].name);
    }

    #[test]
    fn test_invalid_example_content() {
        assert!(ExampleSpec::from_tag("not json").is_err());
        assert!(ExampleSpec::from_tag(r#"{"request": {"headers": [{"value": 1}]}}"#).is_err());
    }

    #[test]
    fn test_normalized_spec_survives_tag_storage() {
        let spec = ExampleSpec::from_tag(r#"{"name": "n", "response": {"status": 202}}"#).unwrap();
        let stored = serde_json::to_value(&spec).unwrap();
        let back: ExampleSpec = serde_json::from_value(stored).unwrap();
        assert_eq!(back, spec);
    }
}
