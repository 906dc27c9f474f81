//! Tag Extractor: turns a block comment into a [`TagSet`].
//!
//! A comment body is a sequence of `@tag <content>` segments. A segment starts at an `@` that
//! opens the text or follows whitespace, and runs until the next segment or the end of the
//! comment. Known tags follow the [`TagManifest`]; unknown tags accumulate raw text.
//!
//! # Example
//!
//! ```
//! use postman_from_source::tags::{TagExtractor, TagManifest};
//! use postman_from_source::parser::Comment;
//!
//! let manifest = TagManifest::default();
//! let extractor = TagExtractor::new(&manifest);
//! let comment = Comment {
//!     text: "*\n * @headers {\"Accept\": \"text/html\"}\n * @prerequest console.log(1)\n ".to_string(),
//!     start_line: 1,
//!     end_line: 4,
//!     start_byte: 0,
//! };
//! let mut diagnostics = Vec::new();
//! let tags = extractor.extract(&comment, "users.server.iam.js", &mut diagnostics);
//! assert_eq!(tags.key_values("headers").unwrap()[0].key, "Accept");
//! assert_eq!(tags.texts("prerequest"), vec!["console.log(1)"]);
//! ```

pub mod manifest;

pub use manifest::{TagManifest, TagSpec};

use crate::collection::KeyValue;
use crate::error::Diagnostic;
use crate::parser::Comment;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// `@name` at the start of the text or after whitespace. This applies inside tag content too:
/// JSON strings spell a literal ` @` as `\u0040`.
static TAG_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)@(\w+)").expect("valid tag regex"));

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"));

/// Stored value of one tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Single-valued tag, first occurrence
    One(Value),
    /// Multi-valued or unknown tag, every occurrence in order
    Many(Vec<Value>),
}

/// Tags of one comment, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet {
    tags: IndexMap<String, TagValue>,
}

impl TagSet {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Text of a single-valued tag.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.tags.get(name)? {
            TagValue::One(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Every value of a multi-valued tag (or the single value as a one-element list).
    pub fn values(&self, name: &str) -> Vec<&Value> {
        match self.tags.get(name) {
            Some(TagValue::One(value)) => vec![value],
            Some(TagValue::Many(values)) => values.iter().collect(),
            None => Vec::new(),
        }
    }

    /// Every textual value of a tag.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.values(name)
            .into_iter()
            .filter_map(Value::as_str)
            .collect()
    }

    /// A single-valued tag formatted as a key/value list (`headers`, `params`).
    pub fn key_values(&self, name: &str) -> Option<Vec<KeyValue>> {
        match self.tags.get(name)? {
            TagValue::One(value) => serde_json::from_value(value.clone()).ok(),
            TagValue::Many(_) => None,
        }
    }

    fn insert_one(&mut self, name: &str, value: Value) {
        self.tags.insert(name.to_string(), TagValue::One(value));
    }

    fn push(&mut self, name: &str, value: Value) {
        match self
            .tags
            .entry(name.to_string())
            .or_insert_with(|| TagValue::Many(Vec::new()))
        {
            TagValue::Many(values) => values.push(value),
            TagValue::One(_) => {}
        }
    }
}

/// A comment that carries at least one tag.
#[derive(Debug, Clone, PartialEq)]
pub struct DocComment {
    pub tags: TagSet,
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
}

/// Output of scanning every block comment of a file.
#[derive(Debug, Default)]
pub struct CommentScan {
    /// Comments with at least one tag, in source order
    pub comments: Vec<DocComment>,
    /// `{{identifier}}` keys in order of appearance, duplicates included
    pub placeholders: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extracts tags according to a manifest.
pub struct TagExtractor<'m> {
    manifest: &'m TagManifest,
}

impl<'m> TagExtractor<'m> {
    pub fn new(manifest: &'m TagManifest) -> Self {
        Self { manifest }
    }

    /// Scan all comments of a file: placeholders first, then tags.
    pub fn scan(&self, comments: &[Comment], file: &str) -> CommentScan {
        let mut scan = CommentScan::default();

        for comment in comments {
            scan.placeholders.extend(placeholders(&comment.text));

            let tags = self.extract(comment, file, &mut scan.diagnostics);
            if tags.is_empty() {
                continue;
            }
            scan.comments.push(DocComment {
                tags,
                start_line: comment.start_line,
                end_line: comment.end_line,
                start_byte: comment.start_byte,
            });
        }

        scan
    }

    /// Extract the tags of one comment, recording skipped occurrences in `diagnostics`.
    pub fn extract(&self, comment: &Comment, file: &str, diagnostics: &mut Vec<Diagnostic>) -> TagSet {
        let mut tags = TagSet::default();
        let body = unwrap_comment(&comment.text);

        for (name, content) in split_tags(&body) {
            let Some(spec) = self.manifest.get(&name) else {
                tags.push(&name, Value::String(content));
                continue;
            };

            if spec.single && tags.contains(&name) {
                let diagnostic = Diagnostic::TagCardinality {
                    tag: name,
                    file: file.to_string(),
                    line: comment.end_line,
                };
                diagnostic.log();
                diagnostics.push(diagnostic);
                continue;
            }

            let value = match spec.formatter {
                Some(formatter) => match formatter(&content) {
                    Ok(value) => value,
                    Err(e) => {
                        let diagnostic = Diagnostic::TagFormat {
                            tag: name,
                            file: file.to_string(),
                            line: comment.end_line,
                            message: e.to_string(),
                        };
                        diagnostic.log();
                        diagnostics.push(diagnostic);
                        continue;
                    }
                },
                None => Value::String(content),
            };

            if spec.single {
                tags.insert_one(&name, value);
            } else {
                tags.push(&name, value);
            }
        }

        tags
    }
}

/// Remove the leading `*` decoration of every comment line.
pub fn unwrap_comment(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix('*') {
                Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                None => trimmed,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split an unwrapped comment into `(tag, content)` segments; text before the first tag is
/// ignored.
pub fn split_tags(body: &str) -> Vec<(String, String)> {
    let starts: Vec<(usize, usize, String)> = TAG_START
        .captures_iter(body)
        .filter_map(|caps| {
            let name = caps.get(2)?;
            // the `@` sits right before the name
            Some((name.start() - 1, name.end(), name.as_str().to_string()))
        })
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, (_, content_start, name))| {
            let content_end = starts.get(i + 1).map(|s| s.0).unwrap_or(body.len());
            let content = body[*content_start..content_end].trim().to_string();
            (name.clone(), content)
        })
        .collect()
}

/// Every `{{identifier}}` key in `text`, in order.
pub fn placeholders(text: &str) -> impl Iterator<Item = String> + '_ {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment(body: &str) -> Comment {
        Comment {
            text: body.to_string(),
            start_line: 3,
            end_line: 9,
            start_byte: 0,
        }
    }

    fn extract(body: &str) -> (TagSet, Vec<Diagnostic>) {
        let manifest = TagManifest::default();
        let mut diagnostics = Vec::new();
        let tags = TagExtractor::new(&manifest).extract(&comment(body), "f.js", &mut diagnostics);
        (tags, diagnostics)
    }

    #[test]
    fn test_split_tags_inline_and_multiline() {
        let segments = split_tags("intro text\n@body {\"a\": 1}\n@test line one\nline two @bodyMode raw");
        assert_eq!(
            segments,
            vec![
                ("body".to_string(), "{\"a\": 1}".to_string()),
                ("test".to_string(), "line one\nline two".to_string()),
                ("bodyMode".to_string(), "raw".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_tags_ignores_email_addresses() {
        let segments = split_tags("@body contact admin@example.com please");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].1, "contact admin@example.com please");
    }

    #[test]
    fn test_at_sign_after_whitespace_starts_a_tag_in_json() {
        let segments = split_tags(r#"@headers {"X-Contact": "ask @admin"}"#);
        assert_eq!(
            segments,
            vec![
                ("headers".to_string(), r#"{"X-Contact": "ask"#.to_string()),
                ("admin".to_string(), r#""}"#.to_string()),
            ]
        );

        let (tags, diagnostics) = extract(r#"* @headers {"X-Contact": "ask @admin"}"#);
        assert!(!tags.contains("headers"));
        assert!(matches!(&diagnostics[0], Diagnostic::TagFormat { tag, .. } if tag == "headers"));
    }

    #[test]
    fn test_escaped_at_sign_stays_in_json() {
        let (tags, diagnostics) = extract(r#"* @headers {"X-Contact": "ask \u0040admin"}"#);
        assert!(diagnostics.is_empty());
        assert_eq!(tags.key_values("headers").unwrap()[0].value, json!("ask @admin"));
    }

    #[test]
    fn test_unwrap_comment_strips_decoration() {
        let text = "*\n   * @test\n   *   indented();\n   ";
        assert_eq!(unwrap_comment(text), "\n@test\n  indented();\n");
    }

    #[test]
    fn test_repeated_single_tag_keeps_first() {
        let (tags, diagnostics) = extract("* @body {\"first\": true}\n * @body {\"second\": true}");

        assert_eq!(tags.text("body"), Some("{\"first\": true}"));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0],
            Diagnostic::TagCardinality { tag, line: 9, .. } if tag == "body"
        ));
    }

    #[test]
    fn test_formatter_failure_drops_only_that_occurrence() {
        let (tags, diagnostics) =
            extract("* @headers {broken\n * @params {\"page\": 1}\n * @headers {\"Accept\": \"*/*\"}");

        // the broken first occurrence does not count towards cardinality
        assert_eq!(tags.key_values("headers").unwrap()[0].key, "Accept");
        assert_eq!(tags.key_values("params").unwrap()[0].value, json!(1));
        assert!(matches!(&diagnostics[0], Diagnostic::TagFormat { tag, .. } if tag == "headers"));
    }

    #[test]
    fn test_unknown_tags_accumulate_in_order() {
        let (tags, diagnostics) = extract("* @prerequest a()\n * @group users\n * @prerequest b()");

        assert!(diagnostics.is_empty());
        assert_eq!(tags.texts("prerequest"), vec!["a()", "b()"]);
        assert_eq!(tags.names().collect::<Vec<_>>(), vec!["prerequest", "group"]);
    }

    #[test]
    fn test_example_is_multi_valued() {
        let (tags, _) = extract(
            "* @example {\"response\": {\"status\": 404}}\n * @example {\"name\": \"ok\", \"response\": {}}",
        );
        let values = tags.values("example");
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["name"], json!("ok"));
    }

    #[test]
    fn test_scan_skips_comments_without_tags_but_collects_placeholders() {
        let manifest = TagManifest::default();
        let comments = vec![
            comment("* uses {{token}} only"),
            comment("* @params {\"id\": \"{{userId}}\"} {{token}}"),
        ];

        let scan = TagExtractor::new(&manifest).scan(&comments, "f.js");

        assert_eq!(scan.comments.len(), 1);
        assert_eq!(scan.placeholders, vec!["token", "userId", "token"]);
    }

    #[test]
    fn test_placeholders_require_identifier() {
        let keys: Vec<_> = placeholders("{{}} {{a-b}} {{ok_1}}").collect();
        assert_eq!(keys, vec!["ok_1"]);
    }
}
