//! Source Parser: route files to tree-sitter syntax trees and their block comments.

use crate::error::{Error, Result};
use log::debug;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Syntax parser for JavaScript route-definition files.
///
/// The `SourceParser` uses tree-sitter to turn the text of a route file into a concrete syntax
/// tree. Besides the tree, it exposes every block comment of the file with its 1-indexed line
/// span, which is what the tag extractor and the correlator work from.
///
/// # Example
///
/// ```
/// use postman_from_source::parser::SourceParser;
/// use std::path::Path;
///
/// let code = "/** @title Users */\nmodule.exports = { routes: [] };\n";
/// let parsed = SourceParser::parse(Path::new("users.server.iam.js"), code).unwrap();
/// assert_eq!(parsed.comments.len(), 1);
/// ```
pub struct SourceParser;

/// A successfully parsed route file.
pub struct ParsedSource {
    /// Path to the source file
    pub path: PathBuf,
    /// Original text; tree nodes index into it
    pub source: String,
    /// The concrete syntax tree
    pub tree: Tree,
    /// Block comments in source order
    pub comments: Vec<Comment>,
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource")
            .field("path", &self.path)
            .field("comments", &self.comments.len())
            .finish()
    }
}

/// A `/* ... */` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment body without the `/*` and `*/` delimiters
    pub text: String,
    /// 1-indexed line of the opening delimiter
    pub start_line: usize,
    /// 1-indexed line of the closing delimiter
    pub end_line: usize,
    /// Byte offset of the opening delimiter, identifies the comment node
    pub start_byte: usize,
}

impl SourceParser {
    /// Parses route file text that has already been read.
    ///
    /// A tree that contains error or missing nodes is rejected: line numbers derived from a
    /// recovered tree are not trustworthy.
    pub fn parse(path: &Path, source: &str) -> Result<ParsedSource> {
        let tree = parse_tree(path, source)?;

        if tree.root_node().has_error() {
            return Err(Error::SourceParse {
                file: path.to_path_buf(),
                message: "invalid JavaScript syntax".to_string(),
            });
        }

        let mut comments = Vec::new();
        collect_comments(tree.root_node(), source, &mut comments);

        debug!(
            "Successfully parsed {} ({} block comments)",
            path.display(),
            comments.len()
        );

        Ok(ParsedSource {
            path: path.to_path_buf(),
            source: source.to_string(),
            tree,
            comments,
        })
    }
}

/// Run tree-sitter over `source` with the JavaScript grammar.
pub(crate) fn parse_tree(path: &Path, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    let language = tree_sitter_javascript::LANGUAGE;
    parser
        .set_language(&language.into())
        .map_err(|e| Error::SourceParse {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

    parser.parse(source, None).ok_or_else(|| Error::SourceParse {
        file: path.to_path_buf(),
        message: "parser produced no tree".to_string(),
    })
}

fn collect_comments(root: Node<'_>, source: &str, out: &mut Vec<Comment>) {
    let mut cursor = root.walk();
    let mut stack = vec![root];

    // Depth-first, children pushed in reverse so comments come out in source order
    while let Some(node) = stack.pop() {
        if node.kind() == "comment" {
            if let Some(comment) = block_comment(node, source) {
                out.push(comment);
            }
            continue;
        }
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

/// Build a [`Comment`] from a `comment` node, `None` for `//` line comments.
pub(crate) fn block_comment(node: Node<'_>, source: &str) -> Option<Comment> {
    let raw = source.get(node.start_byte()..node.end_byte())?;
    let inner = raw.strip_prefix("/*")?;
    let inner = inner.strip_suffix("*/").unwrap_or(inner);

    Some(Comment {
        text: inner.to_string(),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        start_byte: node.start_byte(),
    })
}

/// Text covered by `node`.
pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Name of an object key: bare identifiers, string literals and numbers.
pub(crate) fn property_key(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "property_identifier" | "identifier" | "number" => Some(node_text(node, source).to_string()),
        "string" => Some(unquote(node_text(node, source))),
        _ => None,
    }
}

/// Strip the quotes of a string literal and resolve the common escapes.
pub(crate) fn unquote(literal: &str) -> String {
    let inner = literal
        .strip_prefix(['"', '\'', '`'])
        .and_then(|s| s.strip_suffix(['"', '\'', '`']))
        .unwrap_or(literal);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collects_block_comments_with_lines() {
        let code = "// line comment\n/**\n * @body {}\n */\nmodule.exports = { routes: [] };\n/* tail */\n";
        let parsed = SourceParser::parse(Path::new("a.js"), code).unwrap();

        assert_eq!(parsed.comments.len(), 2);
        assert_eq!(parsed.comments[0].start_line, 2);
        assert_eq!(parsed.comments[0].end_line, 4);
        assert!(parsed.comments[0].text.contains("@body {}"));
        assert_eq!(parsed.comments[1].text, " tail ");
        assert_eq!(parsed.comments[1].start_line, 6);
    }

    #[test]
    fn test_parse_nested_comments_in_source_order() {
        let code = r#"module.exports = {
  routes: [{
    path: '/',
    methods: {
      /** first */
      get: {},
      /** second */
      post: {},
    },
  }],
};
"#;
        let parsed = SourceParser::parse(Path::new("a.js"), code).unwrap();
        let texts: Vec<_> = parsed.comments.iter().map(|c| c.text.trim()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(parsed.comments[1].end_line, 7);
    }

    #[test]
    fn test_parse_invalid_file() {
        let result = SourceParser::parse(Path::new("bad.js"), "module.exports = { routes: [ ;");
        assert!(matches!(result, Err(Error::SourceParse { .. })));
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote("'it\\'s'"), "it's");
        assert_eq!(unquote("\"a\\nb\""), "a\nb");
        assert_eq!(unquote("`tpl`"), "tpl");
    }
}
