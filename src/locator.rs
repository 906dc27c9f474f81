//! Method Locator: finds where each documented verb is declared in the source text.
//!
//! The declarative loader knows *what* a file declares but not *where*. The locator walks the
//! syntax tree of the same file and reports every `get`/`post`/`put`/`delete` key of every
//! `methods` table, in array order of routes then property order of verbs, which is the same
//! order the loader enumerates them in. The two are joined by ordinal position.

use crate::parser::{block_comment, property_key, ParsedSource};
use crate::route::HttpMethod;
use log::debug;
use tree_sitter::Node;

/// Declaration site of one documented verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPosition {
    pub method: HttpMethod,
    /// 1-indexed line of the verb key
    pub line: usize,
    /// Byte offset of the block comment directly preceding the verb's property, if any
    pub leading_comment: Option<usize>,
}

/// Locates verb declarations in a parsed route file.
pub struct MethodLocator;

impl MethodLocator {
    /// Returns the ordered verb positions of `parsed`, or an empty list when the file does not
    /// assign an object with a `routes` array.
    pub fn locate(parsed: &ParsedSource) -> Vec<MethodPosition> {
        let source = parsed.source.as_str();
        let root = parsed.tree.root_node();

        let Some(routes) = find_routes_array(root, source) else {
            debug!("No routes table found in {}", parsed.path.display());
            return Vec::new();
        };

        let mut positions = Vec::new();
        let mut cursor = routes.walk();
        for element in routes.named_children(&mut cursor) {
            if element.kind() != "object" {
                continue;
            }
            let Some(methods) = object_property(element, "methods", source) else {
                continue;
            };
            if methods.kind() != "object" {
                continue;
            }

            let mut inner = methods.walk();
            for pair in methods.named_children(&mut inner) {
                if pair.kind() != "pair" {
                    continue;
                }
                let Some(key) = pair.child_by_field_name("key") else {
                    continue;
                };
                let Some(method) = property_key(key, source).as_deref().and_then(HttpMethod::from_key)
                else {
                    continue;
                };
                positions.push(MethodPosition {
                    method,
                    line: key.start_position().row + 1,
                    leading_comment: leading_block_comment(pair, source),
                });
            }
        }

        debug!(
            "Located {} methods in {}",
            positions.len(),
            parsed.path.display()
        );
        positions
    }
}

/// First top-level `<target> = { ..., routes: [...] }` assignment.
fn find_routes_array<'t>(root: Node<'t>, source: &str) -> Option<Node<'t>> {
    let mut cursor = root.walk();
    let statements: Vec<Node<'t>> = root
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "expression_statement")
        .collect();

    statements.into_iter().find_map(|statement| {
        let expression = statement.named_child(0)?;
        if expression.kind() != "assignment_expression" {
            return None;
        }
        let right = expression.child_by_field_name("right")?;
        if right.kind() != "object" {
            return None;
        }
        object_property(right, "routes", source).filter(|n| n.kind() == "array")
    })
}

/// Value node of the property `name` of an object literal.
pub(crate) fn object_property<'t>(object: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    let mut cursor = object.walk();
    let pairs: Vec<Node<'t>> = object.named_children(&mut cursor).collect();
    pairs.into_iter().find_map(|pair| {
        if pair.kind() != "pair" {
            return None;
        }
        let key = pair.child_by_field_name("key")?;
        if property_key(key, source).as_deref() == Some(name) {
            pair.child_by_field_name("value")
        } else {
            None
        }
    })
}

/// The nearest block comment among the comments immediately preceding `pair`.
fn leading_block_comment(pair: Node<'_>, source: &str) -> Option<usize> {
    let mut sibling = pair.prev_named_sibling();
    while let Some(node) = sibling {
        if node.kind() != "comment" {
            return None;
        }
        if let Some(comment) = block_comment(node, source) {
            return Some(comment.start_byte);
        }
        // line comments between the doc block and the key are skipped
        sibling = node.prev_named_sibling();
    }
    None
}
