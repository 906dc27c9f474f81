//! Declarative Loader.
//!
//! Produces the structured [`RouteModule`] view of a route file. The host decides how modules
//! are resolved through the [`ModuleLoader`] trait; the default [`StaticModuleLoader`] never runs
//! code, it evaluates the literal exported by `module.exports = { ... }` (or `exports = ...`)
//! and records `require(...)` bindings so middleware references can be located afterwards.

use crate::error::{Error, Result};
use crate::parser::{node_text, parse_tree, property_key, unquote};
use crate::route::{DeclaredRoute, HttpMethod, Import, MethodEntry, MiddlewareRef, RouteModule};
use indexmap::IndexMap;
use log::debug;
use std::path::Path;
use tree_sitter::Node;

/// Resolves the declarative content of a route file.
pub trait ModuleLoader: Send + Sync {
    /// Loads the route table declared by the file at `path` whose text is `source`.
    fn load(&self, path: &Path, source: &str) -> Result<RouteModule>;
}

/// Loader that statically evaluates the exported object literal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticModuleLoader;

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, path: &Path, source: &str) -> Result<RouteModule> {
        debug!("Loading route declarations from {}", path.display());

        let tree = parse_tree(path, source)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(Error::Load {
                file: path.to_path_buf(),
                message: "invalid JavaScript syntax".to_string(),
            });
        }

        let mut imports = IndexMap::new();
        let mut exported = None;

        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            match statement.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    collect_imports(statement, source, &mut imports);
                }
                "expression_statement" if exported.is_none() => {
                    exported = exported_object(statement, source);
                }
                _ => {}
            }
        }

        let mut module = match exported {
            Some(Literal::Object(fields)) => module_from_literal(fields),
            _ => {
                debug!("{} exports no route table", path.display());
                RouteModule::default()
            }
        };
        module.imports = imports;

        debug!(
            "Loaded {} routes ({} methods) from {}",
            module.routes.len(),
            module.method_count(),
            path.display()
        );
        Ok(module)
    }
}

/// Statically evaluated JavaScript value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Literal>),
    Object(IndexMap<String, Literal>),
    /// An identifier or member expression such as `ctrls.list`
    Reference(String),
    /// A function or arrow function written in place
    Function {
        name: Option<String>,
        line: usize,
        column: usize,
    },
    /// Anything else (calls, template substitutions, operators)
    Opaque,
}

impl Literal {
    fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    fn string_list(&self) -> Vec<String> {
        match self {
            Literal::Array(items) => items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect(),
            Literal::Str(s) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// Evaluate an expression node.
pub fn evaluate(node: Node<'_>, source: &str) -> Literal {
    match node.kind() {
        "string" | "template_string" => {
            let mut cursor = node.walk();
            let has_substitution = node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution");
            if has_substitution {
                Literal::Opaque
            } else {
                Literal::Str(unquote(node_text(node, source)))
            }
        }
        "number" => node_text(node, source)
            .parse::<f64>()
            .map(Literal::Number)
            .unwrap_or(Literal::Opaque),
        "true" => Literal::Bool(true),
        "false" => Literal::Bool(false),
        "null" | "undefined" => Literal::Null,
        "identifier" | "member_expression" => {
            Literal::Reference(node_text(node, source).to_string())
        }
        "parenthesized_expression" => node
            .named_child(0)
            .map(|inner| evaluate(inner, source))
            .unwrap_or(Literal::Opaque),
        "array" => {
            let mut cursor = node.walk();
            let items = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .map(|c| evaluate(c, source))
                .collect();
            Literal::Array(items)
        }
        "object" => {
            let mut fields = IndexMap::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "pair" => {
                        let key = child
                            .child_by_field_name("key")
                            .and_then(|k| property_key(k, source));
                        let value = child.child_by_field_name("value");
                        if let (Some(key), Some(value)) = (key, value) {
                            fields.insert(key, evaluate(value, source));
                        }
                    }
                    "shorthand_property_identifier" => {
                        let name = node_text(child, source).to_string();
                        fields.insert(name.clone(), Literal::Reference(name));
                    }
                    "method_definition" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            let name = node_text(name, source).to_string();
                            fields.insert(name.clone(), function_literal(child, Some(name)));
                        }
                    }
                    _ => {}
                }
            }
            Literal::Object(fields)
        }
        "function_expression" | "function" | "arrow_function" | "generator_function" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string());
            function_literal(node, name)
        }
        _ => Literal::Opaque,
    }
}

fn function_literal(node: Node<'_>, name: Option<String>) -> Literal {
    let position = node.start_position();
    Literal::Function {
        name,
        line: position.row + 1,
        column: position.column + 1,
    }
}

/// `module.exports = <object>` / `exports = <object>`
fn exported_object(statement: Node<'_>, source: &str) -> Option<Literal> {
    let expression = statement.named_child(0)?;
    if expression.kind() != "assignment_expression" {
        return None;
    }
    let left = expression.child_by_field_name("left")?;
    let target = node_text(left, source);
    if target != "module.exports" && target != "exports" {
        return None;
    }
    let right = expression.child_by_field_name("right")?;
    Some(evaluate(right, source))
}

/// Record `const x = require('...')` and `const { a, b: c } = require('...')` bindings.
fn collect_imports(declaration: Node<'_>, source: &str, imports: &mut IndexMap<String, Import>) {
    let mut cursor = declaration.walk();
    for declarator in declaration.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let (Some(name), Some(value)) = (
            declarator.child_by_field_name("name"),
            declarator.child_by_field_name("value"),
        ) else {
            continue;
        };
        let Some(specifier) = require_specifier(value, source) else {
            continue;
        };

        match name.kind() {
            "identifier" => {
                imports.insert(
                    node_text(name, source).to_string(),
                    Import {
                        specifier,
                        member: None,
                    },
                );
            }
            "object_pattern" => {
                let mut inner = name.walk();
                for property in name.named_children(&mut inner) {
                    match property.kind() {
                        "shorthand_property_identifier_pattern" => {
                            let member = node_text(property, source).to_string();
                            imports.insert(
                                member.clone(),
                                Import {
                                    specifier: specifier.clone(),
                                    member: Some(member),
                                },
                            );
                        }
                        "pair_pattern" => {
                            let key = property
                                .child_by_field_name("key")
                                .and_then(|k| property_key(k, source));
                            let local = property
                                .child_by_field_name("value")
                                .filter(|v| v.kind() == "identifier")
                                .map(|v| node_text(v, source).to_string());
                            if let (Some(member), Some(local)) = (key, local) {
                                imports.insert(
                                    local,
                                    Import {
                                        specifier: specifier.clone(),
                                        member: Some(member),
                                    },
                                );
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

/// `require('<literal>')` → the literal
fn require_specifier(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "call_expression" {
        return None;
    }
    let function = node.child_by_field_name("function")?;
    if node_text(function, source) != "require" {
        return None;
    }
    let arguments = node.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    match evaluate(first, source) {
        Literal::Str(specifier) => Some(specifier),
        _ => None,
    }
}

fn module_from_literal(fields: IndexMap<String, Literal>) -> RouteModule {
    let prefix = fields
        .get("prefix")
        .and_then(Literal::as_str)
        .unwrap_or_default()
        .to_string();
    let is_global = matches!(fields.get("is_global"), Some(Literal::Bool(true)));

    let routes = match fields.get("routes") {
        Some(Literal::Array(items)) => items.iter().filter_map(route_from_literal).collect(),
        _ => Vec::new(),
    };

    RouteModule {
        prefix,
        is_global,
        routes,
        imports: IndexMap::new(),
    }
}

fn route_from_literal(literal: &Literal) -> Option<DeclaredRoute> {
    let Literal::Object(fields) = literal else {
        return None;
    };
    let path = fields
        .get("path")
        .and_then(Literal::as_str)
        .unwrap_or_default()
        .to_string();

    let methods = match fields.get("methods") {
        Some(Literal::Object(methods)) => methods
            .iter()
            .filter_map(|(key, value)| {
                HttpMethod::from_key(key).map(|method| (method, entry_from_literal(value)))
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(DeclaredRoute { path, methods })
}

fn entry_from_literal(literal: &Literal) -> MethodEntry {
    let Literal::Object(fields) = literal else {
        return MethodEntry::default();
    };
    let text = |key: &str| fields.get(key).and_then(Literal::as_str).map(str::to_string);
    let list = |key: &str| fields.get(key).map(Literal::string_list).unwrap_or_default();

    let middlewares = match fields.get("middlewares") {
        Some(Literal::Array(items)) => items.iter().filter_map(middleware_from_literal).collect(),
        _ => Vec::new(),
    };

    MethodEntry {
        iam: text("iam"),
        title: text("title"),
        description: text("description"),
        groups: list("groups"),
        parents: list("parents"),
        middlewares,
        excluded: matches!(fields.get("excluded"), Some(Literal::Bool(true))),
    }
}

fn middleware_from_literal(literal: &Literal) -> Option<MiddlewareRef> {
    match literal {
        Literal::Reference(expression) => {
            let (object, name) = match expression.rsplit_once('.') {
                Some((object, name)) => (Some(object.to_string()), name.to_string()),
                None => (None, expression.clone()),
            };
            Some(MiddlewareRef::Named { object, name })
        }
        Literal::Function { name, line, column } => Some(MiddlewareRef::Inline {
            name: name.clone(),
            line: *line,
            column: *column,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IAM_FILE: &str = r#"const docCtrls = require('../controllers/postman-doc.server.controller');
const { checkKey, list: listAll } = require('../controllers/postman.server.controller');
const config = require(resolve('config'));

/** */
module.exports = {
  prefix: '/devtools/postman',
  routes: [
    {
      path: '/collections/:collectionId',
      methods: {
        put: {
          parents: ['modules:postman', 'modules:devtools'],
          iam: 'modules:devtools:postman:collections:sync',
          title: 'Synchronize postman collection',
          description: "Will put the \"latest\" documentation",
          groups: 'admin',
          middlewares: [checkKey, docCtrls.cache, (req, res) => res.json(true)],
        },
        patch: { iam: 'ignored' },
        get: { iam: 'read', excluded: true },
      },
    },
  ],
};
"#;

    #[test]
    fn test_load_route_table() {
        let module = StaticModuleLoader
            .load(Path::new("postman.server.iam.js"), IAM_FILE)
            .unwrap();

        assert_eq!(module.prefix, "/devtools/postman");
        assert!(!module.is_global);
        assert_eq!(module.routes.len(), 1);

        let route = &module.routes[0];
        assert_eq!(route.path, "/collections/:collectionId");
        let verbs: Vec<_> = route.methods.iter().map(|(m, _)| *m).collect();
        assert_eq!(verbs, vec![HttpMethod::Put, HttpMethod::Get]);

        let (_, put) = &route.methods[0];
        assert_eq!(put.iam.as_deref(), Some("modules:devtools:postman:collections:sync"));
        assert_eq!(put.title.as_deref(), Some("Synchronize postman collection"));
        assert_eq!(put.description.as_deref(), Some("Will put the \"latest\" documentation"));
        assert_eq!(put.parents, vec!["modules:postman", "modules:devtools"]);
        assert_eq!(put.groups, vec!["admin"]);
        assert!(!put.excluded);
        assert_eq!(put.middlewares.len(), 3);
        assert_eq!(
            put.middlewares[1],
            MiddlewareRef::Named {
                object: Some("docCtrls".to_string()),
                name: "cache".to_string(),
            }
        );
        assert!(matches!(
            put.middlewares[2],
            MiddlewareRef::Inline { name: None, line: 18, .. }
        ));

        assert!(route.methods[1].1.excluded);
    }

    #[test]
    fn test_load_collects_require_bindings() {
        let module = StaticModuleLoader.load(Path::new("a.js"), IAM_FILE).unwrap();

        assert_eq!(module.imports.len(), 3);
        assert_eq!(
            module.imports["docCtrls"],
            Import {
                specifier: "../controllers/postman-doc.server.controller".to_string(),
                member: None,
            }
        );
        assert_eq!(module.imports["listAll"].member.as_deref(), Some("list"));
        assert_eq!(module.imports["checkKey"].member.as_deref(), Some("checkKey"));
        assert!(!module.imports.contains_key("config"));
    }

    #[test]
    fn test_load_global_module_and_missing_prefix() {
        let code = "module.exports = { is_global: true, routes: [{ path: '/health', methods: { get: {} } }] };";
        let module = StaticModuleLoader.load(Path::new("a.js"), code).unwrap();
        assert!(module.is_global);
        assert_eq!(module.prefix, "");
        assert_eq!(module.method_count(), 1);
    }

    #[test]
    fn test_load_file_without_routes() {
        let module = StaticModuleLoader
            .load(Path::new("a.js"), "exports.ok = (req, res) => res.json(true);")
            .unwrap();
        assert!(module.routes.is_empty());
    }

    #[test]
    fn test_load_rejects_invalid_syntax() {
        let result = StaticModuleLoader.load(Path::new("a.js"), "module.exports = {");
        assert!(matches!(result, Err(Error::Load { .. })));
    }
}
