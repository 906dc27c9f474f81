//! Declarative route model.
//!
//! A route-definition (IAM) file exports an object of the shape
//!
//! ```text
//! module.exports = {
//!   prefix: '/users',
//!   routes: [
//!     { path: '/:id', methods: { get: { iam, title, description, parents, middlewares } } },
//!   ],
//! };
//! ```
//!
//! The types in this module are the structured view of that object as produced by a
//! [`ModuleLoader`](crate::loader::ModuleLoader). They never hold executable code: middleware
//! entries are kept as references so their declaration can be located later.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods that are documented.
///
/// Any other key found in a `methods` table is ignored by both the loader and the locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
}

impl HttpMethod {
    /// Parse a lower-case `methods` key (`get`, `post`, `put`, `delete`).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a request with this method carries a JSON body by default.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured content of one route-definition file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteModule {
    /// Prefix prepended to every route path
    pub prefix: String,
    /// Global modules are mounted at the host root, without the application prefix
    pub is_global: bool,
    /// Declared routes in array order
    pub routes: Vec<DeclaredRoute>,
    /// `require(...)` bindings of the file, keyed by local name
    pub imports: IndexMap<String, Import>,
}

impl RouteModule {
    /// Iterate every declared method entry in declaration order, paired with its route.
    pub fn methods(&self) -> impl Iterator<Item = (&DeclaredRoute, HttpMethod, &MethodEntry)> {
        self.routes.iter().flat_map(|route| {
            route
                .methods
                .iter()
                .map(move |(method, entry)| (route, *method, entry))
        })
    }

    /// Total number of declared method entries.
    pub fn method_count(&self) -> usize {
        self.routes.iter().map(|r| r.methods.len()).sum()
    }
}

/// One element of the `routes` array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclaredRoute {
    /// URL path relative to the module prefix (e.g. `/:id([0-9]+)/edit`)
    pub path: String,
    /// Documented methods in property order
    pub methods: Vec<(HttpMethod, MethodEntry)>,
}

/// Metadata of a single verb on a single path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodEntry {
    pub iam: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub groups: Vec<String>,
    pub parents: Vec<String>,
    pub middlewares: Vec<MiddlewareRef>,
    /// Explicit `excluded: true` in the declaration
    pub excluded: bool,
}

/// A reference to a middleware function, never the function itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareRef {
    /// `ctrls.checkKey` (`object` = `ctrls`) or a bare identifier such as `checkKey`
    Named { object: Option<String>, name: String },
    /// A function written inline in the table
    Inline { name: Option<String>, line: usize, column: usize },
}

impl MiddlewareRef {
    /// Name shown in the request description.
    pub fn display_name(&self) -> &str {
        match self {
            MiddlewareRef::Named { name, .. } => name,
            MiddlewareRef::Inline { name: Some(name), .. } => name,
            MiddlewareRef::Inline { name: None, .. } => "anonymous",
        }
    }

    /// Source expression, used in diagnostics
    pub fn expression(&self) -> String {
        match self {
            MiddlewareRef::Named {
                object: Some(object),
                name,
            } => format!("{}.{}", object, name),
            MiddlewareRef::Named { object: None, name } => name.clone(),
            MiddlewareRef::Inline { line, .. } => format!("<inline function at line {}>", line),
        }
    }
}

/// A `require(...)` binding.
///
/// `const ctrls = require('../controllers/x')` yields `{ specifier, member: None }` under
/// `ctrls`; `const { list: listAll } = require('./x')` yields `{ specifier, member: Some("list") }`
/// under `listAll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub specifier: String,
    pub member: Option<String>,
}
