//! Middleware source locator.
//!
//! Middlewares listed in a route table are never invoked. To document them, the locator finds
//! where each one is declared: inline functions point at themselves, named references are
//! followed through the file's `require(...)` bindings into the target module, which is then
//! searched textually for the exported name.

use crate::error::{Error, Result};
use crate::route::{MiddlewareRef, RouteModule};
use log::debug;
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Declaration site of a middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File declaring the middleware, as found on disk
    pub source: PathBuf,
    /// 1-indexed line
    pub line: usize,
    /// 1-indexed column
    pub column: usize,
}

/// Finds the declaration of a middleware referenced by a route file.
///
/// Lookups are independent of each other; a failure only affects the one middleware.
pub trait SourceLocator: Send + Sync {
    /// `file` is the on-disk path of the route file that references `middleware`.
    fn locate(&self, file: &Path, module: &RouteModule, middleware: &MiddlewareRef) -> Result<SourceLocation>;
}

/// Follows CommonJS `require` bindings with relative specifiers.
///
/// Package specifiers (`require('express')`) are not resolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireLocator;

impl SourceLocator for RequireLocator {
    fn locate(&self, file: &Path, module: &RouteModule, middleware: &MiddlewareRef) -> Result<SourceLocation> {
        let (object, name) = match middleware {
            MiddlewareRef::Inline { line, column, .. } => {
                return Ok(SourceLocation {
                    source: file.to_path_buf(),
                    line: *line,
                    column: *column,
                });
            }
            MiddlewareRef::Named { object, name } => (object.as_deref(), name.as_str()),
        };

        // `ctrls.list` → binding `ctrls`; a bare `list` may itself be a binding
        let binding = object.unwrap_or(name);
        let Some(import) = module.imports.get(binding) else {
            if object.is_some() {
                return Err(locate_error(middleware, format!("`{}` is not a require binding", binding)));
            }
            // defined in the route file itself
            let content = fs::read_to_string(file)?;
            return find_declaration(&content, name)
                .map(|(line, column)| SourceLocation {
                    source: file.to_path_buf(),
                    line,
                    column,
                })
                .ok_or_else(|| locate_error(middleware, "no declaration in the route file".to_string()));
        };

        if !import.specifier.starts_with('.') {
            return Err(locate_error(
                middleware,
                format!("`{}` is a package module", import.specifier),
            ));
        }

        let base = file.parent().unwrap_or_else(|| Path::new(""));
        let target = resolve_module(base, &import.specifier)
            .ok_or_else(|| locate_error(middleware, format!("cannot resolve `{}`", import.specifier)))?;
        debug!("Resolved {} to {}", middleware.expression(), target.display());

        let content = fs::read_to_string(&target)?;

        // `const { list } = require(...)` then `list`: the member is the exported name.
        // `const ctrls = require(...)` then `ctrls.list`: `list` is.
        // `const auth = require(...)` then `auth`: the module itself.
        let symbol = match (object, import.member.as_deref()) {
            (Some(_), _) => Some(name),
            (None, Some(member)) => Some(member),
            (None, None) => None,
        };

        let position = match symbol {
            Some(symbol) => find_declaration(&content, symbol),
            None => find_module_export(&content).or(Some((1, 1))),
        };

        position
            .map(|(line, column)| SourceLocation {
                source: target.clone(),
                line,
                column,
            })
            .ok_or_else(|| {
                locate_error(
                    middleware,
                    format!("no declaration found in {}", target.display()),
                )
            })
    }
}

fn locate_error(middleware: &MiddlewareRef, reason: String) -> Error {
    Error::Locate {
        reference: middleware.expression(),
        reason,
    }
}

/// Node-style resolution of a relative specifier: the file itself, `.js`, then `index.js`.
fn resolve_module(base: &Path, specifier: &str) -> Option<PathBuf> {
    let joined = normalize(&base.join(specifier));
    let mut with_extension = joined.clone().into_os_string();
    with_extension.push(".js");

    [joined.clone(), PathBuf::from(with_extension), joined.join("index.js")]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

/// Resolve `.` and `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Declaration forms, most specific first; group 1 is the declared identifier.
static DECLARATIONS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r"(?m)^\s*(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=",
        r"(?m)\bfunction\s*\*?\s+([A-Za-z_$][\w$]*)\s*\(",
        r"(?m)\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=",
        r"(?m)^\s*(?:async\s+)?([A-Za-z_$][\w$]*)\s*\(",
        r"(?m)^\s*([A-Za-z_$][\w$]*)\s*:",
    ]
    .map(|pattern| Regex::new(pattern).expect("valid declaration regex"))
});

/// Position of the declaration of `name`, trying the most specific forms first.
fn find_declaration(content: &str, name: &str) -> Option<(usize, usize)> {
    DECLARATIONS.iter().find_map(|regex| {
        let found = regex
            .captures_iter(content)
            .filter_map(|captures| captures.get(1))
            .find(|identifier| identifier.as_str() == name)?;
        Some(line_column(content, found.start()))
    })
}

/// Position of `module.exports =`
fn find_module_export(content: &str) -> Option<(usize, usize)> {
    content
        .find("module.exports")
        .map(|offset| line_column(content, offset))
}

fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map(|newline| offset - newline)
        .unwrap_or(offset + 1);
    (line, column)
}
