//! Hierarchy Builder: groups requests into the type → module → leaf tree.
//!
//! The tree shape comes from the route file path, relative to the project root:
//! `<type>/<module>/.../<leaf><suffix>`, e.g. `modules/users/iam/users.server.iam.js` lands
//! under `modules` → `users` → `users`.

use crate::collection::{Folder, RequestItem, TypeFolder};
use crate::error::{Error, Result};
use regex::Regex;

/// Matches relative route-file paths.
#[derive(Debug, Clone)]
pub struct RoutePathPattern {
    regex: Regex,
}

/// Tree position of one route file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath {
    pub kind: String,
    pub module: String,
    pub leaf: String,
}

impl RoutePathPattern {
    /// Pattern for files ending with `suffix` (e.g. `.server.iam.js`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the resulting expression does not compile.
    pub fn new(suffix: &str) -> Result<Self> {
        let pattern = format!(
            r"^(?P<type>[^/]*)/(?P<module>[^/]*).*/(?P<name>[^/]*){}$",
            regex::escape(suffix)
        );
        let regex = Regex::new(&pattern).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { regex })
    }

    /// Position of `relative` in the tree, `None` when the path does not follow the convention.
    pub fn parse(&self, relative: &str) -> Option<RoutePath> {
        let captures = self.regex.captures(relative)?;
        Some(RoutePath {
            kind: captures.name("type")?.as_str().to_string(),
            module: captures.name("module")?.as_str().to_string(),
            leaf: captures.name("name")?.as_str().to_string(),
        })
    }
}

/// Accumulates the tree, preserving insertion order at every level.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    types: Vec<TypeFolder>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the requests of one file. Every file gets its own leaf, even when two files share
    /// a leaf name.
    pub fn insert(&mut self, path: &RoutePath, requests: Vec<RequestItem>) {
        let type_index = match self.types.iter().position(|t| t.name == path.kind) {
            Some(index) => index,
            None => {
                self.types.push(Folder::new(path.kind.clone()));
                self.types.len() - 1
            }
        };
        let type_folder = &mut self.types[type_index];

        let module_index = match type_folder.item.iter().position(|m| m.name == path.module) {
            Some(index) => index,
            None => {
                type_folder.item.push(Folder::new(path.module.clone()));
                type_folder.item.len() - 1
            }
        };

        let mut leaf = Folder::new(path.leaf.clone());
        leaf.item = requests;
        type_folder.item[module_index].item.push(leaf);
    }

    pub fn build(self) -> Vec<TypeFolder> {
        self.types
    }
}
