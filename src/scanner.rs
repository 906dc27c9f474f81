//! Directory scanning for route-definition files.

use crate::error::Result;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix of route-definition files
pub const DEFAULT_SUFFIX: &str = ".server.iam.js";

/// File scanner for finding route-definition files.
///
/// The `FileScanner` recursively walks a project directory and collects every file whose name
/// ends with the route-file suffix. It skips `node_modules` and hidden directories (those
/// starting with `.`). Files come out sorted by name within each directory, so the processing
/// order, and therefore the collection layout, is stable across runs.
///
/// # Example
///
/// ```no_run
/// use postman_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-api"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} route files", result.route_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    suffix: String,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Paths of all discovered route files
    pub route_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

/// A route file read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,
    /// Path relative to the project root with `/` separators
    pub relative: String,
    pub content: String,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory with the default suffix.
    ///
    /// # Arguments
    ///
    /// * `root_path` - The root directory to scan for route files
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    /// Use another route-file suffix (e.g. `.iam.js`).
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Scans the directory tree and collects all route files.
    ///
    /// If any directories or files cannot be accessed, warnings are logged and added to
    /// the result, but scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", self.root_path.display()),
            )
            .into());
        }

        let mut route_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "node_modules"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let name = entry.file_name().to_string_lossy();
                    if entry.file_type().is_file() && name.ends_with(&self.suffix) {
                        route_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        debug!(
            "Found {} route files under {}",
            route_files.len(),
            self.root_path.display()
        );

        Ok(ScanResult {
            route_files,
            warnings,
        })
    }

    /// Reads every scanned file. Unreadable files are skipped with a warning.
    pub fn read_sources(&self, result: &ScanResult) -> Vec<SourceFile> {
        result
            .route_files
            .iter()
            .filter_map(|path| match fs::read_to_string(path) {
                Ok(content) => Some(SourceFile {
                    path: path.clone(),
                    relative: relative_path(&self.root_path, path),
                    content,
                }),
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}

/// `path` relative to `root`, `/`-separated.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_route_files_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("modules/users/iam")).unwrap();
        fs::create_dir_all(root.join("modules/billing/iam")).unwrap();
        fs::write(root.join("modules/users/iam/users.server.iam.js"), "").unwrap();
        fs::write(root.join("modules/users/iam/admins.server.iam.js"), "").unwrap();
        fs::write(root.join("modules/billing/iam/invoices.server.iam.js"), "").unwrap();
        fs::write(root.join("modules/users/iam/helpers.js"), "").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        let relative: Vec<_> = result
            .route_files
            .iter()
            .map(|p| relative_path(root, p))
            .collect();
        assert_eq!(
            relative,
            vec![
                "modules/billing/iam/invoices.server.iam.js",
                "modules/users/iam/admins.server.iam.js",
                "modules/users/iam/users.server.iam.js",
            ]
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let scanner = FileScanner::new(temp_dir.path().to_path_buf());
        let result = scanner.scan().unwrap();

        assert!(result.route_files.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_node_modules_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("node_modules/pkg/a.server.iam.js"), "").unwrap();
        fs::write(root.join(".git/b.server.iam.js"), "").unwrap();
        fs::write(root.join("c.server.iam.js"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.route_files.len(), 1);
        assert_eq!(
            result.route_files[0].file_name().unwrap().to_string_lossy(),
            "c.server.iam.js"
        );
    }

    #[test]
    fn test_scan_with_custom_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.iam.js"), "").unwrap();
        fs::write(root.join("b.server.iam.js"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf())
            .with_suffix(".iam.js")
            .scan()
            .unwrap();

        assert_eq!(result.route_files.len(), 2);
    }

    #[test]
    fn test_scan_missing_root() {
        let result = FileScanner::new(PathBuf::from("/nonexistent/project")).scan();
        assert!(result.is_err());
    }

    #[test]
    fn test_read_sources() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("modules/users/iam")).unwrap();
        fs::write(root.join("modules/users/iam/users.server.iam.js"), "module.exports = {};").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();
        let sources = scanner.read_sources(&result);

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].relative, "modules/users/iam/users.server.iam.js");
        assert_eq!(sources[0].content, "module.exports = {};");
    }
}
