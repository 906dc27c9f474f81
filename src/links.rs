//! Repository links: turn a `(file, line)` into a URL a reader can open.

use serde::{Deserialize, Serialize};

/// Default endpoint of the local file opener
pub const LOCAL_FILES_URL: &str = "http://localhost:3000/api/v1/devtools/files/open";

/// Kind of source host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    Github,
    Gitlab,
    Bitbucket,
    /// A local development server that opens files in the editor
    #[default]
    Local,
    /// Any other value; links are disabled
    #[serde(other)]
    Unsupported,
}

impl RepositoryKind {
    /// Parse a kind name, case-insensitively. Unknown names map to `Unsupported`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "github" => RepositoryKind::Github,
            "gitlab" => RepositoryKind::Gitlab,
            "bitbucket" => RepositoryKind::Bitbucket,
            "local" => RepositoryKind::Local,
            _ => RepositoryKind::Unsupported,
        }
    }
}

/// Builds source links for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLinker {
    kind: RepositoryKind,
    base: String,
}

impl RepositoryLinker {
    /// `base` is the repository browse URL (or the local opener URL). An empty local base
    /// falls back to [`LOCAL_FILES_URL`].
    pub fn new(kind: RepositoryKind, base: impl Into<String>) -> Self {
        let mut base = base.into();
        if base.is_empty() && kind == RepositoryKind::Local {
            base = LOCAL_FILES_URL.to_string();
        }
        Self {
            kind,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Link to `source` (relative, `/`-separated) at `line` / `column`.
    pub fn link(&self, source: &str, line: usize, column: usize) -> Option<String> {
        if self.base.is_empty() {
            return None;
        }
        let source = source.trim_start_matches("./").trim_start_matches('/');

        match self.kind {
            RepositoryKind::Github | RepositoryKind::Gitlab => {
                Some(format!("{}/{}#L{}", self.base, source, line))
            }
            RepositoryKind::Bitbucket => Some(format!("{}/{}#lines-{}", self.base, source, line)),
            RepositoryKind::Local => Some(format!(
                "{}?file={}&line={}&col={}",
                self.base, source, line, column
            )),
            RepositoryKind::Unsupported => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_repository_links() {
        let github = RepositoryLinker::new(RepositoryKind::Github, "https://github.com/acme/api/blob/main/");
        assert_eq!(
            github.link("modules/users/iam/users.server.iam.js", 12, 0).as_deref(),
            Some("https://github.com/acme/api/blob/main/modules/users/iam/users.server.iam.js#L12")
        );

        let bitbucket = RepositoryLinker::new(RepositoryKind::Bitbucket, "https://bitbucket.org/acme/api/src/main");
        assert_eq!(
            bitbucket.link("./a.js", 3, 0).as_deref(),
            Some("https://bitbucket.org/acme/api/src/main/a.js#lines-3")
        );
    }

    #[test]
    fn test_local_link_defaults_url() {
        let local = RepositoryLinker::new(RepositoryKind::Local, "");
        assert_eq!(
            local.link("a.js", 3, 7).as_deref(),
            Some("http://localhost:3000/api/v1/devtools/files/open?file=a.js&line=3&col=7")
        );
    }

    #[test]
    fn test_unsupported_kind_has_no_links() {
        let linker = RepositoryLinker::new(RepositoryKind::from_name("svn"), "https://svn.example.com");
        assert_eq!(linker.link("a.js", 1, 1), None);
        assert_eq!(RepositoryKind::from_name("GitHub"), RepositoryKind::Github);
    }

    #[test]
    fn test_kind_deserializes_unknown_values() {
        let kind: RepositoryKind = serde_yaml::from_str("mercurial").unwrap();
        assert_eq!(kind, RepositoryKind::Unsupported);
    }
}
