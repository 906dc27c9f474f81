//! Exclusion policy: decides which documented methods are flagged as excluded.

use crate::error::Result;
use crate::route::MethodEntry;

/// Exclusion check, consulted once per declared method.
///
/// A failing check degrades to "not excluded" for that one entry.
pub trait ExclusionPolicy: Send + Sync {
    fn is_excluded(&self, entry: &MethodEntry) -> Result<bool>;
}

/// Excludes entries declared `excluded: true` and entries whose IAM key matches one of the
/// configured patterns. A pattern is an exact key or a prefix ending in `*`.
#[derive(Debug, Clone, Default)]
pub struct IamExclusions {
    patterns: Vec<String>,
}

impl IamExclusions {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    fn matches(&self, iam: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => iam.starts_with(prefix),
            None => pattern == iam,
        })
    }
}

impl ExclusionPolicy for IamExclusions {
    fn is_excluded(&self, entry: &MethodEntry) -> Result<bool> {
        if entry.excluded {
            return Ok(true);
        }
        Ok(entry.iam.as_deref().is_some_and(|iam| self.matches(iam)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(iam: &str) -> MethodEntry {
        MethodEntry {
            iam: Some(iam.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_flag_always_excludes() {
        let policy = IamExclusions::default();
        let flagged = MethodEntry {
            excluded: true,
            ..Default::default()
        };
        assert!(policy.is_excluded(&flagged).unwrap());
        assert!(!policy.is_excluded(&entry("users:list")).unwrap());
    }

    #[test]
    fn test_exact_and_wildcard_patterns() {
        let policy = IamExclusions::new(vec![
            "modules:devtools:*".to_string(),
            "users:delete".to_string(),
        ]);

        assert!(policy.is_excluded(&entry("modules:devtools:files:open")).unwrap());
        assert!(policy.is_excluded(&entry("users:delete")).unwrap());
        assert!(!policy.is_excluded(&entry("users:delete:all")).unwrap());
        assert!(!policy.is_excluded(&MethodEntry::default()).unwrap());
    }
}
