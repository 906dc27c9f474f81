//! Cache Store: content-addressed collection documents.
//!
//! A cached collection is keyed by a BLAKE3 hash of every contributing route file (relative
//! path and content, in processing order) plus a fingerprint of the settings that shape the
//! output. Editing any route file changes the key, so a stale document is never served.

use crate::collection::Collection;
use crate::error::Result;
use crate::scanner::SourceFile;
use blake3::Hasher;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "postman.collection.";
const FILE_EXTENSION: &str = ".json";

/// Key of one cached collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a source snapshot and a settings fingerprint.
    pub fn for_sources(files: &[SourceFile], fingerprint: &str) -> Self {
        let mut hasher = Hasher::new();
        for file in files {
            // lengths delimit the fields so that moved bytes change the hash
            hasher.update(&(file.relative.len() as u64).to_le_bytes());
            hasher.update(file.relative.as_bytes());
            hasher.update(&(file.content.len() as u64).to_le_bytes());
            hasher.update(file.content.as_bytes());
        }
        hasher.update(fingerprint.as_bytes());

        let hash = hasher.finalize().to_hex();
        Self(hash.as_str()[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directory of cached collections.
///
/// The store takes no lock: concurrent writers of the same key produce the same document, and
/// the rename makes the last one win.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the collection for `key`
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, key, FILE_EXTENSION))
    }

    /// The cached collection for `key`. Missing, unreadable or malformed files are a miss.
    pub fn read(&self, key: &CacheKey) -> Option<Collection> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cache miss for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(collection) => {
                debug!("Cache hit: {}", path.display());
                Some(collection)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stores `collection` under `key`, replacing any previous document.
    ///
    /// The document is written to a temporary file first and renamed into place, so readers
    /// never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn write(&self, key: &CacheKey, collection: &Collection) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(key);
        let temp = self.dir.join(format!(
            ".{}{}.{}.tmp",
            FILE_PREFIX,
            key,
            uuid::Uuid::new_v4().simple()
        ));

        let content = serde_json::to_string_pretty(collection)?;
        fs::write(&temp, content)?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!("Cached collection at {}", path.display());
        Ok(path)
    }

    /// Removes every cached collection. Returns how many files were deleted.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        debug!("Removed {} cached collections from {}", removed, self.dir.display());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Info, SCHEMA_URL};
    use tempfile::TempDir;

    fn source(relative: &str, content: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(relative),
            relative: relative.to_string(),
            content: content.to_string(),
        }
    }

    fn collection(name: &str) -> Collection {
        Collection {
            info: Info {
                id: "id".to_string(),
                name: name.to_string(),
                schema: SCHEMA_URL.to_string(),
                description: String::new(),
            },
            variable: vec![],
            item: vec![],
        }
    }

    #[test]
    fn test_key_depends_on_content_paths_and_settings() {
        let files = vec![source("a.js", "x"), source("b.js", "y")];
        let key = CacheKey::for_sources(&files, "settings");

        assert_eq!(key, CacheKey::for_sources(&files, "settings"));
        assert_eq!(key.as_str().len(), 16);
        assert_ne!(key, CacheKey::for_sources(&[source("a.js", "x"), source("b.js", "z")], "settings"));
        assert_ne!(key, CacheKey::for_sources(&[source("a.js", "x"), source("c.js", "y")], "settings"));
        assert_ne!(key, CacheKey::for_sources(&files, "other"));
        assert_ne!(
            CacheKey::for_sources(&[source("ab", "c")], ""),
            CacheKey::for_sources(&[source("a", "bc")], "")
        );
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache"));
        let key = CacheKey::for_sources(&[], "");

        assert!(store.read(&key).is_none());

        let path = store.write(&key, &collection("first")).unwrap();
        assert!(path.ends_with(format!("postman.collection.{}.json", key)));
        store.write(&key, &collection("second")).unwrap();

        assert_eq!(store.read(&key).unwrap().info.name, "second");
    }

    #[test]
    fn test_concurrent_writes_of_one_key() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let key = CacheKey::for_sources(&[], "");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        store.write(&key, &collection("shared")).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.read(&key).unwrap().info.name, "shared");
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let key = CacheKey::for_sources(&[], "");

        fs::write(store.path_for(&key), "{ truncated").unwrap();
        assert!(store.read(&key).is_none());
    }

    #[test]
    fn test_clear_only_removes_collections() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        store.write(&CacheKey::for_sources(&[], "a"), &collection("a")).unwrap();
        store.write(&CacheKey::for_sources(&[], "b"), &collection("b")).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(CacheStore::new(dir.path().join("missing")).clear().unwrap(), 0);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let store = CacheStore::new(&blocker);
        assert!(store.write(&CacheKey::for_sources(&[], ""), &collection("x")).is_err());
    }
}
