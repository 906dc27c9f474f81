//! Documentation service: the entry point behind the CLI.
//!
//! Ties the scanner, the cache store and the generator together and serves the two request
//! flags: `force` bypasses the cache, `download` returns the document as an attachment.

use crate::cache::{CacheKey, CacheStore};
use crate::collection::Collection;
use crate::config::DocConfig;
use crate::environment::Environment;
use crate::error::{Diagnostic, Error, Result};
use crate::generator::Generator;
use crate::scanner::{FileScanner, SourceFile};
use crate::serializer::attachment_filename;
use crate::sync::{CollectionHost, CollectionSummary};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const COLLECTION_EXTENSION: &str = ".postman_collection.json";
const ENVIRONMENT_EXTENSION: &str = ".postman_environment.json";

/// Flags of one collection request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocRequest {
    /// Regenerate even if a cached collection matches the sources
    pub force: bool,
    /// Deliver as a file attachment instead of inline
    pub download: bool,
}

/// How a document is handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Inline(T),
    Attachment { filename: String, document: T },
}

impl<T> Delivery<T> {
    fn new(document: T, download: bool, filename: impl FnOnce() -> String) -> Self {
        if download {
            Delivery::Attachment {
                filename: filename(),
                document,
            }
        } else {
            Delivery::Inline(document)
        }
    }

    pub fn document(&self) -> &T {
        match self {
            Delivery::Inline(document) | Delivery::Attachment { document, .. } => document,
        }
    }

    pub fn into_document(self) -> T {
        match self {
            Delivery::Inline(document) | Delivery::Attachment { document, .. } => document,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Delivery::Inline(_) => None,
            Delivery::Attachment { filename, .. } => Some(filename),
        }
    }
}

/// A collection and where it came from.
#[derive(Debug)]
pub struct Outcome {
    pub collection: Collection,
    pub from_cache: bool,
    /// Diagnostics of the generation pass; empty when served from the cache
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the fresh collection could not be cached. The collection is still served.
    pub cache_error: Option<Error>,
}

/// Serves collections for one project.
pub struct DocService {
    root: PathBuf,
    config: DocConfig,
    generator: Generator,
    cache: CacheStore,
}

impl DocService {
    /// A service for the project at `root`. The cache directory is resolved against `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator cannot be built from `config` (invalid suffix,
    /// unreadable variables file, broken templates).
    pub fn new(root: PathBuf, config: DocConfig) -> Result<Self> {
        let generator = Generator::from_config(&config, root.clone())?;
        let cache = CacheStore::new(root.join(&config.cache_dir));
        Ok(Self {
            root,
            config,
            generator,
            cache,
        })
    }

    /// Replaces the generator, e.g. to plug in another loader or locator.
    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generator = generator;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &DocConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Every route file of the project, read into memory in processing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the project root is not a directory.
    pub fn sources(&self) -> Result<Vec<SourceFile>> {
        let scanner = FileScanner::new(self.root.clone()).with_suffix(self.config.iam_suffix.clone());
        let result = scanner.scan()?;
        Ok(scanner.read_sources(&result))
    }

    /// The collection for the current sources: the cached one when the sources and settings
    /// are unchanged (unless `force`), a freshly generated one otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be listed. A failed cache write does not fail
    /// the call; it is reported in [`Outcome::cache_error`].
    pub fn collection(&self, force: bool) -> Result<Outcome> {
        let sources = self.sources()?;
        let key = CacheKey::for_sources(&sources, &self.fingerprint());

        if !force {
            if let Some(collection) = self.cache.read(&key) {
                info!("Serving cached collection {}", key);
                return Ok(Outcome {
                    collection,
                    from_cache: true,
                    diagnostics: Vec::new(),
                    cache_error: None,
                });
            }
        }

        let generation = self.generator.generate(&sources);
        let cache_error = match self.cache.write(&key, &generation.collection) {
            Ok(_) => None,
            Err(e) => {
                warn!("Unable to cache the collection in {}: {}", self.cache.dir().display(), e);
                Some(e)
            }
        };

        Ok(Outcome {
            collection: generation.collection,
            from_cache: false,
            diagnostics: generation.diagnostics,
            cache_error,
        })
    }

    /// Configuration fingerprint plus the loaded placeholder presets, whose values end up in
    /// the collection.
    fn fingerprint(&self) -> String {
        let presets: BTreeMap<_, _> = self.generator.presets().iter().collect();
        format!("{}\n{:?}", self.config.fingerprint(), presets)
    }

    /// Serves a collection request.
    pub fn request(&self, request: DocRequest) -> Result<Delivery<Collection>> {
        let outcome = self.collection(request.force)?;
        let title = outcome.collection.info.name.clone();
        Ok(Delivery::new(outcome.collection, request.download, || {
            attachment_filename(&title, COLLECTION_EXTENSION)
        }))
    }

    /// A Postman environment holding every collection variable.
    pub fn environment(&self, download: bool) -> Result<Delivery<Environment>> {
        let outcome = self.collection(false)?;
        let environment = Environment::from_variables(
            &outcome.collection.info.name,
            &self.config.environment,
            &outcome.collection.variable,
            self.generator.presets(),
        );
        let title = self.config.app.title.clone();
        Ok(Delivery::new(environment, download, || {
            attachment_filename(&title, ENVIRONMENT_EXTENSION)
        }))
    }

    pub fn sync_list(&self, host: &dyn CollectionHost) -> Result<Vec<CollectionSummary>> {
        host.list()
    }

    /// Creates a remote collection from the current collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be listed or the host rejects the call.
    pub fn sync_create(&self, host: &dyn CollectionHost) -> Result<CollectionSummary> {
        let outcome = self.collection(false)?;
        host.create(&outcome.collection)
    }

    /// Replaces the remote collection `id` with the current collection.
    pub fn sync_update(&self, host: &dyn CollectionHost, id: &str) -> Result<CollectionSummary> {
        let outcome = self.collection(false)?;
        host.update(id, &outcome.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ModuleLoader, StaticModuleLoader};
    use crate::route::RouteModule;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const USERS: &str = r#"module.exports = {
  prefix: '/users',
  routes: [{
    path: '/:id',
    methods: {
      get: { title: 'Get a user' },
      put: { title: 'Update a user' },
    },
  }],
};
"#;

    /// Loader that counts its calls
    struct CountingLoader(Arc<AtomicUsize>);

    impl ModuleLoader for CountingLoader {
        fn load(&self, path: &Path, source: &str) -> Result<RouteModule> {
            self.0.fetch_add(1, Ordering::SeqCst);
            StaticModuleLoader.load(path, source)
        }
    }

    #[derive(Default)]
    struct FakeHost {
        calls: RefCell<Vec<String>>,
    }

    impl CollectionHost for FakeHost {
        fn list(&self) -> Result<Vec<CollectionSummary>> {
            self.calls.borrow_mut().push("list".to_string());
            Ok(vec![summary("c1")])
        }

        fn get(&self, id: &str) -> Result<Value> {
            self.calls.borrow_mut().push(format!("get {}", id));
            Ok(Value::Null)
        }

        fn create(&self, collection: &Collection) -> Result<CollectionSummary> {
            self.calls
                .borrow_mut()
                .push(format!("create {}", collection.info.name));
            Ok(summary("c2"))
        }

        fn update(&self, id: &str, collection: &Collection) -> Result<CollectionSummary> {
            self.calls
                .borrow_mut()
                .push(format!("update {} {}", id, collection.requests().count()));
            Ok(summary(id))
        }

        fn remove(&self, id: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("remove {}", id));
            Ok(())
        }
    }

    fn summary(id: &str) -> CollectionSummary {
        CollectionSummary {
            id: id.to_string(),
            name: "Shop".to_string(),
            uid: format!("1-{}", id),
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let iam = dir.path().join("modules/users/iam");
        fs::create_dir_all(&iam).unwrap();
        fs::write(iam.join("users.server.iam.js"), USERS).unwrap();
        dir
    }

    fn config() -> DocConfig {
        let mut config = DocConfig::default();
        config.app.title = "Shop".to_string();
        config
    }

    fn counting_service(root: &Path, counter: &Arc<AtomicUsize>) -> DocService {
        let service = DocService::new(root.to_path_buf(), config()).unwrap();
        let generator = Generator::from_config(service.config(), root.to_path_buf())
            .unwrap()
            .with_loader(Box::new(CountingLoader(Arc::clone(counter))));
        service.with_generator(generator)
    }

    #[test]
    fn test_cached_collection_skips_generation() {
        let dir = project();
        let counter = Arc::new(AtomicUsize::new(0));
        let service = counting_service(dir.path(), &counter);

        let first = service.collection(false).unwrap();
        assert!(!first.from_cache);
        assert!(first.cache_error.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let second = service.collection(false).unwrap();
        assert!(second.from_cache);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(second.collection, first.collection);

        let forced = service.collection(true).unwrap();
        assert!(!forced.from_cache);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_edited_source_invalidates_cache() {
        let dir = project();
        let counter = Arc::new(AtomicUsize::new(0));
        let service = counting_service(dir.path(), &counter);

        service.collection(false).unwrap();
        fs::write(
            dir.path().join("modules/users/iam/users.server.iam.js"),
            USERS.replace("Get a user", "Fetch a user"),
        )
        .unwrap();

        let outcome = service.collection(false).unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.collection.requests().next().unwrap().name, "Fetch a user");
    }

    #[test]
    fn test_unwritable_cache_still_serves_collection() {
        let dir = project();
        // a file where the cache directory should be
        fs::write(dir.path().join(".cache"), "").unwrap();
        let service = DocService::new(dir.path().to_path_buf(), config()).unwrap();

        let outcome = service.collection(false).unwrap();
        assert!(matches!(outcome.cache_error, Some(Error::Io(_))));
        assert_eq!(outcome.collection.requests().count(), 2);
    }

    #[test]
    fn test_download_delivers_attachment() {
        let dir = project();
        let service = DocService::new(dir.path().to_path_buf(), config()).unwrap();

        let inline = service.request(DocRequest::default()).unwrap();
        assert!(inline.filename().is_none());

        let download = service
            .request(DocRequest {
                force: true,
                download: true,
            })
            .unwrap();
        assert_eq!(download.filename(), Some("Shop.postman_collection.json"));
        assert_eq!(download.into_document().info.name, "Shop");
    }

    #[test]
    fn test_environment_export() {
        let dir = project();
        let service = DocService::new(dir.path().to_path_buf(), config()).unwrap();

        let delivery = service.environment(true).unwrap();
        assert_eq!(delivery.filename(), Some("Shop.postman_environment.json"));

        let environment = delivery.document();
        assert_eq!(environment.name, "[DEVELOPMENT] Shop");
        let keys: Vec<_> = environment.values.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["host", "prefix", "id"]);
    }

    #[test]
    fn test_sync_actions_go_through_host() {
        let dir = project();
        let service = DocService::new(dir.path().to_path_buf(), config()).unwrap();
        let host = FakeHost::default();

        assert_eq!(service.sync_list(&host).unwrap()[0].id, "c1");
        assert_eq!(service.sync_create(&host).unwrap().id, "c2");
        assert_eq!(service.sync_update(&host, "c1").unwrap().uid, "1-c1");

        assert_eq!(
            *host.calls.borrow(),
            vec!["list", "create Shop", "update c1 2"]
        );
    }

    #[test]
    fn test_missing_project_root() {
        let dir = TempDir::new().unwrap();
        let service = DocService::new(dir.path().join("missing"), config()).unwrap();
        assert!(matches!(service.collection(false), Err(Error::Io(_))));
    }
}
