//! Generation pass: route files in, collection out.
//!
//! Every file goes through its own chain (parse and load side by side, then locate, extract
//! and correlate) on the rayon pool. The chains share nothing mutable: each one returns a
//! [`FileOutcome`], and the outcomes are folded into the variable registry and the hierarchy
//! one after the other, in file order.

use crate::collection::{Collection, Info, RequestItem, SCHEMA_URL};
use crate::config::DocConfig;
use crate::correlator::{CommentAttachment, CorrelationContext, Correlator, FileRef};
use crate::description::DescriptionRenderer;
use crate::error::{Diagnostic, Result};
use crate::exclusion::{ExclusionPolicy, IamExclusions};
use crate::hierarchy::{HierarchyBuilder, RoutePath, RoutePathPattern};
use crate::links::RepositoryLinker;
use crate::loader::{ModuleLoader, StaticModuleLoader};
use crate::locator::MethodLocator;
use crate::middleware::{RequireLocator, SourceLocator};
use crate::parser::SourceParser;
use crate::scanner::{SourceFile, DEFAULT_SUFFIX};
use crate::tags::{TagExtractor, TagManifest};
use crate::variables::VariableRegistry;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;

/// Settings that shape the generated document.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub title: String,
    pub description: String,
    /// Value of the `prefix` variable
    pub prefix: String,
    /// Value of the `host` variable
    pub host: String,
    pub add_excluded: bool,
    pub attachment: CommentAttachment,
    pub suffix: String,
    /// Project root; source links are relative to it
    pub root: PathBuf,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            description: String::new(),
            prefix: "/api/v1".to_string(),
            host: "http://localhost:3000".to_string(),
            add_excluded: false,
            attachment: CommentAttachment::default(),
            suffix: DEFAULT_SUFFIX.to_string(),
            root: PathBuf::from("."),
        }
    }
}

/// Result of one generation pass.
#[derive(Debug)]
pub struct Generation {
    pub collection: Collection,
    /// Every contained fault, in file order
    pub diagnostics: Vec<Diagnostic>,
}

/// Work product of one file, computed independently of every other file.
#[derive(Debug, Default)]
struct FileOutcome {
    route_path: Option<RoutePath>,
    requests: Vec<RequestItem>,
    variables: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

/// Builds collections from route files.
pub struct Generator {
    settings: GeneratorSettings,
    manifest: TagManifest,
    loader: Box<dyn ModuleLoader>,
    locator: Box<dyn SourceLocator>,
    exclusions: Box<dyn ExclusionPolicy>,
    linker: Option<RepositoryLinker>,
    presets: HashMap<String, String>,
    renderer: DescriptionRenderer,
    pattern: RoutePathPattern,
}

impl Generator {
    /// A generator with the default manifest, the static loader, the `require` locator and no
    /// IAM exclusions.
    ///
    /// # Errors
    ///
    /// Returns an error if the templates do not compile or the suffix yields an invalid pattern.
    pub fn new(settings: GeneratorSettings) -> Result<Self> {
        let pattern = RoutePathPattern::new(&settings.suffix)?;
        Ok(Self {
            settings,
            manifest: TagManifest::default(),
            loader: Box::new(StaticModuleLoader),
            locator: Box::new(RequireLocator),
            exclusions: Box::new(IamExclusions::default()),
            linker: None,
            presets: HashMap::new(),
            renderer: DescriptionRenderer::new()?,
            pattern,
        })
    }

    /// A generator for the project at `root` configured by `config`.
    pub fn from_config(config: &DocConfig, root: PathBuf) -> Result<Self> {
        let settings = GeneratorSettings {
            title: config.app.title.clone(),
            description: config.app.description.clone(),
            prefix: config.app.prefix.clone(),
            host: config.app.host.clone(),
            add_excluded: config.add_excluded,
            attachment: config.comment_attachment,
            suffix: config.iam_suffix.clone(),
            root: root.clone(),
        };

        let mut generator = Self::new(settings)?
            .with_exclusions(Box::new(IamExclusions::new(config.excluded_iams.clone())))
            .with_presets(config.variable_presets(&root)?);
        generator.linker = config.linker();
        Ok(generator)
    }

    pub fn with_manifest(mut self, manifest: TagManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_loader(mut self, loader: Box<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_locator(mut self, locator: Box<dyn SourceLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Box<dyn ExclusionPolicy>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_linker(mut self, linker: RepositoryLinker) -> Self {
        self.linker = Some(linker);
        self
    }

    pub fn with_presets(mut self, presets: HashMap<String, String>) -> Self {
        self.presets = presets;
        self
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn presets(&self) -> &HashMap<String, String> {
        &self.presets
    }

    /// Runs a full pass over `files`, in the given order.
    ///
    /// Faults are contained per file, comment or tag and reported in
    /// [`Generation::diagnostics`]; the pass itself always produces a collection.
    pub fn generate(&self, files: &[SourceFile]) -> Generation {
        info!("Processing {} route files...", files.len());

        let outcomes: Vec<FileOutcome> = files.par_iter().map(|file| self.process(file)).collect();

        let mut registry = VariableRegistry::new(self.presets.clone());
        registry.seed("host", self.settings.host.clone());
        registry.seed("prefix", self.settings.prefix.clone());

        let mut hierarchy = HierarchyBuilder::new();
        let mut diagnostics = Vec::new();
        let mut request_count = 0;

        for outcome in outcomes {
            diagnostics.extend(outcome.diagnostics);
            for key in &outcome.variables {
                registry.register(key);
            }
            if let Some(route_path) = outcome.route_path {
                request_count += outcome.requests.len();
                hierarchy.insert(&route_path, outcome.requests);
            }
        }

        let description = match self.renderer.api(&self.settings.description) {
            Ok(text) => text,
            Err(e) => {
                warn!("Unable to render the collection description: {}", e);
                self.settings.description.clone()
            }
        };

        info!(
            "Generated {} requests and {} variables ({} diagnostics)",
            request_count,
            registry.len(),
            diagnostics.len()
        );

        Generation {
            collection: Collection {
                info: Info {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: self.settings.title.clone(),
                    schema: SCHEMA_URL.to_string(),
                    description,
                },
                variable: registry.into_vec(),
                item: hierarchy.build(),
            },
            diagnostics,
        }
    }

    fn process(&self, file: &SourceFile) -> FileOutcome {
        let mut outcome = FileOutcome::default();

        let Some(route_path) = self.pattern.parse(&file.relative) else {
            let diagnostic = Diagnostic::UnmatchedPath {
                file: file.relative.clone(),
            };
            diagnostic.log();
            outcome.diagnostics.push(diagnostic);
            return outcome;
        };

        let (parsed, loaded) = rayon::join(
            || SourceParser::parse(&file.path, &file.content),
            || self.loader.load(&file.path, &file.content),
        );

        let (parsed, module) = match (parsed, loaded) {
            (Ok(parsed), Ok(module)) => (parsed, module),
            (Err(e), _) | (_, Err(e)) => {
                let diagnostic = Diagnostic::SourceParse {
                    file: file.relative.clone(),
                    message: e.to_string(),
                };
                diagnostic.log();
                outcome.diagnostics.push(diagnostic);
                return outcome;
            }
        };

        let positions = MethodLocator::locate(&parsed);
        let scan = TagExtractor::new(&self.manifest).scan(&parsed.comments, &file.relative);
        outcome.diagnostics.extend(scan.diagnostics.iter().cloned());

        let correlator = Correlator::new(CorrelationContext {
            renderer: &self.renderer,
            locator: self.locator.as_ref(),
            exclusions: self.exclusions.as_ref(),
            linker: self.linker.as_ref(),
            root: &self.settings.root,
            attachment: self.settings.attachment,
            add_excluded: self.settings.add_excluded,
        });
        let correlation = correlator.correlate(
            FileRef {
                relative: &file.relative,
                path: &file.path,
            },
            &module,
            &positions,
            &scan,
        );

        debug!(
            "{}: {} requests from {} declared methods",
            file.relative,
            correlation.requests.len(),
            module.method_count()
        );

        outcome.route_path = Some(route_path);
        outcome.requests = correlation.requests;
        outcome.variables = correlation.variables;
        outcome.diagnostics.extend(correlation.diagnostics);
        outcome
    }
}
