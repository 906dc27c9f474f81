//! Correlator: one documented request per declared method.
//!
//! The loader says what a file declares, the locator says where each verb sits, and the tag
//! extractor says what the comments contain. The correlator joins the three strictly by
//! ordinal position and produces the [`RequestItem`]s of the file.

use crate::collection::{has_content_type, Body, Event, KeyValue, Request, RequestItem, Url};
use crate::description::{DescriptionRenderer, MiddlewareLink, RequestDescription, NOT_SPECIFIED};
use crate::error::Diagnostic;
use crate::example::{synthesize, ExampleSpec};
use crate::exclusion::ExclusionPolicy;
use crate::links::RepositoryLinker;
use crate::locator::MethodPosition;
use crate::middleware::SourceLocator;
use crate::route::{DeclaredRoute, HttpMethod, MethodEntry, RouteModule};
use crate::tags::{CommentScan, DocComment, TagSet};
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

static PATH_PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:(\w+)(\(.*\))?").expect("valid path parameter regex"));

/// Prefix of the name of an excluded request
pub const EXCLUDED_PREFIX: &str = "[EXCLUDED] ";

/// How a doc comment is matched to a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAttachment {
    /// The comment must end on the line right above the verb key
    Adjacent,
    /// The block comment directly preceding the verb's property, blank lines allowed
    #[default]
    LeadingNode,
}

/// Collaborators and switches shared by every file of a pass.
pub struct CorrelationContext<'a> {
    pub renderer: &'a DescriptionRenderer,
    pub locator: &'a dyn SourceLocator,
    pub exclusions: &'a dyn ExclusionPolicy,
    pub linker: Option<&'a RepositoryLinker>,
    /// Project root, used to turn located files into repository-relative links
    pub root: &'a Path,
    pub attachment: CommentAttachment,
    /// Keep excluded requests (flagged) instead of dropping them
    pub add_excluded: bool,
}

/// The route file being correlated.
#[derive(Debug, Clone, Copy)]
pub struct FileRef<'a> {
    /// Path relative to the project root, `/`-separated
    pub relative: &'a str,
    /// Path on disk
    pub path: &'a Path,
}

/// Result of correlating one file.
#[derive(Debug, Default)]
pub struct Correlation {
    pub requests: Vec<RequestItem>,
    /// Placeholder keys to register, in discovery order: path parameters, then comments
    pub variables: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Joins declared methods, their positions and their doc comments.
pub struct Correlator<'a> {
    context: CorrelationContext<'a>,
}

impl<'a> Correlator<'a> {
    pub fn new(context: CorrelationContext<'a>) -> Self {
        Self { context }
    }

    /// Builds the requests of one file.
    ///
    /// Declared methods are paired with `positions` by index. When the two lists differ in
    /// length a `StructureMismatch` is recorded and the extra declared methods get no tags.
    pub fn correlate(
        &self,
        file: FileRef<'_>,
        module: &RouteModule,
        positions: &[MethodPosition],
        scan: &CommentScan,
    ) -> Correlation {
        let mut out = Correlation::default();

        let declared = module.method_count();
        if declared != positions.len() {
            let diagnostic = Diagnostic::StructureMismatch {
                file: file.relative.to_string(),
                declared,
                located: positions.len(),
            };
            diagnostic.log();
            out.diagnostics.push(diagnostic);
        }

        for (index, (route, method, entry)) in module.methods().enumerate() {
            let position = positions.get(index);
            let item = self.document(file, module, route, method, entry, position, scan, &mut out);

            if item.excluded && !self.context.add_excluded {
                debug!("Dropping excluded request {} {}", method, route.path);
                continue;
            }
            out.requests.push(item);
        }

        out.variables.extend(scan.placeholders.iter().cloned());
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn document(
        &self,
        file: FileRef<'_>,
        module: &RouteModule,
        route: &DeclaredRoute,
        method: HttpMethod,
        entry: &MethodEntry,
        position: Option<&MethodPosition>,
        scan: &CommentScan,
        out: &mut Correlation,
    ) -> RequestItem {
        let (path, parameters) = url_path(&module.prefix, &route.path);
        out.variables.extend(parameters);

        let excluded = match self.context.exclusions.is_excluded(entry) {
            Ok(excluded) => excluded,
            Err(e) => {
                let diagnostic = Diagnostic::ExternalLookup {
                    file: file.relative.to_string(),
                    subject: entry.iam.clone().unwrap_or_else(|| route.path.clone()),
                    message: e.to_string(),
                };
                diagnostic.log();
                out.diagnostics.push(diagnostic);
                false
            }
        };

        let title = entry.title.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());
        let mut item = RequestItem {
            name: if excluded {
                format!("{}{}", EXCLUDED_PREFIX, title)
            } else {
                title
            },
            event: Vec::new(),
            request: Request {
                method,
                description: String::new(),
                header: Vec::new(),
                body: Some(Body::raw(if method == HttpMethod::Get { "" } else { "{}" })),
                url: Url {
                    host: vec![if module.is_global {
                        "{{host}}".to_string()
                    } else {
                        "{{host}}{{prefix}}".to_string()
                    }],
                    path,
                    query: Vec::new(),
                },
            },
            response: Vec::new(),
            excluded,
        };

        let iam_link = match (self.context.linker, position) {
            (Some(linker), Some(position)) => linker.link(file.relative, position.line, 1),
            _ => None,
        };
        let description = RequestDescription {
            description: entry
                .description
                .clone()
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            iam: entry.iam.clone(),
            iam_link,
            parents: entry.parents.clone(),
            excluded,
            middlewares: self.middlewares(file, module, entry, out),
        };
        item.request.description = match self.context.renderer.request(&description) {
            Ok(text) => text,
            Err(e) => {
                warn!("Unable to render the description of {}: {}", item.name, e);
                description.description
            }
        };

        let comment = position.and_then(|p| attach(self.context.attachment, p, &scan.comments));
        if let Some(comment) = comment {
            merge_tags(&mut item, comment, file.relative, &mut out.diagnostics);
        }

        item
    }

    /// Names and source links of the middlewares of `entry`. Locating only happens when a
    /// repository is configured, since the link is the only use of the location.
    fn middlewares(
        &self,
        file: FileRef<'_>,
        module: &RouteModule,
        entry: &MethodEntry,
        out: &mut Correlation,
    ) -> Vec<MiddlewareLink> {
        entry
            .middlewares
            .iter()
            .map(|middleware| {
                let name = middleware.display_name().to_string();
                let Some(linker) = self.context.linker else {
                    return MiddlewareLink { name, link: None };
                };

                match self.context.locator.locate(file.path, module, middleware) {
                    Ok(location) => {
                        let source = location
                            .source
                            .strip_prefix(self.context.root)
                            .unwrap_or(&location.source);
                        let source = source.to_string_lossy().replace('\\', "/");
                        MiddlewareLink {
                            name,
                            link: linker.link(&source, location.line, location.column),
                        }
                    }
                    Err(e) => {
                        let diagnostic = Diagnostic::ExternalLookup {
                            file: file.relative.to_string(),
                            subject: middleware.expression(),
                            message: e.to_string(),
                        };
                        diagnostic.log();
                        out.diagnostics.push(diagnostic);
                        MiddlewareLink { name, link: None }
                    }
                }
            })
            .collect()
    }
}

/// Segments of `prefix + path` and the names of its `:parameter` segments.
///
/// Empty segments are dropped, except a trailing one (`/users/` keeps its final slash).
pub fn url_path(prefix: &str, path: &str) -> (Vec<String>, Vec<String>) {
    let full = format!("{}{}", prefix, path);
    let parts: Vec<&str> = full.split('/').collect();
    let last = parts.len() - 1;

    let mut parameters = Vec::new();
    let segments = parts
        .iter()
        .enumerate()
        .filter(|(index, part)| !part.is_empty() || *index == last)
        .map(|(_, part)| match PATH_PARAMETER.captures(part).and_then(|c| c.get(1)) {
            Some(name) => {
                parameters.push(name.as_str().to_string());
                format!("{{{{{}}}}}", name.as_str())
            }
            None => part.to_string(),
        })
        .collect();

    (segments, parameters)
}

/// The doc comment of the verb at `position`, if any.
pub fn attach<'c>(
    mode: CommentAttachment,
    position: &MethodPosition,
    comments: &'c [DocComment],
) -> Option<&'c DocComment> {
    match mode {
        CommentAttachment::Adjacent => comments.iter().find(|c| c.end_line + 1 == position.line),
        CommentAttachment::LeadingNode => {
            let start = position.leading_comment?;
            comments.iter().find(|c| c.start_byte == start)
        }
    }
}

/// Apply the tags of a matched comment to a request.
fn merge_tags(item: &mut RequestItem, comment: &DocComment, file: &str, diagnostics: &mut Vec<Diagnostic>) {
    let tags = &comment.tags;
    let request = &mut item.request;

    if tags.contains("body") || tags.contains("bodyMode") {
        request.body = Some(body_from_tags(tags, file, comment.end_line, diagnostics));
    }

    request.header = tags.key_values("headers").unwrap_or_default();
    if request.method.sends_body() && !has_content_type(&request.header) {
        request.header.push(KeyValue::json_content_type());
    }

    if let Some(test) = tags.text("test") {
        item.event.push(Event::script("test", vec![test.to_string()]));
    }

    let prerequest: Vec<String> = tags.texts("prerequest").into_iter().map(str::to_string).collect();
    if !prerequest.is_empty() {
        item.event.push(Event::script("prerequest", prerequest));
    }

    if let Some(params) = tags.key_values("params") {
        request.url.query = params;
    }

    let examples: Vec<ExampleSpec> = tags
        .values("example")
        .into_iter()
        .filter_map(|value| serde_json::from_value(value.clone()).ok())
        .collect();
    if !examples.is_empty() {
        item.response = synthesize(item, &examples);
    }
}

/// `bodyMode` (default `raw`) selects where the payload goes. Structured modes read JSON from
/// the tag named after the mode, or from `body`; malformed JSON leaves the payload unset.
fn body_from_tags(tags: &TagSet, file: &str, line: usize, diagnostics: &mut Vec<Diagnostic>) -> Body {
    let mode = tags.text("bodyMode").unwrap_or("raw");
    let mut body = Body::with_mode(mode);

    if mode == "raw" {
        body.raw = tags.text("body").map(str::to_string);
        return body;
    }

    let content = tags
        .texts(mode)
        .first()
        .copied()
        .or_else(|| tags.text("body"))
        .unwrap_or_default();
    match serde_json::from_str::<Value>(content) {
        Ok(payload) => {
            body.payload.insert(mode.to_string(), payload);
        }
        Err(e) => {
            let diagnostic = Diagnostic::TagFormat {
                tag: mode.to_string(),
                file: file.to_string(),
                line,
                message: e.to_string(),
            };
            diagnostic.log();
            diagnostics.push(diagnostic);
        }
    }
    body
}
