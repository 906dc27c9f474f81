//! Markdown descriptions rendered with Handlebars templates.
//!
//! Two templates are embedded at build time: one for every request (IAM key, parents,
//! middlewares, exclusion notice) and one for the collection `info` block.

use crate::error::{Error, Result};
use handlebars::{no_escape, Handlebars};
use serde::Serialize;

const REQUEST_TEMPLATE: &str = "request-description";
const API_TEMPLATE: &str = "api-description";

/// Placeholder used when a method declares no description
pub const NOT_SPECIFIED: &str = "Not specified";

/// Context of the request-description template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestDescription {
    pub description: String,
    pub iam: Option<String>,
    /// Link to the line declaring the method, when a repository is configured
    pub iam_link: Option<String>,
    pub parents: Vec<String>,
    pub excluded: bool,
    pub middlewares: Vec<MiddlewareLink>,
}

/// A middleware as shown in a description: name and optional source link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MiddlewareLink {
    pub name: String,
    pub link: Option<String>,
}

#[derive(Serialize)]
struct ApiDescription<'a> {
    description: &'a str,
}

/// Renders request and collection descriptions.
///
/// The renderer is `Send` and `Sync` and is shared by all files of a pass.
#[derive(Debug)]
pub struct DescriptionRenderer {
    handlebars: Handlebars<'static>,
}

impl DescriptionRenderer {
    /// Creates a renderer with the built-in templates registered.
    ///
    /// # Errors
    ///
    /// Returns `Error::Template` if a built-in template does not compile.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Markdown output, nothing to HTML-escape
        handlebars.register_escape_fn(no_escape);

        handlebars
            .register_template_string(
                REQUEST_TEMPLATE,
                include_str!("../templates/request-description.hbs"),
            )
            .map_err(|e| Error::Template(format!("request description: {}", e)))?;
        handlebars
            .register_template_string(API_TEMPLATE, include_str!("../templates/api-description.hbs"))
            .map_err(|e| Error::Template(format!("api description: {}", e)))?;

        Ok(Self { handlebars })
    }

    /// Renders the description of one request.
    pub fn request(&self, context: &RequestDescription) -> Result<String> {
        self.handlebars
            .render(REQUEST_TEMPLATE, context)
            .map(|text| text.trim().to_string())
            .map_err(|e| Error::Template(e.to_string()))
    }

    /// Renders the collection description from the application description.
    pub fn api(&self, description: &str) -> Result<String> {
        self.handlebars
            .render(API_TEMPLATE, &ApiDescription { description })
            .map(|text| text.trim().to_string())
            .map_err(|e| Error::Template(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_description_with_links() {
        let renderer = DescriptionRenderer::new().unwrap();
        let text = renderer
            .request(&RequestDescription {
                description: "Lists the <users>".to_string(),
                iam: Some("users:list".to_string()),
                iam_link: Some("https://github.com/acme/api/a.js#L4".to_string()),
                parents: vec!["users:all".to_string()],
                excluded: false,
                middlewares: vec![
                    MiddlewareLink {
                        name: "checkKey".to_string(),
                        link: Some("https://github.com/acme/api/c.js#L9".to_string()),
                    },
                    MiddlewareLink {
                        name: "anonymous".to_string(),
                        link: None,
                    },
                ],
            })
            .unwrap();

        assert!(text.starts_with("Lists the <users>"));
        assert!(text.contains("**IAM**: [`users:list`](https://github.com/acme/api/a.js#L4)"));
        assert!(text.contains("- `users:all`"));
        assert!(text.contains("**Middlewares**"));
        assert!(text.contains("- [`checkKey`](https://github.com/acme/api/c.js#L9)"));
        assert!(text.contains("- `anonymous`"));
        assert!(!text.contains("EXCLUDED"));
    }

    #[test]
    fn test_request_description_minimal() {
        let renderer = DescriptionRenderer::new().unwrap();
        let text = renderer
            .request(&RequestDescription {
                description: NOT_SPECIFIED.to_string(),
                excluded: true,
                ..Default::default()
            })
            .unwrap();

        assert!(text.starts_with("> **EXCLUDED**"));
        assert!(text.contains("Not specified"));
        assert!(text.contains("**IAM**: _none_"));
        assert!(!text.contains("Parents"));
        assert!(!text.contains("Middlewares"));
    }

    #[test]
    fn test_api_description() {
        let renderer = DescriptionRenderer::new().unwrap();
        assert!(renderer.api("Billing API").unwrap().starts_with("Billing API\n\n"));
        assert!(renderer.api("").unwrap().starts_with("Requests are grouped"));
    }
}
