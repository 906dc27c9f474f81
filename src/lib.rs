//! Postman From Source - Postman collections from annotated route-definition files.
//!
//! This library reads the JavaScript route-definition files of a project (by default
//! `*.server.iam.js`), each exporting a declarative table of routes, and turns every declared
//! path/method entry into a documented request of a Postman v2.1 collection. Block comments
//! placed above a method key carry `@tag` annotations (`@body`, `@headers`, `@params`,
//! `@example`, ...) that enrich the request.
//!
//! # Architecture
//!
//! Each file goes through its own chain; chains run in parallel and their results are folded
//! in file order:
//!
//! 1. [`scanner`] - Finds route files under the project root
//! 2. [`parser`] - Parses a file with tree-sitter and collects its block comments
//! 3. [`loader`] - Evaluates the exported table into a [`route::RouteModule`]
//! 4. [`locator`] - Finds the source line of every method key, in declaration order
//! 5. [`tags`] - Extracts `@tag` values from comments, driven by a [`tags::TagManifest`]
//! 6. [`correlator`] - Joins declared methods, positions and comments by ordinal position
//! 7. [`example`] - Turns `@example` tags into saved responses
//! 8. [`hierarchy`] - Nests requests as type / module / route file
//! 9. [`generator`] - Runs the pass and builds the [`collection::Collection`]
//! 10. [`cache`] - Content-addressed store of generated collections
//! 11. [`sync`] - Pushes collections to the Postman API
//!
//! # Example Usage
//!
//! ```no_run
//! use postman_from_source::{
//!     config::DocConfig,
//!     serializer::serialize_json,
//!     service::{DocRequest, DocService},
//! };
//! use std::path::PathBuf;
//!
//! let service = DocService::new(PathBuf::from("./my-project"), DocConfig::default()).unwrap();
//! let delivery = service.request(DocRequest::default()).unwrap();
//!
//! println!("{}", serialize_json(delivery.document()).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cache;
pub mod cli;
pub mod collection;
pub mod config;
pub mod correlator;
pub mod description;
pub mod environment;
pub mod error;
pub mod example;
pub mod exclusion;
pub mod generator;
pub mod hierarchy;
pub mod links;
pub mod loader;
pub mod locator;
pub mod middleware;
pub mod parser;
pub mod route;
pub mod scanner;
pub mod serializer;
pub mod service;
pub mod sync;
pub mod tags;
pub mod variables;
